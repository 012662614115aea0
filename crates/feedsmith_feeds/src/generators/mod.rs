use async_trait::async_trait;
use feedsmith_core::{FeedEntry, FeedMeta, Result};
use reqwest::Client;

pub mod arxiv_cs_ai;
pub mod deepmind_blog;
pub mod deepmind_publications;

pub use arxiv_cs_ai::ArxivCsAiGenerator;
pub use deepmind_blog::DeepmindBlogGenerator;
pub use deepmind_publications::DeepmindPublicationsGenerator;

/// One feed source: fetches its listing and produces entries in discovery
/// order. Writing the output file is the manager's job.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Feed-level metadata, including the fixed output filename.
    fn meta(&self) -> FeedMeta;

    /// Short name used on the command line.
    fn cli_name(&self) -> &'static str;

    /// Fetches the source and builds its entries. Primary fetch failures are
    /// fatal for this source; everything else recovers locally.
    async fn collect_entries(&self, client: &Client) -> Result<Vec<FeedEntry>>;
}

pub type GeneratorFactory = Box<dyn Fn() -> Box<dyn Generator> + Send + Sync>;

/// Every registered feed generator.
pub fn get_generator_factories() -> Vec<GeneratorFactory> {
    vec![
        Box::new(|| Box::new(ArxivCsAiGenerator::new())),
        Box::new(|| Box::new(DeepmindBlogGenerator::new())),
        Box::new(|| Box::new(DeepmindPublicationsGenerator::new())),
    ]
}

/// Shared DOM helpers for the per-source generators.
pub(crate) mod utils {
    use regex::Regex;
    use scraper::{ElementRef, Selector};

    /// Resolves a possibly-relative href against the site base.
    pub fn absolute_url(base: &str, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", base, href)
        }
    }

    /// The element itself when it is a link, otherwise its first descendant
    /// link carrying an href.
    pub fn first_link<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
        if el.value().name() == "a" && el.value().attr("href").is_some() {
            return Some(el);
        }
        let selector = Selector::parse("a[href]").unwrap();
        el.select(&selector).next()
    }

    /// Descendants of `scope` (in document order) whose tag is one of `tags`
    /// and whose class attribute matches `pattern`.
    pub fn classed_elements<'a>(
        scope: ElementRef<'a>,
        tags: &[&str],
        pattern: &Regex,
    ) -> Vec<ElementRef<'a>> {
        scope
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                tags.contains(&el.value().name())
                    && el
                        .value()
                        .attr("class")
                        .map(|classes| pattern.is_match(classes))
                        .unwrap_or(false)
            })
            .collect()
    }

    pub fn text_of(el: ElementRef<'_>) -> String {
        el.text().collect::<String>().trim().to_string()
    }

    /// Item title per the shared heuristic: a heading classed like a title
    /// inside the item, else any heading inside the link, else the link text.
    pub fn heading_text(
        item: ElementRef<'_>,
        link: ElementRef<'_>,
        title_class: &Regex,
        default: &str,
    ) -> String {
        let headings = ["h1", "h2", "h3", "h4"];
        let candidate = classed_elements(item, &headings, title_class)
            .into_iter()
            .next()
            .or_else(|| {
                let selector = Selector::parse("h1, h2, h3, h4").unwrap();
                link.select(&selector).next()
            })
            .unwrap_or(link);

        let text = text_of(candidate);
        if text.is_empty() {
            default.to_string()
        } else {
            text
        }
    }

}
