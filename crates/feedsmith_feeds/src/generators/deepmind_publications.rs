use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feedsmith_core::{FeedEntry, FeedMeta, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use super::{utils, Generator};
use crate::dates::{self, ExtractionContext};
use crate::fetch;

const BASE_URL: &str = "https://deepmind.google";
const LISTING_URL: &str = "https://deepmind.google/research/publications/";
const OUTPUT_FILE: &str = "feed_deepmind_publications.xml";
const MAX_ITEMS: usize = 30;

lazy_static! {
    static ref PUB_CLASS: Regex = Regex::new(r"(?i)publication|paper|research|item").unwrap();
    static ref TITLE_CLASS: Regex = Regex::new(r"(?i)title|heading").unwrap();
    static ref AUTHOR_CLASS: Regex = Regex::new(r"(?i)author|authors").unwrap();
    static ref DESC_CLASS: Regex = Regex::new(r"(?i)description|abstract|summary").unwrap();
    // Date debris that listing markup sometimes appends to titles
    static ref TRAILING_ISO: Regex = Regex::new(r"\s*\d{4}-\d{2}-\d{2}\s*$").unwrap();
    static ref TRAILING_SLASH_DATE: Regex = Regex::new(r"\s*\d{1,2}/\d{1,2}/\d{4}\s*$").unwrap();
    static ref TRAILING_PAREN_YEAR: Regex = Regex::new(r"\s*\(\d{4}\)\s*$").unwrap();
    static ref TRAILING_DASH_YEAR: Regex = Regex::new(r"\s*-\s*\d{4}\s*$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone)]
pub struct DeepmindPublicationsGenerator;

impl DeepmindPublicationsGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeepmindPublicationsGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for DeepmindPublicationsGenerator {
    fn meta(&self) -> FeedMeta {
        FeedMeta {
            title: "DeepMind Publications".to_string(),
            link: LISTING_URL.to_string(),
            description: "Latest research publications from DeepMind".to_string(),
            language: "en".to_string(),
            output_file: OUTPUT_FILE.to_string(),
        }
    }

    fn cli_name(&self) -> &'static str {
        "deepmind-publications"
    }

    async fn collect_entries(&self, client: &Client) -> Result<Vec<FeedEntry>> {
        let html = fetch::fetch_page(client, LISTING_URL).await?;
        let document = Html::parse_document(&html);
        let anchor = Utc::now();

        let mut entries = parse_listing(&document, anchor);
        if entries.is_empty() {
            entries = parse_link_fallback(&document, anchor);
        }
        Ok(entries)
    }
}

fn parse_listing(document: &Html, anchor: DateTime<Utc>) -> Vec<FeedEntry> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for publication in select_items(document).into_iter().take(MAX_ITEMS) {
        let Some(link) = utils::first_link(publication) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = utils::absolute_url(BASE_URL, href);
        if !seen.insert(url.clone()) {
            continue;
        }

        let raw_title =
            utils::heading_text(publication, link, &TITLE_CLASS, "Untitled Publication");
        let title = clean_title(&raw_title);

        let authors = utils::classed_elements(publication, &["div", "span", "p"], &AUTHOR_CLASS)
            .into_iter()
            .next()
            .map(utils::text_of)
            .unwrap_or_default();
        let abstract_text = utils::classed_elements(publication, &["p", "div"], &DESC_CLASS)
            .into_iter()
            .next()
            .map(utils::text_of)
            .unwrap_or_default();

        let description = if authors.is_empty() {
            abstract_text
        } else {
            format!("Authors: {}\n\n{}", authors, abstract_text)
                .trim()
                .to_string()
        };

        let ctx = ExtractionContext::new(
            publication,
            Some(&url),
            entries.len(),
            Duration::hours(1),
            anchor,
        );
        let published_at = dates::resolve(&ctx);

        entries.push(FeedEntry {
            title,
            link: url,
            description,
            published_at,
            guid: None,
        });
    }
    entries
}

fn select_items(document: &Html) -> Vec<ElementRef<'_>> {
    let classed = utils::classed_elements(
        document.root_element(),
        &["article", "div", "li"],
        &PUB_CLASS,
    );
    if !classed.is_empty() {
        return classed;
    }
    let link_selector = Selector::parse(r#"a[href*="/research/publications/"]"#).unwrap();
    document.select(&link_selector).collect()
}

/// Strips date debris the listing sometimes appends to titles, while leaving
/// years that are part of the title itself alone.
fn clean_title(raw: &str) -> String {
    let mut title = raw.to_string();
    title = TRAILING_ISO.replace(&title, "").to_string();
    title = TRAILING_SLASH_DATE.replace(&title, "").to_string();
    title = TRAILING_PAREN_YEAR.replace(&title, "").to_string();
    title = TRAILING_DASH_YEAR.replace(&title, "").to_string();
    title = WHITESPACE.replace_all(&title, " ").trim().to_string();
    title
        .trim_matches(|c| c == ' ' || c == '-' || c == '\u{2013}' || c == '\u{2014}')
        .to_string()
}

fn parse_link_fallback(document: &Html, anchor: DateTime<Utc>) -> Vec<FeedEntry> {
    let link_selector = Selector::parse(r#"a[href*="/research/publications/"]"#).unwrap();
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for link in document.select(&link_selector).take(MAX_ITEMS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = utils::absolute_url(BASE_URL, href);
        if !seen.insert(url.clone()) {
            continue;
        }

        let text = utils::text_of(link);
        let title = if text.is_empty() {
            "DeepMind Publication".to_string()
        } else {
            text
        };

        entries.push(FeedEntry {
            title,
            link: url,
            description: String::new(),
            published_at: dates::fallback_date(anchor, entries.len(), Duration::hours(1)),
            guid: None,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_listing_with_authors_and_date() {
        let html = r#"
            <html><body>
              <li class="publication-item">
                <a href="/research/publications/scaling-up"><h4 class="pub-title">Scaling Up (2024)</h4></a>
                <span class="authors">A. Researcher, B. Scientist</span>
                <p class="abstract">We scale things up.</p>
                <span class="date">March 9, 2024</span>
              </li>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let entries = parse_listing(&document, anchor());
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.title, "Scaling Up");
        assert_eq!(entry.link, "https://deepmind.google/research/publications/scaling-up");
        assert!(entry.description.starts_with("Authors: A. Researcher, B. Scientist"));
        assert!(entry.description.contains("We scale things up."));
        assert_eq!(
            entry.published_at,
            Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()
        );
        assert!(entry.guid.is_none());
    }

    #[test]
    fn test_fallback_date_spacing_one_hour() {
        let html = r#"
            <html><body>
              <div class="paper"><a href="/research/publications/a">Paper A</a></div>
              <div class="paper"><a href="/research/publications/b">Paper B</a></div>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let entries = parse_listing(&document, anchor());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].published_at, anchor());
        assert_eq!(
            entries[0].published_at - entries[1].published_at,
            Duration::hours(1)
        );
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("A Paper 2024-01-15"), "A Paper");
        assert_eq!(clean_title("A Paper 01/15/2024"), "A Paper");
        assert_eq!(clean_title("A Paper (2024)"), "A Paper");
        assert_eq!(clean_title("A Paper - 2024"), "A Paper");
        assert_eq!(clean_title("Spaces   everywhere  "), "Spaces everywhere");
        assert_eq!(clean_title("Trailing dash \u{2013}"), "Trailing dash");
        // Years inside the title survive
        assert_eq!(clean_title("Lessons from 2020 pandemics"), "Lessons from 2020 pandemics");
    }

    #[test]
    fn test_link_fallback_when_no_containers() {
        let html = r#"
            <html><body>
              <a href="/research/publications/only-link">Only Link</a>
              <a href="/research/publications/only-link">Only Link</a>
            </body></html>
        "#;
        let document = Html::parse_document(html);
        let entries = parse_listing(&document, anchor());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Only Link");
    }
}
