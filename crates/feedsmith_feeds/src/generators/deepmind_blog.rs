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
use crate::jsonld;

const BASE_URL: &str = "https://deepmind.google";
const LISTING_URL: &str = "https://deepmind.google/blog/";
const OUTPUT_FILE: &str = "feed_deepmind_blog.xml";
const MAX_ITEMS: usize = 50;
const MAX_FALLBACK_LINKS: usize = 20;

/// The blog publishes roughly weekly, so fallback-only posts are spaced a
/// week apart.
const FALLBACK_SPACING_DAYS: i64 = 7;

lazy_static! {
    static ref CARD_CLASS: Regex = Regex::new(r"(?i)post|article|card|item|blog").unwrap();
    static ref ENTRY_CLASS: Regex = Regex::new(r"(?i)entry|post").unwrap();
    static ref TITLE_CLASS: Regex = Regex::new(r"(?i)title|heading").unwrap();
    static ref DESC_CLASS: Regex = Regex::new(r"(?i)description|excerpt|summary").unwrap();
    static ref DATE_META_CLASS: Regex = Regex::new(r"(?i)date|time|published|meta").unwrap();
    static ref BYLINE_CLASS: Regex = Regex::new(r"(?i)byline|author").unwrap();
    static ref META_NAME_DATE: Regex = Regex::new(r"(?i)date|published").unwrap();
    // "Published: January 15, 2024" and similar labels in visible text
    static ref PUBLISHED_LABEL: Regex =
        Regex::new(r"(?i)(?:published|posted|date)[:\s]+([^,]+,\s*\d{4})").unwrap();
}

/// Listing data for one post, extracted before any secondary fetch happens.
struct PostDraft {
    url: String,
    title: String,
    description: String,
    listing_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct DeepmindBlogGenerator;

impl DeepmindBlogGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DeepmindBlogGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for DeepmindBlogGenerator {
    fn meta(&self) -> FeedMeta {
        FeedMeta {
            title: "DeepMind Blog".to_string(),
            link: LISTING_URL.to_string(),
            description: "Latest posts from DeepMind Blog".to_string(),
            language: "en".to_string(),
            output_file: OUTPUT_FILE.to_string(),
        }
    }

    fn cli_name(&self) -> &'static str {
        "deepmind-blog"
    }

    async fn collect_entries(&self, client: &Client) -> Result<Vec<FeedEntry>> {
        let html = fetch::fetch_page(client, LISTING_URL).await?;
        let anchor = Utc::now();

        // The parsed document is not Send, so everything needed from it is
        // pulled into owned drafts before the per-post fetches start.
        let (drafts, link_entries) = {
            let document = Html::parse_document(&html);
            let drafts = parse_listing(&document, anchor);
            if drafts.is_empty() {
                (Vec::new(), parse_link_fallback(&document, anchor))
            } else {
                (drafts, Vec::new())
            }
        };
        if drafts.is_empty() {
            return Ok(link_entries);
        }

        let mut entries = Vec::new();
        for (ordinal, draft) in drafts.into_iter().enumerate() {
            // The article page usually carries the real date; when it does,
            // it overrides whatever the listing offered.
            let page_date = match fetch::fetch_item_page(client, &draft.url).await {
                Some(page_html) => {
                    let page = Html::parse_document(&page_html);
                    article_page_date(&page)
                }
                None => None,
            };

            let published_at = page_date.or(draft.listing_date).unwrap_or_else(|| {
                dates::fallback_date(anchor, ordinal, Duration::days(FALLBACK_SPACING_DAYS))
            });

            entries.push(FeedEntry {
                title: draft.title,
                link: draft.url,
                description: draft.description,
                published_at,
                guid: None,
            });
        }
        Ok(entries)
    }
}

fn parse_listing(document: &Html, anchor: DateTime<Utc>) -> Vec<PostDraft> {
    let mut drafts = Vec::new();
    let mut seen = HashSet::new();

    for item in select_items(document).into_iter().take(MAX_ITEMS) {
        let Some(link) = utils::first_link(item) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = utils::absolute_url(BASE_URL, href);
        if !seen.insert(url.clone()) {
            continue;
        }

        let title = utils::heading_text(item, link, &TITLE_CLASS, "Untitled");
        let description = utils::classed_elements(item, &["p", "div"], &DESC_CLASS)
            .into_iter()
            .next()
            .map(utils::text_of)
            .unwrap_or_default();

        let ctx = ExtractionContext::new(
            item,
            Some(&url),
            drafts.len(),
            Duration::days(FALLBACK_SPACING_DAYS),
            anchor,
        );
        let listing_date = dates::try_strategies(&ctx);

        drafts.push(PostDraft {
            url,
            title,
            description,
            listing_date,
        });
    }
    drafts
}

/// Post containers, tried loosest-last: article elements, then card-like
/// classed blocks, then the parents of blog links, then post-id markers.
fn select_items(document: &Html) -> Vec<ElementRef<'_>> {
    let article_selector = Selector::parse("article").unwrap();
    let articles: Vec<_> = document.select(&article_selector).collect();
    if !articles.is_empty() {
        return articles;
    }

    let cards = utils::classed_elements(document.root_element(), &["div", "section"], &CARD_CLASS);
    if !cards.is_empty() {
        return cards;
    }

    let link_selector = Selector::parse(r#"a[href*="/blog/"]"#).unwrap();
    let mut parents: Vec<ElementRef<'_>> = Vec::new();
    for link in document.select(&link_selector) {
        if let Some(parent) = link.parent().and_then(ElementRef::wrap) {
            if !parents.iter().any(|seen| seen.id() == parent.id()) {
                parents.push(parent);
            }
        }
    }
    if !parents.is_empty() {
        return parents;
    }

    let marked_selector = Selector::parse("div[data-post-id], li[data-post-id]").unwrap();
    let marked: Vec<_> = document.select(&marked_selector).collect();
    if !marked.is_empty() {
        return marked;
    }
    utils::classed_elements(document.root_element(), &["div", "li"], &ENTRY_CLASS)
}

/// Date extraction on a fetched article page: structured nodes first, then
/// JSON-LD, then meta tags.
fn article_page_date(page: &Html) -> Option<DateTime<Utc>> {
    for candidate in date_node_candidates(page) {
        for attr in ["datetime", "data-date", "title"] {
            if let Some(value) = candidate.value().attr(attr) {
                if let Some(parsed) = dates::parse_date_string(value) {
                    return Some(parsed);
                }
            }
        }

        let text = utils::text_of(candidate);
        if text.is_empty() {
            continue;
        }
        if let Some(parsed) = dates::parse_date_string(&text) {
            return Some(parsed);
        }
        if let Some(caps) = PUBLISHED_LABEL.captures(&text) {
            if let Some(parsed) = dates::parse_date_string(&caps[1]) {
                return Some(parsed);
            }
        }
    }

    if let Some(parsed) = jsonld::date_published(page) {
        return Some(parsed);
    }
    meta_tag_date(page)
}

/// One candidate node per selector, in decreasing order of confidence.
fn date_node_candidates(page: &Html) -> Vec<ElementRef<'_>> {
    let mut candidates = Vec::new();

    let time_with_datetime = Selector::parse("time[datetime]").unwrap();
    if let Some(el) = page.select(&time_with_datetime).next() {
        candidates.push(el);
    }
    let any_time = Selector::parse("time").unwrap();
    if let Some(el) = page.select(&any_time).next() {
        candidates.push(el);
    }
    for tag in ["span", "div", "p"] {
        if let Some(el) = utils::classed_elements(page.root_element(), &[tag], &DATE_META_CLASS)
            .into_iter()
            .next()
        {
            candidates.push(el);
        }
    }
    // Sometimes the date hides in the byline.
    if let Some(el) = utils::classed_elements(page.root_element(), &["span"], &BYLINE_CLASS)
        .into_iter()
        .next()
    {
        candidates.push(el);
    }
    candidates
}

fn meta_tag_date(page: &Html) -> Option<DateTime<Utc>> {
    let published_time = Selector::parse(r#"meta[property="article:published_time"]"#).unwrap();
    let named_meta = Selector::parse("meta[name]").unwrap();

    let candidate = page.select(&published_time).next().or_else(|| {
        page.select(&named_meta).find(|el| {
            el.value()
                .attr("name")
                .map(|name| META_NAME_DATE.is_match(name))
                .unwrap_or(false)
        })
    })?;
    dates::parse_date_string(candidate.value().attr("content")?)
}

/// Bare-links fallback when no post containers were recognized at all.
fn parse_link_fallback(document: &Html, anchor: DateTime<Utc>) -> Vec<FeedEntry> {
    let link_selector = Selector::parse(r#"a[href*="/blog/"]"#).unwrap();
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for link in document.select(&link_selector).take(MAX_FALLBACK_LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let url = utils::absolute_url(BASE_URL, href);
        if !seen.insert(url.clone()) {
            continue;
        }

        let text = utils::text_of(link);
        let title = if text.is_empty() {
            "DeepMind Blog Post".to_string()
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
