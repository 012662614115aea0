use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use feedsmith_core::{FeedEntry, FeedMeta, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use super::{utils, Generator};
use crate::dates;
use crate::fetch;

const LISTING_URL: &str = "https://arxiv.org/list/cs.AI/recent?skip=0&show=500";
const OUTPUT_FILE: &str = "feed_arxiv_cs_ai.xml";
const MAX_FALLBACK_LINKS: usize = 500;

/// Spacing between synthetic fallback dates; arXiv posts in large daily
/// batches, so fallback-only papers get generous gaps.
const FALLBACK_SPACING_DAYS: i64 = 2;

lazy_static! {
    // "Submitted on 1 Jan 2025" or "1 Jan 2025 (v1), 15 Jan 2025 (v2)";
    // the first (submission) date is the one that matters.
    static ref LIST_DATE: Regex = Regex::new(
        r"(?i)(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\w*\s+(\d{4})"
    )
    .unwrap();
    // arXiv ids carry year and month: YYMM.NNNNN
    static ref ID_YEAR_MONTH: Regex = Regex::new(r"(\d{2})(\d{2})\.\d+").unwrap();
    static ref URL_PACKED_DATE: Regex = Regex::new(r"/(\d{4})(\d{2})(\d{2})").unwrap();
    static ref ABS_URL_ID: Regex = Regex::new(r"/(\d{4}\.\d{4,5})").unwrap();
    static ref ABS_LINK: Regex = Regex::new(r"arxiv\.org/abs/|/abs/\d").unwrap();
}

const MONTH_ABBREVIATIONS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

#[derive(Debug, Clone)]
pub struct ArxivCsAiGenerator;

impl ArxivCsAiGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArxivCsAiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for ArxivCsAiGenerator {
    fn meta(&self) -> FeedMeta {
        FeedMeta {
            title: "arXiv cs.AI (Computer Science - Artificial Intelligence)".to_string(),
            link: LISTING_URL.to_string(),
            description: "Recent papers from arXiv cs.AI category".to_string(),
            language: "en".to_string(),
            output_file: OUTPUT_FILE.to_string(),
        }
    }

    fn cli_name(&self) -> &'static str {
        "arxiv-cs-ai"
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

/// Parses the arXiv listing structure: dl blocks with paired dt (link) and
/// dd (metadata) elements.
fn parse_listing(document: &Html, anchor: DateTime<Utc>) -> Vec<FeedEntry> {
    let content_selector = Selector::parse("div#content").unwrap();
    let area = document
        .select(&content_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let dl_selector = Selector::parse("dl").unwrap();
    let dt_selector = Selector::parse("dt").unwrap();
    let dd_selector = Selector::parse("dd").unwrap();

    let mut entries = Vec::new();
    for dl in area.select(&dl_selector) {
        let dts: Vec<_> = dl.select(&dt_selector).collect();
        let dds: Vec<_> = dl.select(&dd_selector).collect();
        // zip stops pairing when either side runs out
        for (dt, dd) in dts.into_iter().zip(dds.into_iter()) {
            if let Some(entry) = paper_entry(dt, dd, entries.len(), anchor) {
                entries.push(entry);
            }
        }
    }
    entries
}

fn paper_entry(
    dt: ElementRef<'_>,
    dd: ElementRef<'_>,
    ordinal: usize,
    anchor: DateTime<Utc>,
) -> Option<FeedEntry> {
    let link_selector = Selector::parse("a[href]").unwrap();
    let link = dt
        .select(&link_selector)
        .find(|a| href_of(*a).contains("arxiv.org/abs/"))
        .or_else(|| {
            dt.select(&link_selector).find(|a| {
                let href = href_of(*a).to_lowercase();
                href.contains("arxiv") || href.starts_with("/abs/")
            })
        })?;

    let url = normalize_abs_url(&href_of(link));
    let arxiv_id = utils::text_of(link);

    let title = select_text(dd, "div.list-title")
        .map(|t| t.replace("Title:", "").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("arXiv:{}", arxiv_id));

    let authors = select_text(dd, "div.list-authors")
        .map(|t| t.replace("Authors:", "").trim().to_string())
        .unwrap_or_default();
    let subjects = select_text(dd, "div.list-subjects")
        .map(|t| t.replace("Subjects:", "").trim().to_string())
        .unwrap_or_default();
    let abstract_text = select_text(dd, "p.mathjax").unwrap_or_default();

    let mut description_parts = Vec::new();
    if !authors.is_empty() {
        description_parts.push(format!("Authors: {}", authors));
    }
    if !subjects.is_empty() {
        description_parts.push(format!("Subjects: {}", subjects));
    }
    if !abstract_text.is_empty() {
        description_parts.push(format!("\n{}", abstract_text));
    }

    let published_at = submission_date(dd)
        .or_else(|| date_from_arxiv_id(&arxiv_id))
        .or_else(|| date_from_url(&url))
        .unwrap_or_else(|| {
            dates::fallback_date(anchor, ordinal, Duration::days(FALLBACK_SPACING_DAYS))
        });

    Some(FeedEntry {
        title,
        link: url.clone(),
        description: description_parts.join("\n"),
        published_at,
        guid: Some(url),
    })
}

fn href_of(el: ElementRef<'_>) -> String {
    el.value().attr("href").unwrap_or_default().to_string()
}

fn select_text(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).unwrap();
    scope.select(&selector).next().map(utils::text_of)
}

fn normalize_abs_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("https://arxiv.org{}", href)
    } else if href.starts_with("abs/") {
        format!("https://arxiv.org/{}", href)
    } else {
        format!("https://arxiv.org/abs/{}", href)
    }
}

/// Submission date from the listing's list-date block.
fn submission_date(dd: ElementRef<'_>) -> Option<DateTime<Utc>> {
    let text = select_text(dd, "div.list-date")?;
    let caps = LIST_DATE.captures(&text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = abbreviated_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    midnight(year, month, day)
}

/// The id's YYMM prefix gives year and month; the 15th stands in for the
/// unknown day.
fn date_from_arxiv_id(arxiv_id: &str) -> Option<DateTime<Utc>> {
    let caps = ID_YEAR_MONTH.captures(arxiv_id)?;
    let yy: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    midnight(year, month, 15)
}

fn date_from_url(url: &str) -> Option<DateTime<Utc>> {
    let caps = URL_PACKED_DATE.captures(url)?;
    midnight(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn abbreviated_month(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let prefix = lower.get(..3)?;
    MONTH_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == prefix)
        .map(|(_, number)| *number)
}

fn midnight(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Last resort when the dl/dt/dd structure is absent: collect paper links
/// directly and guess titles from nearby markup.
fn parse_link_fallback(document: &Html, anchor: DateTime<Utc>) -> Vec<FeedEntry> {
    let link_selector = Selector::parse("a[href]").unwrap();
    let title_class = Regex::new(r"(?i)title").unwrap();

    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for link in document
        .select(&link_selector)
        .filter(|a| ABS_LINK.is_match(&href_of(*a)))
        .take(MAX_FALLBACK_LINKS)
    {
        let url = normalize_abs_url(&href_of(link));
        if !seen.insert(url.clone()) {
            continue;
        }

        let arxiv_id = ABS_URL_ID
            .captures(&url)
            .map(|caps| caps[1].to_string())
            .or_else(|| {
                let text = utils::text_of(link);
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| "unknown".to_string());

        let title = nearby_title(link, &title_class)
            .unwrap_or_else(|| format!("arXiv:{}", arxiv_id));

        entries.push(FeedEntry {
            title,
            link: url.clone(),
            description: String::new(),
            published_at: dates::fallback_date(anchor, entries.len(), Duration::hours(1)),
            guid: Some(url),
        });
    }
    entries
}

/// Looks for a title-classed element in the link's parent, then in the
/// parent's following siblings.
fn nearby_title(link: ElementRef<'_>, title_class: &Regex) -> Option<String> {
    let parent = link.parent().and_then(ElementRef::wrap)?;

    let found = utils::classed_elements(parent, &["span", "div"], title_class)
        .into_iter()
        .next()
        .or_else(|| {
            parent
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find_map(|sibling| {
                    utils::classed_elements(sibling, &["span", "div", "strong"], title_class)
                        .into_iter()
                        .next()
                })
        })?;

    let text = utils::text_of(found);
    (!text.is_empty()).then_some(text)
}
