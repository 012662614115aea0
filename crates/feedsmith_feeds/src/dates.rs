use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::ElementRef;

lazy_static! {
    static ref DATE_CLASS: Regex = Regex::new(r"(?i)date|time|published|timestamp|meta").unwrap();
    static ref PARENT_DATE_CLASS: Regex = Regex::new(r"(?i)date|time|published").unwrap();
    static ref URL_DATE: Regex = Regex::new(r"/(\d{4})/(\d{1,2})/").unwrap();
    static ref TEXT_ISO: Regex = Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap();
    static ref TEXT_MONTH: Regex = Regex::new(r"(\w+)\s+(\d{1,2}),\s+(\d{4})").unwrap();
    static ref TEXT_SLASH: Regex = Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap();
}

const MONTH_NAMES: [(&str, u32); 12] = [
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Inputs available when resolving a publication date for one discovered item.
///
/// `anchor` is captured once per generation run so that items which end up on
/// the synthetic fallback stay exactly `spacing` apart in discovery order.
pub struct ExtractionContext<'a> {
    pub fragment: ElementRef<'a>,
    pub url: Option<&'a str>,
    pub ordinal: usize,
    pub spacing: Duration,
    pub anchor: DateTime<Utc>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(
        fragment: ElementRef<'a>,
        url: Option<&'a str>,
        ordinal: usize,
        spacing: Duration,
        anchor: DateTime<Utc>,
    ) -> Self {
        Self {
            fragment,
            url,
            ordinal,
            spacing,
            anchor,
        }
    }
}

type Strategy = fn(&ExtractionContext<'_>) -> Option<DateTime<Utc>>;

/// Extraction strategies in cascade order; the first non-None result wins.
const STRATEGIES: [Strategy; 4] = [
    date_bearing_node,
    parent_scope,
    url_path_date,
    free_text_scan,
];

/// Runs the extraction cascade without the synthetic fallback.
pub fn try_strategies(ctx: &ExtractionContext<'_>) -> Option<DateTime<Utc>> {
    STRATEGIES.iter().find_map(|strategy| strategy(ctx))
}

/// Resolves a best-guess publication date. Total: when every strategy fails
/// the synthetic fallback keeps entries orderable.
pub fn resolve(ctx: &ExtractionContext<'_>) -> DateTime<Utc> {
    try_strategies(ctx).unwrap_or_else(|| fallback_date(ctx.anchor, ctx.ordinal, ctx.spacing))
}

/// Synthetic ordering date: `anchor - spacing * ordinal`, newest first
/// matching discovery order.
pub fn fallback_date(anchor: DateTime<Utc>, ordinal: usize, spacing: Duration) -> DateTime<Utc> {
    anchor - spacing * ordinal as i32
}

fn is_date_like(el: ElementRef<'_>, tags: &[&str], class_pattern: &Regex, bare_time: bool) -> bool {
    let name = el.value().name();
    if bare_time && name == "time" {
        return true;
    }
    tags.contains(&name)
        && el
            .value()
            .attr("class")
            .map(|classes| class_pattern.is_match(classes))
            .unwrap_or(false)
}

fn node_date_string(el: ElementRef<'_>) -> Option<String> {
    for attr in ["datetime", "title", "data-date"] {
        if let Some(value) = el.value().attr(attr) {
            if !value.trim().is_empty() {
                return Some(value.to_string());
            }
        }
    }
    let text = el.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn scan_scope(
    scope: ElementRef<'_>,
    tags: &[&str],
    class_pattern: &Regex,
    bare_time: bool,
) -> Option<DateTime<Utc>> {
    // Document order; the first node whose value actually parses wins.
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| is_date_like(*el, tags, class_pattern, bare_time))
        .filter_map(node_date_string)
        .find_map(|raw| parse_date_string(&raw))
}

/// A `time` element counts as date-bearing on its own; span/div/p need a
/// date-like class.
fn date_bearing_node(ctx: &ExtractionContext<'_>) -> Option<DateTime<Utc>> {
    scan_scope(ctx.fragment, &["span", "div", "p"], &DATE_CLASS, true)
}

/// One level up only, no unbounded ascent. The class is required here even
/// on `time` nodes, otherwise a sibling item's bare timestamp would leak
/// through the shared parent.
fn parent_scope(ctx: &ExtractionContext<'_>) -> Option<DateTime<Utc>> {
    let parent = ctx.fragment.parent().and_then(ElementRef::wrap)?;
    scan_scope(parent, &["time", "span", "div"], &PARENT_DATE_CLASS, false)
}

fn url_path_date(ctx: &ExtractionContext<'_>) -> Option<DateTime<Utc>> {
    let caps = URL_DATE.captures(ctx.url?)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    midnight_utc(NaiveDate::from_ymd_opt(year, month, 1)?)
}

fn free_text_scan(ctx: &ExtractionContext<'_>) -> Option<DateTime<Utc>> {
    let text = ctx.fragment.text().collect::<String>();

    // Earliest match position in the text wins, ties broken by pattern order.
    // Candidates that fail validation fall through to the next one.
    let mut candidates: Vec<(usize, usize, Option<NaiveDate>)> = Vec::new();
    for caps in TEXT_ISO.captures_iter(&text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let date = ymd(&caps[1], &caps[2], &caps[3]);
        candidates.push((start, 0, date));
    }
    for caps in TEXT_MONTH.captures_iter(&text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let month = month_number(&caps[1]);
        let date = month.and_then(|m| ymd_parts(&caps[3], m, &caps[2]));
        candidates.push((start, 1, date));
    }
    for caps in TEXT_SLASH.captures_iter(&text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        // MM/DD/YYYY field order
        let date = ymd(&caps[3], &caps[1], &caps[2]);
        candidates.push((start, 2, date));
    }

    candidates.sort_by_key(|(start, pattern, _)| (*start, *pattern));
    candidates
        .into_iter()
        .find_map(|(_, _, date)| date)
        .and_then(midnight_utc)
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(month, _)| *month == lower)
        .map(|(_, number)| *number)
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn ymd_parts(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

fn midnight_utc(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Format patterns attempted in fixed order after the ISO parse. The
/// `%m/%d/%Y` before `%d/%m/%Y` ordering is deliberate and load-bearing:
/// for ambiguous numeric dates the month-first reading wins.
const FORMATS: [(&str, bool); 10] = [
    ("%Y-%m-%d", false),
    ("%Y-%m-%d %H:%M:%S", true),
    ("%Y-%m-%dT%H:%M:%S", true),
    ("%Y-%m-%dT%H:%M:%SZ", true),
    ("%B %d, %Y", false),
    ("%b %d, %Y", false),
    ("%d %B %Y", false),
    ("%d %b %Y", false),
    ("%m/%d/%Y", false),
    ("%d/%m/%Y", false),
];

/// Tries to parse a loose natural-language date string. Returns None rather
/// than an error so callers can cascade to the next strategy.
pub fn parse_date_string(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    // ISO-8601 first, a literal trailing Z meaning UTC.
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text.replace('Z', "+00:00")) {
        return Some(parsed.with_timezone(&Utc));
    }

    for (format, has_time) in FORMATS {
        if has_time {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(Utc.from_utc_datetime(&dt));
            }
        } else if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return midnight_utc(date);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_iso_with_zone() {
        let parsed = parse_date_string("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_plain_formats() {
        assert_eq!(parse_date_string("2024-01-15").unwrap(), utc(2024, 1, 15));
        assert_eq!(
            parse_date_string("2024-01-15 08:00:05").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 5).unwrap()
        );
        assert_eq!(
            parse_date_string("January 15, 2024").unwrap(),
            utc(2024, 1, 15)
        );
        assert_eq!(parse_date_string("Jan 15, 2024").unwrap(), utc(2024, 1, 15));
        assert_eq!(
            parse_date_string("15 January 2024").unwrap(),
            utc(2024, 1, 15)
        );
        assert_eq!(parse_date_string("15 Jan 2024").unwrap(), utc(2024, 1, 15));
    }

    #[test]
    fn test_ambiguous_slash_date_is_month_first() {
        // Both components <= 12: the %m/%d/%Y reading must win.
        assert_eq!(parse_date_string("03/04/2024").unwrap(), utc(2024, 3, 4));
        // Month-first impossible, day-first reading takes over.
        assert_eq!(parse_date_string("25/12/2024").unwrap(), utc(2024, 12, 25));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_date_string("").is_none());
        assert!(parse_date_string("   ").is_none());
        assert!(parse_date_string("not a date").is_none());
        assert!(parse_date_string("9999-99-99").is_none());
    }

    fn resolve_fragment(html: &str, url: Option<&str>) -> DateTime<Utc> {
        let document = Html::parse_document(html);
        let ctx = ExtractionContext::new(
            document.root_element(),
            url,
            0,
            Duration::days(2),
            Utc::now(),
        );
        resolve(&ctx)
    }

    #[test]
    fn test_structured_node_beats_free_text() {
        let html = r#"
            <article>
                <p>Posted 06/01/2023 somewhere in the body.</p>
                <time datetime="2024-01-15">a while ago</time>
            </article>
        "#;
        assert_eq!(resolve_fragment(html, None), utc(2024, 1, 15));
    }

    #[test]
    fn test_classed_span_with_unparseable_text_is_skipped() {
        // First selector hit does not parse; the cascade must keep going to
        // the next matching node instead of giving up on the strategy.
        let html = r#"
            <div>
                <span class="date">three days ago</span>
                <span class="published">2023-06-01</span>
            </div>
        "#;
        assert_eq!(resolve_fragment(html, None), utc(2023, 6, 1));
    }

    #[test]
    fn test_url_path_date() {
        let html = "<article><p>nothing datelike here</p></article>";
        assert_eq!(
            resolve_fragment(html, Some("https://example.com/blog/2024/03/some-post")),
            utc(2024, 3, 1)
        );
    }

    #[test]
    fn test_free_text_first_match_position_wins() {
        // The slash date appears earlier in the text than the ISO date.
        let html = "<p>Updated 05/06/2023, originally 2022-01-10.</p>";
        assert_eq!(resolve_fragment(html, None), utc(2023, 5, 6));
    }

    #[test]
    fn test_free_text_month_name() {
        let html = "<p>Published on March 9, 2024 by the team.</p>";
        assert_eq!(resolve_fragment(html, None), utc(2024, 3, 9));
    }

    #[test]
    fn test_free_text_unknown_month_word_falls_through() {
        let html = "<p>Revision 5, 2024 ... actual date 2024-02-02</p>";
        assert_eq!(resolve_fragment(html, None), utc(2024, 2, 2));
    }

    #[test]
    fn test_fallback_spacing_is_exact() {
        let anchor = utc(2025, 6, 1);
        let spacing = Duration::days(2);
        let d0 = fallback_date(anchor, 0, spacing);
        let d1 = fallback_date(anchor, 1, spacing);
        let d2 = fallback_date(anchor, 2, spacing);
        assert_eq!(d0, anchor);
        assert_eq!(d0 - d1, Duration::days(2));
        assert_eq!(d1 - d2, Duration::days(2));
        assert!(d0 > d1 && d1 > d2);
    }

    #[test]
    fn test_resolve_is_total() {
        let document = Html::parse_document("<div><p>no dates at all</p></div>");
        let anchor = utc(2025, 1, 1);
        let ctx = ExtractionContext::new(
            document.root_element(),
            None,
            3,
            Duration::days(7),
            anchor,
        );
        assert_eq!(resolve(&ctx), anchor - Duration::days(21));
    }
}
