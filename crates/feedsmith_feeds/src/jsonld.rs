use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::dates::parse_date_string;

/// Extracts a `datePublished` value from JSON-LD metadata in the document.
/// Looks at the top level of each script block, then under a `@graph` list.
pub fn date_published(document: &Html) -> Option<DateTime<Utc>> {
    let script_selector = Selector::parse("script[type='application/ld+json']").ok()?;

    for script in document.select(&script_selector) {
        let raw = script.text().collect::<String>();
        let Ok(json) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };

        if let Some(date) = json.get("datePublished").and_then(value_to_date) {
            return Some(date);
        }

        if let Some(graph) = json.get("@graph").and_then(Value::as_array) {
            for item in graph {
                if let Some(date) = item.get("datePublished").and_then(value_to_date) {
                    return Some(date);
                }
            }
        }
    }

    None
}

fn value_to_date(value: &Value) -> Option<DateTime<Utc>> {
    parse_date_string(value.as_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_top_level_date_published() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
                {"@type": "BlogPosting", "datePublished": "2024-01-15T10:30:00Z"}
            </script>
            </head><body></body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(
            date_published(&document).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_graph_nested_date_published() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
                {"@graph": [{"@type": "WebPage"}, {"@type": "Article", "datePublished": "2023-11-02"}]}
            </script>
            </head><body></body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(
            date_published(&document).unwrap(),
            Utc.with_ymd_and_hms(2023, 11, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">{not json}</script>
            <script type="application/ld+json">{"datePublished": "2024-05-20"}</script>
            </head><body></body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(
            date_published(&document).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_no_structured_data() {
        let document = Html::parse_document("<html><body><p>plain page</p></body></html>");
        assert!(date_published(&document).is_none());
    }
}
