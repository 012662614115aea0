use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item of a generated feed. Built once per discovered page item and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    /// Permalink-style unique identifier, equal to the link where the source
    /// provides stable item URLs.
    pub guid: Option<String>,
}

/// Feed-level metadata for one source, including the fixed output filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub output_file: String,
}
