// Data models: Rust structs that map to database rows.
//
// Kept separate from the queries so the pipeline can use them without
// depending on rusqlite directly.

use serde::{Deserialize, Serialize};

/// An ingested post. Read-only input to the screening pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    /// None when the account was deleted or the listing omitted it
    pub author: Option<String>,
    pub subreddit: String,
    /// Permalink, unique per post
    pub url: String,
    /// Image/video references in listing order
    pub media_urls: Vec<String>,
    /// Creation time on the source platform (unix seconds)
    pub created_utc: f64,
    /// When we stored it; set by the database on insert
    pub ingested_at: String,
}

impl Post {
    pub fn has_media(&self) -> bool {
        !self.media_urls.is_empty()
    }
}

/// Row counts shown by `flashpoint status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCounts {
    pub total: i64,
    pub with_media: i64,
}
