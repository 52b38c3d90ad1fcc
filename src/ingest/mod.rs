// Ingestion: keyword search on Reddit, media extraction, persistence.
//
// Runs as a one-shot batch (`flashpoint ingest`). By default only posts
// created on the current UTC day are kept, so repeated daily runs build up
// a rolling corpus without re-storing old results.

pub mod media;
pub mod reddit;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::db::models::Post;
use crate::db::PostStore;
use reddit::{RedditClient, RedditPost};

/// Search terms for weapon-related posts.
pub const SEARCH_KEYWORDS: [&str; 10] = [
    "gun", "firearm", "knife", "sword", "weapon", "guns", "knives", "firearms", "blade", "blades",
];

/// Ingest state key holding the RFC 3339 time of the last completed run.
pub const LAST_INGEST_KEY: &str = "last_ingest_at";

/// Join keywords into a single OR query.
pub fn build_search_query(keywords: &[&str]) -> String {
    keywords.join(" OR ")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub fetched: usize,
    pub kept: usize,
    pub stored: usize,
    pub with_media: usize,
}

/// Options for one ingest run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub subreddit: String,
    pub limit: u32,
    /// Keep posts from any day, not just today (UTC)
    pub all_dates: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            subreddit: "all".to_string(),
            limit: 100,
            all_dates: false,
        }
    }
}

/// Fetch up to `limit` matching posts and store the ones that pass the
/// date filter.
pub async fn run(
    client: &RedditClient,
    store: &dyn PostStore,
    options: &IngestOptions,
) -> Result<IngestStats> {
    let query = build_search_query(&SEARCH_KEYWORDS);
    let today = Utc::now().date_naive();
    let mut stats = IngestStats::default();
    let mut after: Option<String> = None;

    while stats.fetched < options.limit as usize {
        let remaining = options.limit - stats.fetched as u32;
        let listing = client
            .search(&options.subreddit, &query, remaining, after.as_deref())
            .await?;

        let page_len = listing.data.children.len();
        info!(page_len, "Fetched search page");

        for thing in listing.data.children {
            if thing.kind != "t3" {
                continue;
            }
            stats.fetched += 1;

            if !options.all_dates && !created_on(&thing.data, today) {
                continue;
            }
            stats.kept += 1;

            let post = to_post(&thing.data);
            if post.has_media() {
                stats.with_media += 1;
            }

            match store.insert_post(&post).await {
                Ok(true) => {
                    stats.stored += 1;
                    println!("Saved post: {}", crate::output::truncate_chars(&post.title, 100));
                }
                Ok(false) => {}
                Err(e) => warn!(url = %post.url, error = %e, "Failed to store post, skipping"),
            }
        }

        after = listing.data.after;
        if after.is_none() || page_len == 0 {
            break;
        }
    }

    store
        .set_state(LAST_INGEST_KEY, &Utc::now().to_rfc3339())
        .await?;

    Ok(stats)
}

/// Whether a post was created on the given UTC calendar day.
pub fn created_on(post: &RedditPost, day: NaiveDate) -> bool {
    DateTime::from_timestamp(post.created_utc as i64, 0)
        .map(|t| t.date_naive() == day)
        .unwrap_or(false)
}

/// Convert a listing entry into the stored record.
pub fn to_post(post: &RedditPost) -> Post {
    let author = post
        .author
        .as_deref()
        .filter(|a| !a.is_empty() && *a != "[deleted]")
        .map(str::to_string);

    Post {
        title: post.title.clone(),
        author,
        subreddit: post.subreddit.clone(),
        url: format!("https://reddit.com{}", post.permalink),
        media_urls: media::extract_media_urls(post),
        created_utc: post.created_utc,
        ingested_at: String::new(),
    }
}
