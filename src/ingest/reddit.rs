// Reddit listing client: unauthenticated JSON over HTTP.
//
// Reddit serves every listing page as JSON when `.json` is appended to the
// path, so keyword search needs no OAuth app. Unauthenticated clients are
// held to a low request rate and must send a descriptive User-Agent.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Default base URL for the public listing API.
pub const DEFAULT_REDDIT_API_URL: &str = "https://www.reddit.com";

/// Most results Reddit returns in one listing page.
pub const MAX_PAGE_SIZE: u32 = 100;

pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
}

impl RedditClient {
    /// Create a client pointing at the given base URL (override for tests
    /// or a caching proxy).
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search a subreddit ("all" for site-wide), newest first.
    pub async fn search(
        &self,
        subreddit: &str,
        query: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Listing> {
        let url = format!("{}/r/{}/search.json", self.base_url, subreddit);
        let limit = limit.min(MAX_PAGE_SIZE).to_string();

        let mut params = vec![
            ("q", query),
            ("sort", "new"),
            ("limit", limit.as_str()),
            ("raw_json", "1"),
        ];
        if subreddit != "all" {
            params.push(("restrict_sr", "1"));
        }
        if let Some(after) = after {
            params.push(("after", after));
        }

        debug!(subreddit = subreddit, after = ?after, "Reddit search request");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .with_context(|| format!("Reddit search failed for r/{subreddit}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit search returned {status}: {body}");
        }

        response
            .json::<Listing>()
            .await
            .context("Failed to deserialize Reddit listing")
    }
}

// -- Serde types for listing responses --

/// A page of search results.
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    pub children: Vec<Thing>,
    /// Cursor for the next page; None on the last page
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: RedditPost,
}

/// The submission fields we use. Everything media-related is optional
/// because which ones are present depends on the post type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditPost {
    pub title: String,
    pub author: Option<String>,
    pub subreddit: String,
    pub permalink: String,
    pub url: Option<String>,
    pub created_utc: f64,
    #[serde(default)]
    pub is_gallery: bool,
    pub gallery_data: Option<GalleryData>,
    pub media_metadata: Option<HashMap<String, MediaMetadata>>,
    pub media: Option<SecureMedia>,
    pub preview: Option<Preview>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryData {
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryItem {
    pub media_id: String,
}

/// One gallery entry. `p` holds downscaled previews (smallest first),
/// `s` the source rendition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaMetadata {
    pub status: Option<String>,
    #[serde(default)]
    pub p: Vec<MediaRendition>,
    pub s: Option<MediaRendition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaRendition {
    pub u: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecureMedia {
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditVideo {
    pub fallback_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewImage {
    pub source: Option<MediaSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaSource {
    pub url: Option<String>,
}
