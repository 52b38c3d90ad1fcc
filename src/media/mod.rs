// Media fetching: resolve a media URL to a decoded image.
//
// The MediaFetcher trait is the seam: HttpMediaFetcher does real network
// fetches, tests substitute canned images.

pub mod fetcher;

use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;

/// A decoded image together with the URL it came from.
#[derive(Debug, Clone)]
pub struct MediaImage {
    pub source_url: String,
    pub image: DynamicImage,
}

impl MediaImage {
    pub fn new(source_url: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            source_url: source_url.into(),
            image,
        }
    }
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch and decode one media URL. Called at most once per URL per run.
    async fn fetch(&self, url: &str) -> Result<MediaImage>;
}
