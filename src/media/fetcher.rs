// HTTP media fetcher.
//
// One GET per URL, no retry. Non-2xx responses and bodies the image crate
// can't decode are errors; the analyzer turns them into MediaUnavailable.
// Reddit-hosted videos (v.redd.it) fail the decode step the same way, so
// only still images are screened.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{MediaFetcher, MediaImage};

/// Upper bound on a single media body. Larger responses are rejected
/// before decoding.
const MAX_MEDIA_BYTES: usize = 32 * 1024 * 1024;

pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaImage> {
        debug!(url = url, "Fetching media");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("{url} returned {}", response.status());
        }

        if let Some(len) = response.content_length() {
            check_size(url, len as usize)?;
        }

        // Content-Length can be absent or wrong, so the cap also applies
        // while reading
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?
        {
            check_size(url, bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        let image = decode_image(&bytes).with_context(|| format!("Could not decode {url}"))?;

        Ok(MediaImage::new(url, image))
    }
}

fn check_size(url: &str, len: usize) -> Result<()> {
    if len > MAX_MEDIA_BYTES {
        anyhow::bail!("{url} is over the {MAX_MEDIA_BYTES} byte limit ({len} bytes)");
    }
    Ok(())
}

/// Decode raw bytes into an RGB image, sniffing the format from content.
pub fn decode_image(bytes: &[u8]) -> Result<image::DynamicImage> {
    let image = image::load_from_memory(bytes).context("Unsupported or corrupt image data")?;
    Ok(image::DynamicImage::ImageRgb8(image.to_rgb8()))
}
