// Remote object detection endpoint.
//
// For detectors that don't ship as a local ONNX file (weapon-trained YOLO
// variants, hosted vision services). Contract:
//   POST <url>, body = PNG bytes, Content-Type: image/png
//   200 -> [{"label": "...", "confidence": 0.0-1.0, "box": [x1, y1, x2, y2]}]

use std::io::Cursor;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::traits::{ObjectDetector, RawDetection};
use crate::media::MediaImage;

pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
}

impl HttpDetector {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("flashpoint/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn infer(&self, image: &MediaImage) -> Result<Vec<RawDetection>> {
        let body = encode_png(&image.image)?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(body)
            .send()
            .await
            .context("Detector endpoint request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Detector endpoint returned {}: {}", status, body);
        }

        let detections: Vec<RawDetection> = response
            .json()
            .await
            .context("Failed to parse detector response")?;

        debug!(
            url = %image.source_url,
            objects = detections.len(),
            "Remote detection complete"
        );

        Ok(detections)
    }
}

fn encode_png(img: &image::DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("Failed to encode image as PNG")?;
    Ok(buf)
}
