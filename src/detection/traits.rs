use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::media::MediaImage;

/// One object found by a detector, before any vocabulary filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Class name from the model's own label set (e.g. "knife")
    pub label: String,
    /// 0.0 to 1.0
    pub confidence: f64,
    /// (x1, y1, x2, y2) in source image pixels
    #[serde(rename = "box")]
    pub bbox: [f64; 4],
}

/// Trait for object detectors. Async because remote detectors make HTTP
/// calls and local ones offload inference to a blocking thread.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detect every object the model knows about in one image.
    async fn infer(&self, image: &MediaImage) -> Result<Vec<RawDetection>>;
}
