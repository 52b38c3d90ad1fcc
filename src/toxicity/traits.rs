// Text classifier trait: the swap-ready abstraction.
//
// Any model that returns one best label plus a confidence per call fits
// behind this trait.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The classifier's best label for a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClassification {
    /// Label in the model's own spelling (e.g. "toxicity", "TOXIC", "insult")
    pub label: String,
    /// 0.0 to 1.0
    pub confidence_score: f64,
}

impl TextClassification {
    pub fn new(label: impl Into<String>, confidence_score: f64) -> Self {
        Self {
            label: label.into(),
            confidence_score,
        }
    }
}

/// Trait for text classifiers. Async because remote providers make HTTP
/// calls and local ones offload inference to a blocking thread.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify one text, returning the single highest-scoring label.
    async fn classify(&self, text: &str) -> Result<TextClassification>;
}
