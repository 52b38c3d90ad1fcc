// Hate speech filter: classifier label to a yes/no judgment.
//
// Titles are cut to MAX_TEXT_CHARS before classification; longer text is
// truncated, never rejected. Empty titles skip the classifier entirely.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::traits::{TextClassification, TextClassifier};
use crate::error::{Capability, ScreenError};
use crate::output::truncate_chars_exact;

/// Longest prefix of a title that gets classified, in characters.
pub const MAX_TEXT_CHARS: usize = 512;

/// Labels (upper-cased) treated as hate speech.
///
/// TOXIC/INSULT/THREAT/ABUSE cover the common hosted classifiers. The
/// unbiased-toxic-roberta spellings (TOXICITY, SEVERE_TOXICITY,
/// IDENTITY_ATTACK) are listed too, since that is the default local model.
pub const TOXIC_LABELS: [&str; 7] = [
    "TOXIC",
    "INSULT",
    "THREAT",
    "ABUSE",
    "TOXICITY",
    "SEVERE_TOXICITY",
    "IDENTITY_ATTACK",
];

pub fn is_toxic_label(label: &str) -> bool {
    let normalized = label.trim().to_uppercase();
    TOXIC_LABELS.contains(&normalized.as_str())
}

/// Outcome of screening one text.
#[derive(Debug, Clone, PartialEq)]
pub struct HateVerdict {
    pub is_hate_speech: bool,
    /// None when the text was empty and the classifier wasn't called
    pub classification: Option<TextClassification>,
}

impl HateVerdict {
    fn skipped() -> Self {
        Self {
            is_hate_speech: false,
            classification: None,
        }
    }
}

pub struct HateSpeechFilter {
    classifier: Arc<dyn TextClassifier>,
    min_confidence: f64,
    timeout: Duration,
}

impl HateSpeechFilter {
    /// `min_confidence` of 0.0 accepts any toxic label regardless of score.
    pub fn new(classifier: Arc<dyn TextClassifier>, min_confidence: f64, timeout: Duration) -> Self {
        Self {
            classifier,
            min_confidence,
            timeout,
        }
    }

    /// Decide whether `text` is hate speech.
    ///
    /// Classifier errors and timeouts are ClassificationUnavailable: the
    /// caller must treat the signal as unknown, not as a clean negative.
    pub async fn is_hate_speech(&self, text: &str) -> Result<HateVerdict, ScreenError> {
        if text.trim().is_empty() {
            return Ok(HateVerdict::skipped());
        }

        let input = truncate_chars_exact(text, MAX_TEXT_CHARS);

        let classification =
            match tokio::time::timeout(self.timeout, self.classifier.classify(input)).await {
                Ok(Ok(c)) => c,
                Ok(Err(e)) => {
                    return Err(ScreenError::classification(
                        Capability::TextClassifier,
                        format!("{e:#}"),
                    ))
                }
                Err(_) => {
                    return Err(ScreenError::classification(
                        Capability::TextClassifier,
                        format!("timed out after {:?}", self.timeout),
                    ))
                }
            };

        let is_hate_speech = is_toxic_label(&classification.label)
            && classification.confidence_score >= self.min_confidence;

        debug!(
            label = %classification.label,
            confidence = classification.confidence_score,
            is_hate_speech,
            "Classified title"
        );

        Ok(HateVerdict {
            is_hate_speech,
            classification: Some(classification),
        })
    }
}
