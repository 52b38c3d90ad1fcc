// Screening error taxonomy.
//
// Three failure classes with different blast radii:
// - MediaUnavailable: one URL could not be fetched or decoded. Recovered
//   locally as "zero detections for this URL".
// - ClassificationUnavailable: an inference capability errored or timed out.
//   The affected signal becomes unknown; the post may end up inconclusive.
// - StoreUnavailable: the post corpus can't be queried. Aborts the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("media unavailable at {url}: {reason}")]
    MediaUnavailable { url: String, reason: String },

    #[error("{capability} unavailable: {reason}")]
    ClassificationUnavailable {
        capability: Capability,
        reason: String,
    },

    #[error("post store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Which inference capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ObjectDetector,
    TextClassifier,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::ObjectDetector => write!(f, "object detector"),
            Capability::TextClassifier => write!(f, "text classifier"),
        }
    }
}

impl ScreenError {
    pub fn media(url: &str, reason: impl std::fmt::Display) -> Self {
        ScreenError::MediaUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn classification(capability: Capability, reason: impl std::fmt::Display) -> Self {
        ScreenError::ClassificationUnavailable {
            capability,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_names_the_url() {
        let err = ScreenError::media("https://i.redd.it/a.jpg", "404 Not Found");
        assert_eq!(
            err.to_string(),
            "media unavailable at https://i.redd.it/a.jpg: 404 Not Found"
        );
    }

    #[test]
    fn test_classification_error_names_the_capability() {
        let err = ScreenError::classification(Capability::TextClassifier, "timed out");
        assert_eq!(err.to_string(), "text classifier unavailable: timed out");
    }
}
