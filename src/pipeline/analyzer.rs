// Per-post analysis: title screening, media screening, and the gate.
//
// A post is flagged only when its title is hate speech AND at least one of
// its images contains a weapon. Each side is three-valued so that a model
// outage never masquerades as a clean negative:
//
//   text      weapons     outcome
//   positive  positive    Flagged
//   negative  *           Clean
//   *         negative    Clean
//   otherwise             Inconclusive
//
// Media URLs are screened one after another inside the caller's worker;
// concurrency comes only from the screener running many posts at once.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::models::Post;
use crate::detection::weapons::{Detection, WeaponFilter};
use crate::error::ScreenError;
use crate::media::MediaFetcher;
use crate::toxicity::hate::HateSpeechFilter;

/// Kinds of objectionable content a flagged post carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    HateSpeech,
    Weapon,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::HateSpeech => "hate_speech",
            ContentType::Weapon => "weapon",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A flagged post. Always carries both content types, since the gate
/// requires both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub post_url: String,
    pub types_of_objectionable_content: Vec<ContentType>,
}

impl AnalysisResult {
    fn flagged(post_url: &str) -> Self {
        Self {
            post_url: post_url.to_string(),
            types_of_objectionable_content: vec![ContentType::HateSpeech, ContentType::Weapon],
        }
    }
}

/// A post whose gate couldn't be resolved because a model was unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InconclusivePost {
    pub post_url: String,
    pub reasons: Vec<String>,
}

/// One side of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Positive,
    Negative,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Flagged(AnalysisResult),
    Clean,
    Inconclusive(InconclusivePost),
}

impl PostOutcome {
    /// The flagged result, if any.
    pub fn flagged(self) -> Option<AnalysisResult> {
        match self {
            PostOutcome::Flagged(result) => Some(result),
            _ => None,
        }
    }
}

/// Combine the two signals. Pure; the whole business rule lives here.
pub fn gate(text: Signal, weapons: Signal) -> GateDecision {
    match (text, weapons) {
        (Signal::Positive, Signal::Positive) => GateDecision::Flag,
        (Signal::Negative, _) | (_, Signal::Negative) => GateDecision::Clear,
        _ => GateDecision::Undecided,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Flag,
    Clear,
    Undecided,
}

/// Weapon evidence gathered across all of a post's media.
#[derive(Debug, Default)]
pub struct MediaScreening {
    pub detections: Vec<Detection>,
    /// URLs that couldn't be fetched or decoded (count as zero detections)
    pub unavailable: Vec<String>,
    /// Detector failures; these make a negative result unknown
    pub inference_failures: Vec<String>,
}

impl MediaScreening {
    pub fn signal(&self) -> Signal {
        if !self.detections.is_empty() {
            Signal::Positive
        } else if !self.inference_failures.is_empty() {
            Signal::Unknown
        } else {
            Signal::Negative
        }
    }
}

pub struct PostAnalyzer {
    fetcher: Arc<dyn MediaFetcher>,
    weapons: WeaponFilter,
    hate: HateSpeechFilter,
    fetch_timeout: Duration,
}

impl PostAnalyzer {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        weapons: WeaponFilter,
        hate: HateSpeechFilter,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            weapons,
            hate,
            fetch_timeout,
        }
    }

    /// Screen one post. Never fails: media and model errors are logged and
    /// folded into the outcome.
    pub async fn analyze(&self, post: &Post) -> PostOutcome {
        let mut reasons = Vec::new();

        let text_signal = match self.hate.is_hate_speech(&post.title).await {
            Ok(verdict) if verdict.is_hate_speech => Signal::Positive,
            Ok(_) => Signal::Negative,
            Err(e) => {
                warn!(post_url = %post.url, error = %e, "Title classification failed");
                reasons.push(e.to_string());
                Signal::Unknown
            }
        };

        let media = self.screen_media(&post.media_urls).await;
        let weapon_signal = media.signal();
        reasons.extend(media.inference_failures.iter().cloned());

        debug!(
            post_url = %post.url,
            text = ?text_signal,
            weapons = ?weapon_signal,
            detections = media.detections.len(),
            unavailable = media.unavailable.len(),
            "Post analyzed"
        );

        match gate(text_signal, weapon_signal) {
            GateDecision::Flag => PostOutcome::Flagged(AnalysisResult::flagged(&post.url)),
            GateDecision::Clear => PostOutcome::Clean,
            GateDecision::Undecided => PostOutcome::Inconclusive(InconclusivePost {
                post_url: post.url.clone(),
                reasons,
            }),
        }
    }

    /// Fetch and screen each URL in order, accumulating detections.
    pub async fn screen_media(&self, urls: &[String]) -> MediaScreening {
        let mut screening = MediaScreening::default();

        for url in urls {
            match self.screen_url(url).await {
                Ok(found) => screening.detections.extend(found),
                Err(e @ ScreenError::MediaUnavailable { .. }) => {
                    warn!(url = %url, error = %e, "Media unavailable, treating as no detections");
                    screening.unavailable.push(url.clone());
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Weapon detection failed");
                    screening.inference_failures.push(e.to_string());
                }
            }
        }

        screening
    }

    async fn screen_url(&self, url: &str) -> Result<Vec<Detection>, ScreenError> {
        let image = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => return Err(ScreenError::media(url, format!("{e:#}"))),
            Err(_) => {
                return Err(ScreenError::media(
                    url,
                    format!("timed out after {:?}", self.fetch_timeout),
                ))
            }
        };

        self.weapons.detect_weapons(&image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_requires_both_signals() {
        assert_eq!(gate(Signal::Positive, Signal::Positive), GateDecision::Flag);
        assert_eq!(gate(Signal::Positive, Signal::Negative), GateDecision::Clear);
        assert_eq!(gate(Signal::Negative, Signal::Positive), GateDecision::Clear);
        assert_eq!(gate(Signal::Negative, Signal::Negative), GateDecision::Clear);
    }

    #[test]
    fn test_gate_unknown_never_flags() {
        assert_eq!(gate(Signal::Unknown, Signal::Positive), GateDecision::Undecided);
        assert_eq!(gate(Signal::Positive, Signal::Unknown), GateDecision::Undecided);
        assert_eq!(gate(Signal::Unknown, Signal::Unknown), GateDecision::Undecided);
    }

    #[test]
    fn test_gate_negative_resolves_unknown() {
        assert_eq!(gate(Signal::Unknown, Signal::Negative), GateDecision::Clear);
        assert_eq!(gate(Signal::Negative, Signal::Unknown), GateDecision::Clear);
    }

    #[test]
    fn test_media_signal() {
        let mut m = MediaScreening::default();
        assert_eq!(m.signal(), Signal::Negative);

        m.unavailable.push("u".into());
        assert_eq!(m.signal(), Signal::Negative, "fetch failures count as no detections");

        m.inference_failures.push("boom".into());
        assert_eq!(m.signal(), Signal::Unknown);

        m.detections.push(Detection {
            weapon_type: "knife".into(),
            confidence_score: 0.9,
            bounding_box: [0.0; 4],
        });
        assert_eq!(m.signal(), Signal::Positive, "a hit wins over failures elsewhere");
    }

    #[test]
    fn test_content_types_serialize_snake_case() {
        let result = AnalysisResult::flagged("https://reddit.com/r/x/1");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json["types_of_objectionable_content"],
            serde_json::json!(["hate_speech", "weapon"])
        );
    }
}
