// Unit tests for the weapon and hate speech filters, driven through their
// async entry points with recording stand-in models.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use image::{DynamicImage, RgbImage};

use flashpoint::detection::traits::{ObjectDetector, RawDetection};
use flashpoint::detection::weapons::WeaponFilter;
use flashpoint::error::{Capability, ScreenError};
use flashpoint::media::MediaImage;
use flashpoint::toxicity::hate::{HateSpeechFilter, MAX_TEXT_CHARS};
use flashpoint::toxicity::traits::{TextClassification, TextClassifier};

const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================
// Hate speech filter
// ============================================================

/// Records every input and answers with a fixed label.
struct RecordingClassifier {
    label: &'static str,
    score: f64,
    inputs: Mutex<Vec<String>>,
}

impl RecordingClassifier {
    fn new(label: &'static str, score: f64) -> Arc<Self> {
        Arc::new(Self {
            label,
            score,
            inputs: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextClassifier for RecordingClassifier {
    async fn classify(&self, text: &str) -> Result<TextClassification> {
        self.inputs.lock().unwrap().push(text.to_string());
        Ok(TextClassification::new(self.label, self.score))
    }
}

struct FailingClassifier;

#[async_trait]
impl TextClassifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<TextClassification> {
        anyhow::bail!("connection refused")
    }
}

struct SlowClassifier;

#[async_trait]
impl TextClassifier for SlowClassifier {
    async fn classify(&self, _text: &str) -> Result<TextClassification> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(TextClassification::new("TOXIC", 1.0))
    }
}

#[tokio::test]
async fn toxic_label_is_hate_speech() {
    let classifier = RecordingClassifier::new("TOXIC", 0.88);
    let filter = HateSpeechFilter::new(classifier, 0.0, TIMEOUT);

    let verdict = filter.is_hate_speech("some title").await.unwrap();
    assert!(verdict.is_hate_speech);
    let c = verdict.classification.unwrap();
    assert_eq!(c.label, "TOXIC");
    assert!((c.confidence_score - 0.88).abs() < f64::EPSILON);
}

#[tokio::test]
async fn lowercase_model_labels_count() {
    let filter = HateSpeechFilter::new(RecordingClassifier::new("insult", 0.4), 0.0, TIMEOUT);
    assert!(filter.is_hate_speech("title").await.unwrap().is_hate_speech);
}

#[tokio::test]
async fn neutral_label_is_not_hate_speech() {
    let filter = HateSpeechFilter::new(RecordingClassifier::new("neutral", 0.99), 0.0, TIMEOUT);
    let verdict = filter.is_hate_speech("title").await.unwrap();
    assert!(!verdict.is_hate_speech);
    assert!(verdict.classification.is_some());
}

#[tokio::test]
async fn confidence_threshold_applies() {
    let weak = HateSpeechFilter::new(RecordingClassifier::new("TOXIC", 0.3), 0.5, TIMEOUT);
    assert!(!weak.is_hate_speech("title").await.unwrap().is_hate_speech);

    let strong = HateSpeechFilter::new(RecordingClassifier::new("TOXIC", 0.5), 0.5, TIMEOUT);
    assert!(strong.is_hate_speech("title").await.unwrap().is_hate_speech);
}

#[tokio::test]
async fn long_title_is_truncated_not_rejected() {
    let classifier = RecordingClassifier::new("TOXIC", 0.9);
    let filter = HateSpeechFilter::new(classifier.clone(), 0.0, TIMEOUT);

    let long = "é".repeat(MAX_TEXT_CHARS + 88);
    let verdict = filter.is_hate_speech(&long).await.unwrap();
    assert!(verdict.is_hate_speech);

    let inputs = classifier.inputs.lock().unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].chars().count(), MAX_TEXT_CHARS);
}

#[tokio::test]
async fn title_at_limit_is_passed_whole() {
    let classifier = RecordingClassifier::new("neutral", 0.9);
    let filter = HateSpeechFilter::new(classifier.clone(), 0.0, TIMEOUT);

    let exact = "x".repeat(MAX_TEXT_CHARS);
    filter.is_hate_speech(&exact).await.unwrap();
    assert_eq!(*classifier.inputs.lock().unwrap(), vec![exact]);
}

#[tokio::test]
async fn title_one_over_limit_loses_last_char() {
    let classifier = RecordingClassifier::new("neutral", 0.9);
    let filter = HateSpeechFilter::new(classifier.clone(), 0.0, TIMEOUT);

    let over = format!("{}Z", "x".repeat(MAX_TEXT_CHARS));
    filter.is_hate_speech(&over).await.unwrap();

    let inputs = classifier.inputs.lock().unwrap();
    assert_eq!(inputs[0], "x".repeat(MAX_TEXT_CHARS));
    assert!(!inputs[0].contains('Z'));
}

#[tokio::test]
async fn short_title_is_passed_unchanged() {
    let classifier = RecordingClassifier::new("neutral", 0.9);
    let filter = HateSpeechFilter::new(classifier.clone(), 0.0, TIMEOUT);

    filter.is_hate_speech("Range day with the new rifle").await.unwrap();
    assert_eq!(
        *classifier.inputs.lock().unwrap(),
        vec!["Range day with the new rifle"]
    );
}

#[tokio::test]
async fn empty_title_skips_classifier() {
    let classifier = RecordingClassifier::new("TOXIC", 0.9);
    let filter = HateSpeechFilter::new(classifier.clone(), 0.0, TIMEOUT);

    for text in ["", "   "] {
        let verdict = filter.is_hate_speech(text).await.unwrap();
        assert!(!verdict.is_hate_speech);
        assert!(verdict.classification.is_none());
    }
    assert!(classifier.inputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn classifier_error_is_classification_unavailable() {
    let filter = HateSpeechFilter::new(Arc::new(FailingClassifier), 0.0, TIMEOUT);
    let err = filter.is_hate_speech("title").await.unwrap_err();

    match err {
        ScreenError::ClassificationUnavailable { capability, reason } => {
            assert_eq!(capability, Capability::TextClassifier);
            assert!(reason.contains("connection refused"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn classifier_timeout_is_classification_unavailable() {
    let filter = HateSpeechFilter::new(Arc::new(SlowClassifier), 0.0, Duration::from_millis(50));
    let err = filter.is_hate_speech("title").await.unwrap_err();

    assert!(matches!(
        err,
        ScreenError::ClassificationUnavailable {
            capability: Capability::TextClassifier,
            ..
        }
    ));
    assert!(err.to_string().contains("timed out"));
}

// ============================================================
// Weapon filter
// ============================================================

struct FixedDetector(Vec<(&'static str, f64)>);

#[async_trait]
impl ObjectDetector for FixedDetector {
    async fn infer(&self, _image: &MediaImage) -> Result<Vec<RawDetection>> {
        Ok(self
            .0
            .iter()
            .map(|(label, confidence)| RawDetection {
                label: label.to_string(),
                confidence: *confidence,
                bbox: [10.0, 20.0, 30.0, 40.0],
            })
            .collect())
    }
}

struct BrokenDetector;

#[async_trait]
impl ObjectDetector for BrokenDetector {
    async fn infer(&self, _image: &MediaImage) -> Result<Vec<RawDetection>> {
        anyhow::bail!("model not loaded")
    }
}

fn image() -> MediaImage {
    MediaImage::new(
        "https://i.redd.it/x.png",
        DynamicImage::ImageRgb8(RgbImage::new(8, 8)),
    )
}

#[tokio::test]
async fn weapon_filter_keeps_vocabulary_hits() {
    let detector = FixedDetector(vec![("person", 0.95), ("knife", 0.41), ("car", 0.7)]);
    let filter = WeaponFilter::new(Arc::new(detector), 0.0, TIMEOUT);

    let hits = filter.detect_weapons(&image()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].weapon_type, "knife");
    assert_eq!(hits[0].bounding_box, [10.0, 20.0, 30.0, 40.0]);
}

#[tokio::test]
async fn weapon_filter_no_objects_is_empty_not_error() {
    let filter = WeaponFilter::new(Arc::new(FixedDetector(vec![])), 0.0, TIMEOUT);
    assert!(filter.detect_weapons(&image()).await.unwrap().is_empty());
}

#[tokio::test]
async fn weapon_filter_threshold() {
    let detector = FixedDetector(vec![("gun", 0.2), ("sword", 0.8)]);
    let filter = WeaponFilter::new(Arc::new(detector), 0.5, TIMEOUT);

    let hits = filter.detect_weapons(&image()).await.unwrap();
    let labels: Vec<_> = hits.iter().map(|d| d.weapon_type.as_str()).collect();
    assert_eq!(labels, vec!["sword"]);
}

#[tokio::test]
async fn detector_error_is_classification_unavailable() {
    let filter = WeaponFilter::new(Arc::new(BrokenDetector), 0.0, TIMEOUT);
    let err = filter.detect_weapons(&image()).await.unwrap_err();

    match err {
        ScreenError::ClassificationUnavailable { capability, reason } => {
            assert_eq!(capability, Capability::ObjectDetector);
            assert!(reason.contains("https://i.redd.it/x.png"));
            assert!(reason.contains("model not loaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
