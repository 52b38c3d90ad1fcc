// Weapon filter: raw detector output to weapon evidence.
//
// Membership in WEAPON_LABELS is exact and case-sensitive. The vocabulary is
// wider than COCO on purpose: it covers labels produced by weapon-specific
// detectors served behind the http backend.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{ObjectDetector, RawDetection};
use crate::error::{Capability, ScreenError};
use crate::media::MediaImage;

/// Detector labels treated as weapon evidence.
pub const WEAPON_LABELS: [&str; 16] = [
    "knife", "scissors", "gun", "pistol", "rifle", "revolver", "firearm", "sword", "dagger",
    "bat", "axe", "machete", "blade", "crowbar", "bow", "crossbow",
];

/// A detection that passed the weapon vocabulary filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub weapon_type: String,
    pub confidence_score: f64,
    pub bounding_box: [f64; 4],
}

pub fn is_weapon_label(label: &str) -> bool {
    WEAPON_LABELS.contains(&label)
}

/// Keep detections whose label is in the weapon vocabulary and whose
/// confidence is at least `min_confidence`.
pub fn filter_weapons(raw: Vec<RawDetection>, min_confidence: f64) -> Vec<Detection> {
    raw.into_iter()
        .filter(|d| is_weapon_label(&d.label) && d.confidence >= min_confidence)
        .map(|d| Detection {
            weapon_type: d.label,
            confidence_score: d.confidence,
            bounding_box: d.bbox,
        })
        .collect()
}

pub struct WeaponFilter {
    detector: Arc<dyn ObjectDetector>,
    min_confidence: f64,
    timeout: Duration,
}

impl WeaponFilter {
    /// `min_confidence` of 0.0 counts every vocabulary hit regardless of
    /// confidence.
    pub fn new(detector: Arc<dyn ObjectDetector>, min_confidence: f64, timeout: Duration) -> Self {
        Self {
            detector,
            min_confidence,
            timeout,
        }
    }

    /// Run the detector on one image and keep the weapon hits.
    ///
    /// An empty result means "no weapon evidence in this image". Detector
    /// errors and timeouts come back as ClassificationUnavailable, which is
    /// not the same thing.
    pub async fn detect_weapons(&self, image: &MediaImage) -> Result<Vec<Detection>, ScreenError> {
        let raw = match tokio::time::timeout(self.timeout, self.detector.infer(image)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                return Err(ScreenError::classification(
                    Capability::ObjectDetector,
                    format!("{}: {e:#}", image.source_url),
                ))
            }
            Err(_) => {
                return Err(ScreenError::classification(
                    Capability::ObjectDetector,
                    format!("{}: timed out after {:?}", image.source_url, self.timeout),
                ))
            }
        };

        let total = raw.len();
        let weapons = filter_weapons(raw, self.min_confidence);

        debug!(
            url = %image.source_url,
            objects = total,
            weapons = weapons.len(),
            "Detected objects"
        );

        Ok(weapons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, confidence: f64) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence,
            bbox: [0.0, 0.0, 10.0, 10.0],
        }
    }

    #[test]
    fn test_vocabulary_membership_is_case_sensitive() {
        assert!(is_weapon_label("knife"));
        assert!(!is_weapon_label("Knife"));
        assert!(!is_weapon_label("KNIFE"));
    }

    #[test]
    fn test_coco_baseball_bat_is_not_bat() {
        assert!(!is_weapon_label("baseball bat"));
        assert!(is_weapon_label("bat"));
    }

    #[test]
    fn test_filter_keeps_only_weapons() {
        let hits = filter_weapons(
            vec![raw("person", 0.99), raw("knife", 0.4), raw("dog", 0.8), raw("rifle", 0.05)],
            0.0,
        );
        let labels: Vec<_> = hits.iter().map(|d| d.weapon_type.as_str()).collect();
        assert_eq!(labels, vec!["knife", "rifle"]);
    }

    #[test]
    fn test_zero_threshold_keeps_low_confidence_hits() {
        let hits = filter_weapons(vec![raw("gun", 0.001)], 0.0);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_threshold_drops_weak_hits() {
        let hits = filter_weapons(vec![raw("gun", 0.3), raw("sword", 0.7)], 0.5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].weapon_type, "sword");
        assert!((hits[0].confidence_score - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bounding_box_carried_through() {
        let mut r = raw("axe", 0.9);
        r.bbox = [1.0, 2.0, 3.0, 4.0];
        let hits = filter_weapons(vec![r], 0.0);
        assert_eq!(hits[0].bounding_box, [1.0, 2.0, 3.0, 4.0]);
    }
}
