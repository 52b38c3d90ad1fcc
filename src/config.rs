use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Which object detection backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorBackend {
    /// Local YOLOv5s ONNX model (default)
    Onnx,
    /// Remote detection endpoint at FLASHPOINT_DETECTOR_URL
    Http,
}

/// Which text classification backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierBackend {
    /// Local unbiased-toxic-roberta ONNX model (default)
    Onnx,
    /// Remote inference endpoint at FLASHPOINT_CLASSIFIER_URL
    Http,
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    pub detector_backend: DetectorBackend,
    pub detector_url: Option<String>,
    pub classifier_backend: ClassifierBackend,
    pub classifier_url: Option<String>,
    /// Bearer token sent to the remote classifier, if it needs one
    pub classifier_token: Option<String>,
    /// Minimum confidence for a weapon detection to count. 0.0 keeps every hit.
    pub weapon_min_confidence: f64,
    /// Minimum confidence for a toxic label to count. 0.0 keeps every hit.
    pub hate_min_confidence: f64,
    pub fetch_timeout: Duration,
    pub inference_timeout: Duration,
    pub reddit_api_url: String,
    pub reddit_user_agent: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the remote endpoint URLs, which are
    /// only checked when the http backends are selected.
    pub fn load() -> Result<Self> {
        let detector_backend = match backend_var("FLASHPOINT_DETECTOR").as_deref() {
            None | Some("onnx") => DetectorBackend::Onnx,
            Some("http") => DetectorBackend::Http,
            Some(other) => {
                anyhow::bail!("Unknown FLASHPOINT_DETECTOR {other:?} (expected onnx or http)")
            }
        };

        let classifier_backend = match backend_var("FLASHPOINT_CLASSIFIER").as_deref() {
            None | Some("onnx") => ClassifierBackend::Onnx,
            Some("http") => ClassifierBackend::Http,
            Some(other) => {
                anyhow::bail!("Unknown FLASHPOINT_CLASSIFIER {other:?} (expected onnx or http)")
            }
        };

        let model_dir = env::var("FLASHPOINT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::download::default_model_dir());

        Ok(Self {
            db_path: env::var("FLASHPOINT_DB_PATH")
                .unwrap_or_else(|_| "./flashpoint.db".to_string()),
            model_dir,
            detector_backend,
            detector_url: non_empty_var("FLASHPOINT_DETECTOR_URL"),
            classifier_backend,
            classifier_url: non_empty_var("FLASHPOINT_CLASSIFIER_URL"),
            classifier_token: non_empty_var("FLASHPOINT_CLASSIFIER_TOKEN"),
            weapon_min_confidence: confidence_var("FLASHPOINT_WEAPON_MIN_CONFIDENCE")?,
            hate_min_confidence: confidence_var("FLASHPOINT_HATE_MIN_CONFIDENCE")?,
            fetch_timeout: timeout_var("FLASHPOINT_FETCH_TIMEOUT_SECS", 30)?,
            inference_timeout: timeout_var("FLASHPOINT_INFERENCE_TIMEOUT_SECS", 60)?,
            reddit_api_url: env::var("REDDIT_API_URL")
                .unwrap_or_else(|_| crate::ingest::reddit::DEFAULT_REDDIT_API_URL.to_string()),
            reddit_user_agent: env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| "flashpoint/0.1 (weapon-hate screening)".to_string()),
        })
    }

    /// Validate that the chosen detector backend has what it needs.
    pub fn require_detector(&self) -> Result<()> {
        match self.detector_backend {
            DetectorBackend::Onnx => {
                if !crate::download::detector_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "YOLO detector model not found in {}\n\
                         Run `flashpoint download-model` to download it.\n\
                         Or set FLASHPOINT_DETECTOR=http and FLASHPOINT_DETECTOR_URL.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
            DetectorBackend::Http => {
                if self.detector_url.is_none() {
                    anyhow::bail!(
                        "FLASHPOINT_DETECTOR=http but FLASHPOINT_DETECTOR_URL is not set.\n\
                         See .env.example for the required variables."
                    );
                }
                Ok(())
            }
        }
    }

    /// Validate that the chosen classifier backend has what it needs.
    pub fn require_classifier(&self) -> Result<()> {
        match self.classifier_backend {
            ClassifierBackend::Onnx => {
                if !crate::download::classifier_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "Toxicity model files not found in {}\n\
                         Run `flashpoint download-model` to download them.\n\
                         Or set FLASHPOINT_CLASSIFIER=http and FLASHPOINT_CLASSIFIER_URL.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
            ClassifierBackend::Http => {
                if self.classifier_url.is_none() {
                    anyhow::bail!(
                        "FLASHPOINT_CLASSIFIER=http but FLASHPOINT_CLASSIFIER_URL is not set.\n\
                         See .env.example for the required variables."
                    );
                }
                Ok(())
            }
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Backend name, lower-cased. None when unset or blank.
fn backend_var(key: &str) -> Option<String> {
    non_empty_var(key).map(|v| v.trim().to_lowercase())
}

fn confidence_var(key: &str) -> Result<f64> {
    parse_confidence(key, non_empty_var(key).as_deref())
}

fn timeout_var(key: &str, default_secs: u64) -> Result<Duration> {
    parse_timeout(key, non_empty_var(key).as_deref(), default_secs)
}

/// A threshold in [0, 1]. Unset means 0.0 (every hit counts).
fn parse_confidence(key: &str, raw: Option<&str>) -> Result<f64> {
    let value: f64 = parse_var(key, raw, 0.0)?;
    if !(0.0..=1.0).contains(&value) {
        anyhow::bail!("{key} must be between 0.0 and 1.0, got {value}");
    }
    Ok(value)
}

fn parse_timeout(key: &str, raw: Option<&str>, default_secs: u64) -> Result<Duration> {
    let secs: u64 = parse_var(key, raw, default_secs)?;
    if secs == 0 {
        anyhow::bail!("{key} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_var<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_defaults_to_zero() {
        assert_eq!(parse_confidence("X", None).unwrap(), 0.0);
        assert_eq!(parse_confidence("X", Some(" 0.35 ")).unwrap(), 0.35);
    }

    #[test]
    fn test_confidence_rejects_nan_and_out_of_range() {
        assert!(parse_confidence("X", Some("NaN")).is_err());
        assert!(parse_confidence("X", Some("1.5")).is_err());
        assert!(parse_confidence("X", Some("-0.1")).is_err());
        assert!(parse_confidence("X", Some("high")).is_err());
    }

    #[test]
    fn test_timeout_rejects_zero() {
        assert!(parse_timeout("X", Some("0"), 30).is_err());
        assert_eq!(parse_timeout("X", None, 30).unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("X", Some("5"), 30).unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_backend_names_are_case_insensitive_and_checked() {
        // Unique variable names so parallel tests don't race on the env
        env::set_var("FLASHPOINT_TEST_BACKEND_UPPER", "HTTP");
        assert_eq!(
            backend_var("FLASHPOINT_TEST_BACKEND_UPPER").as_deref(),
            Some("http")
        );
        assert_eq!(backend_var("FLASHPOINT_TEST_BACKEND_UNSET"), None);
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        env::set_var("FLASHPOINT_DETECTOR", "htpp");
        let err = Config::load().err().expect("typo should be rejected");
        env::remove_var("FLASHPOINT_DETECTOR");
        assert!(err.to_string().contains("htpp"));
    }
}
