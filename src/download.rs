// Model download helper for the local ONNX backends.
//
// Downloads two models:
// 1. unbiased-toxic-roberta (HuggingFace): title toxicity (~126MB)
// 2. YOLOv5s (Ultralytics release asset): object detection (~28MB)
//
// Files are stored in a platform-appropriate directory
// (~/.local/share/flashpoint/models/ on Linux) so they persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::detection::yolo::DETECTOR_MODEL_FILE;
use crate::toxicity::onnx::{CLASSIFIER_MODEL_FILE, CLASSIFIER_TOKENIZER_FILE};

const TOXICITY_HF_URL: &str =
    "https://huggingface.co/protectai/unbiased-toxic-roberta-onnx/resolve/main";

const DETECTOR_URL: &str =
    "https://github.com/ultralytics/yolov5/releases/download/v7.0/yolov5s.onnx";

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flashpoint")
        .join("models")
}

/// Check whether the toxicity model and its tokenizer exist.
pub fn classifier_files_present(dir: &Path) -> bool {
    dir.join(CLASSIFIER_MODEL_FILE).exists() && dir.join(CLASSIFIER_TOKENIZER_FILE).exists()
}

/// Check whether the YOLO detector exists.
pub fn detector_files_present(dir: &Path) -> bool {
    dir.join(DETECTOR_MODEL_FILE).exists()
}

/// Download both models, skipping files that already exist.
pub async fn download_models(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nToxicity model (unbiased-toxic-roberta):");
    fetch_if_missing(
        &format!("{}/{}", TOXICITY_HF_URL, CLASSIFIER_TOKENIZER_FILE),
        &dir.join(CLASSIFIER_TOKENIZER_FILE),
        None,
    )
    .await?;
    fetch_if_missing(
        &format!("{}/{}", TOXICITY_HF_URL, CLASSIFIER_MODEL_FILE),
        &dir.join(CLASSIFIER_MODEL_FILE),
        Some("~126 MB"),
    )
    .await?;

    println!("\nObject detector (YOLOv5s, COCO):");
    fetch_if_missing(DETECTOR_URL, &dir.join(DETECTOR_MODEL_FILE), Some("~28 MB")).await?;

    Ok(())
}

/// `size_hint` doubles as "show a progress bar" for the large files.
async fn fetch_if_missing(url: &str, dest: &Path, size_hint: Option<&str>) -> Result<()> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if dest.exists() {
        info!(file = %name, "Model file already exists, skipping");
        println!("  {} (already exists)", name);
        return Ok(());
    }

    match size_hint {
        Some(size) => println!("  Downloading {} ({})...", name, size),
        None => println!("  Downloading {}...", name),
    }
    download_file(url, dest, size_hint.is_some()).await
}

/// Download a single file from a URL to a local path.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let total_size = response.content_length();

    let pb = if show_progress {
        let pb = match total_size {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .expect("valid template")
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("    {spinner} {bytes}")
                        .expect("valid template"),
                );
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;

    if let Some(ref pb) = pb {
        pb.set_position(bytes.len() as u64);
    }

    // Write to a sibling temp file first so an interrupted download never
    // leaves a truncated model that *_files_present would accept.
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_flashpoint() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("flashpoint") && path_str.contains("models"),
            "Expected path containing flashpoint/models, got: {path_str}"
        );
    }

    #[test]
    fn test_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("flashpoint-test-nonexistent");
        assert!(!classifier_files_present(&dir));
        assert!(!detector_files_present(&dir));
    }

    #[test]
    fn test_files_present_true_when_files_exist() {
        let dir = std::env::temp_dir().join("flashpoint-download-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CLASSIFIER_MODEL_FILE), b"fake").unwrap();
        std::fs::write(dir.join(CLASSIFIER_TOKENIZER_FILE), b"fake").unwrap();
        std::fs::write(dir.join(DETECTOR_MODEL_FILE), b"fake").unwrap();

        assert!(classifier_files_present(&dir));
        assert!(detector_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
