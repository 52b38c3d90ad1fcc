// System status display: DB stats, last ingest, model presence.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ClassifierBackend, Config, DetectorBackend};
use crate::db::PostStore;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn PostStore>, config: &Config) -> Result<()> {
    let db_path = config.db_path.as_str();

    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let counts = store.count_posts().await?;
    println!(
        "Posts: {} stored, {} with media (screenable)",
        counts.total, counts.with_media
    );

    match store.get_state(crate::ingest::LAST_INGEST_KEY).await? {
        Some(at) => println!("Last ingest: {}", at),
        None => {
            println!("Last ingest: never");
            println!("  Run `flashpoint ingest` to collect posts");
        }
    }

    let detector = match config.detector_backend {
        DetectorBackend::Onnx => model_status(
            "local YOLOv5s",
            crate::download::detector_files_present(&config.model_dir),
        ),
        DetectorBackend::Http => endpoint_status(config.detector_url.as_deref()),
    };
    println!("Detector: {}", detector);

    let classifier = match config.classifier_backend {
        ClassifierBackend::Onnx => model_status(
            "local unbiased-toxic-roberta",
            crate::download::classifier_files_present(&config.model_dir),
        ),
        ClassifierBackend::Http => endpoint_status(config.classifier_url.as_deref()),
    };
    println!("Classifier: {}", classifier);

    if !Path::new(&config.model_dir).exists() {
        println!("  Model directory {} does not exist yet", config.model_dir.display());
    }

    Ok(())
}

fn model_status(name: &str, present: bool) -> String {
    if present {
        format!("{name} (ready)")
    } else {
        format!("{name} (missing, run `flashpoint download-model`)")
    }
}

fn endpoint_status(url: Option<&str>) -> String {
    match url {
        Some(url) => format!("remote endpoint {url}"),
        None => "remote endpoint (URL not set)".to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
