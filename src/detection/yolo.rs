// Local ONNX object detector using YOLOv5s trained on COCO.
//
// Runs entirely on the local CPU. The model takes a 640x640 letterboxed RGB
// image and emits 25200 candidate boxes, each as
// [cx, cy, w, h, objectness, 80 class scores]. We score candidates as
// objectness * class score, drop anything under 0.25, and run per-class
// non-maximum suppression at IoU 0.45 (the YOLOv5 hub defaults).
//
// COCO has no firearm classes. Out of the weapon vocabulary it can only ever
// produce "knife" and "scissors"; use the http backend with a weapon-trained
// model for broader coverage.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

use super::traits::{ObjectDetector, RawDetection};
use crate::media::MediaImage;

/// File name of the detector inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "yolov5s.onnx";

/// Square input edge the model was exported with.
const INPUT_SIZE: u32 = 640;

/// Letterbox padding value (YOLOv5 uses mid-grey).
const PAD_VALUE: u8 = 114;

const CONFIDENCE_THRESHOLD: f32 = 0.25;
const IOU_THRESHOLD: f32 = 0.45;
const MAX_DETECTIONS: usize = 300;

/// COCO class names in model output order.
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Values per candidate row: 4 box coords + objectness + class scores.
const ROW_LEN: usize = 5 + COCO_LABELS.len();

/// How a source image was mapped into the model's square input, so boxes
/// can be mapped back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    pub fn for_size(width: u32, height: u32) -> Self {
        let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, scale);
        Self {
            scale,
            pad_x: ((INPUT_SIZE - new_w) / 2) as f32,
            pad_y: ((INPUT_SIZE - new_h) / 2) as f32,
            source_width: width,
            source_height: height,
        }
    }

    /// Map an (x1, y1, x2, y2) box from model input space back to source
    /// pixels, clamped to the image bounds.
    fn unmap(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> [f64; 4] {
        let w = self.source_width as f32;
        let h = self.source_height as f32;
        let fx = |x: f32| ((x - self.pad_x) / self.scale).clamp(0.0, w) as f64;
        let fy = |y: f32| ((y - self.pad_y) / self.scale).clamp(0.0, h) as f64;
        [fx(x1), fy(y1), fx(x2), fy(y2)]
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
    (new_w, new_h)
}

/// YOLOv5s detector. The session sits behind Arc<Mutex> because
/// Session::run takes &mut self and inference runs on spawn_blocking.
pub struct YoloDetector {
    session: Arc<Mutex<Session>>,
}

impl YoloDetector {
    /// Load `yolov5s.onnx` from the given directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(DETECTOR_MODEL_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Detector model not found: {}\nRun `flashpoint download-model` to download it.",
                model_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        debug!("Loaded YOLO detector from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
        })
    }
}

#[async_trait]
impl ObjectDetector for YoloDetector {
    async fn infer(&self, image: &MediaImage) -> Result<Vec<RawDetection>> {
        let session = Arc::clone(&self.session);
        let img = image.image.clone();
        let url = image.source_url.clone();

        tokio::task::spawn_blocking(move || {
            let (pixels, letterbox) = preprocess(&img);

            let side = INPUT_SIZE as i64;
            let input = Tensor::from_array(([1i64, 3, side, side], pixels))
                .context("Failed to create image tensor")?;

            let predictions = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! { "images" => input })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 25200, 85]
                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            let detections = postprocess(&predictions, &letterbox);
            debug!(url = %url, objects = detections.len(), "YOLO inference complete");
            Ok(detections)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Letterbox the image into INPUT_SIZE x INPUT_SIZE and flatten it to a
/// normalized CHW float buffer.
pub fn preprocess(img: &DynamicImage) -> (Vec<f32>, Letterbox) {
    let letterbox = Letterbox::for_size(img.width().max(1), img.height().max(1));
    let (new_w, new_h) = scaled_dims(letterbox.source_width, letterbox.source_height, letterbox.scale);

    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();
    let mut canvas = RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgb([PAD_VALUE; 3]));
    image::imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut pixels = vec![0f32; 3 * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let idx = (y * INPUT_SIZE + x) as usize;
        pixels[idx] = pixel[0] as f32 / 255.0;
        pixels[plane + idx] = pixel[1] as f32 / 255.0;
        pixels[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }

    (pixels, letterbox)
}

/// A candidate box in model input coordinates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    class: usize,
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// Turn raw model rows into thresholded, de-duplicated detections.
pub fn postprocess(predictions: &[f32], letterbox: &Letterbox) -> Vec<RawDetection> {
    let mut candidates: Vec<Candidate> = predictions
        .chunks_exact(ROW_LEN)
        .filter_map(|row| {
            let objectness = row[4];
            if objectness < CONFIDENCE_THRESHOLD {
                return None;
            }
            let (class, class_score) = row[5..]
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            let score = objectness * class_score;
            if score < CONFIDENCE_THRESHOLD {
                return None;
            }
            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            Some(Candidate {
                class,
                score,
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() == MAX_DETECTIONS {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class == candidate.class && iou(k, &candidate) > IOU_THRESHOLD);
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept.into_iter()
        .map(|c| RawDetection {
            label: COCO_LABELS[c.class].to_string(),
            confidence: c.score as f64,
            bbox: letterbox.unmap(c.x1, c.y1, c.x2, c.y2),
        })
        .collect()
}

/// Intersection over union of two boxes.
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build one model output row with a single hot class.
    fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class: usize, score: f32) -> Vec<f32> {
        let mut r = vec![0.0; ROW_LEN];
        r[0] = cx;
        r[1] = cy;
        r[2] = w;
        r[3] = h;
        r[4] = obj;
        r[5 + class] = score;
        r
    }

    fn knife() -> usize {
        COCO_LABELS.iter().position(|l| *l == "knife").unwrap()
    }

    fn identity_letterbox() -> Letterbox {
        Letterbox::for_size(INPUT_SIZE, INPUT_SIZE)
    }

    #[test]
    fn test_label_count() {
        assert_eq!(COCO_LABELS.len(), 80);
        assert_eq!(ROW_LEN, 85);
    }

    #[test]
    fn test_letterbox_square_image_has_no_padding() {
        let lb = Letterbox::for_size(1280, 1280);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 0.0);
    }

    #[test]
    fn test_letterbox_wide_image_pads_vertically() {
        let lb = Letterbox::for_size(1280, 640);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 160.0);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = Letterbox::for_size(1280, 640);
        // A box covering the whole scaled image content
        let b = lb.unmap(0.0, 160.0, 640.0, 480.0);
        assert_eq!(b, [0.0, 0.0, 1280.0, 640.0]);
    }

    #[test]
    fn test_preprocess_output_shape() {
        let img = DynamicImage::new_rgb8(100, 50);
        let (pixels, lb) = preprocess(&img);
        assert_eq!(pixels.len(), 3 * 640 * 640);
        assert_eq!(lb.source_width, 100);
        // Padding rows are grey
        assert!((pixels[0] - 114.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_postprocess_scores_objectness_times_class() {
        let preds = row(100.0, 100.0, 20.0, 40.0, 0.9, knife(), 0.8);
        let dets = postprocess(&preds, &identity_letterbox());
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "knife");
        assert!((dets[0].confidence - 0.72).abs() < 1e-5);
        assert_eq!(dets[0].bbox, [90.0, 80.0, 110.0, 120.0]);
    }

    #[test]
    fn test_postprocess_drops_low_confidence() {
        // 0.4 * 0.5 = 0.2, under the 0.25 threshold
        let preds = row(100.0, 100.0, 20.0, 20.0, 0.4, knife(), 0.5);
        assert!(postprocess(&preds, &identity_letterbox()).is_empty());
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let mut preds = row(100.0, 100.0, 40.0, 40.0, 0.9, knife(), 0.9);
        preds.extend(row(102.0, 101.0, 40.0, 40.0, 0.8, knife(), 0.9));
        let dets = postprocess(&preds, &identity_letterbox());
        assert_eq!(dets.len(), 1);
        assert!((dets[0].confidence - 0.81).abs() < 1e-5);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let person = 0;
        let mut preds = row(100.0, 100.0, 40.0, 40.0, 0.9, knife(), 0.9);
        preds.extend(row(100.0, 100.0, 40.0, 40.0, 0.9, person, 0.9));
        assert_eq!(postprocess(&preds, &identity_letterbox()).len(), 2);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = Candidate { class: 0, score: 1.0, x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0 };
        let b = Candidate { class: 0, score: 1.0, x1: 2.0, y1: 2.0, x2: 3.0, y2: 3.0 };
        assert_eq!(iou(&a, &b), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }
}
