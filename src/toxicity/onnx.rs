// Local ONNX text classifier using Detoxify's unbiased-toxic-roberta model.
//
// Runs on the local CPU with no API calls or rate limits. The model is
// multi-label: 7 independent sigmoid outputs and no "clean" class. A label
// counts once its probability reaches 0.5 (the Detoxify reading); we report
// the highest such label, or NON_TOXIC_LABEL when none reaches it.
//
// Model: protectai/unbiased-toxic-roberta-onnx (quantized, ~126MB)

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::{TextClassification, TextClassifier};

pub const CLASSIFIER_MODEL_FILE: &str = "model_quantized.onnx";
pub const CLASSIFIER_TOKENIZER_FILE: &str = "tokenizer.json";

/// Label reported when no category reaches TOXIC_PROBABILITY.
pub const NON_TOXIC_LABEL: &str = "non-toxic";

/// Probability at which a sigmoid output counts as present.
const TOXIC_PROBABILITY: f64 = 0.5;

/// Longest token sequence RoBERTa accepts.
const MAX_TOKENS: usize = 512;

/// Labels output by unbiased-toxic-roberta, in the order the model returns them.
const LABEL_ORDER: [&str; 7] = [
    "toxicity",
    "severe_toxicity",
    "obscene",
    "identity_attack",
    "insult",
    "threat",
    "sexual_explicit",
];

/// Session and tokenizer sit behind Arc so inference can move to
/// spawn_blocking; the Mutex serializes Session::run, which needs &mut.
pub struct OnnxTextClassifier {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxTextClassifier {
    /// Load the ONNX model and tokenizer from the given directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(CLASSIFIER_MODEL_FILE);
        let tokenizer_path = model_dir.join(CLASSIFIER_TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `flashpoint download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `flashpoint download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        // 512 characters can still exceed 512 tokens for unusual scripts
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        debug!("Loaded ONNX toxicity model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl TextClassifier for OnnxTextClassifier {
    async fn classify(&self, text: &str) -> Result<TextClassification> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();

            let shape = [1i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 7] raw logits
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            if logits.len() < LABEL_ORDER.len() {
                anyhow::bail!(
                    "Expected {} logits from the toxicity model, got {}",
                    LABEL_ORDER.len(),
                    logits.len()
                );
            }

            let scores: Vec<f64> = logits[..LABEL_ORDER.len()]
                .iter()
                .map(|&logit| sigmoid(logit as f64))
                .collect();

            let result = top_label(&scores);

            debug!(
                label = %result.label,
                confidence = result.confidence_score,
                text_preview = %crate::output::truncate_chars(&text, 50),
                "ONNX classified text"
            );

            Ok(result)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Pick the highest-probability label. Ties go to the earlier label.
///
/// If even the highest is under TOXIC_PROBABILITY the text is clean, and
/// the confidence is the complement of that highest score.
fn top_label(scores: &[f64]) -> TextClassification {
    let (idx, score) = scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });
    if score < TOXIC_PROBABILITY {
        return TextClassification::new(NON_TOXIC_LABEL, 1.0 - score);
    }
    TextClassification::new(LABEL_ORDER[idx], score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10, "sigmoid(0) should be 0.5");
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [0.5, 1.0, 2.0, 5.0] {
            let sum = sigmoid(x) + sigmoid(-x);
            assert!(
                (sum - 1.0).abs() < 1e-10,
                "sigmoid({x}) + sigmoid(-{x}) should equal 1.0"
            );
        }
    }

    #[test]
    fn test_top_label_picks_max() {
        // toxicity, severe_toxicity, obscene, identity_attack, insult, threat, sexual_explicit
        let scores = vec![0.6, 0.1, 0.2, 0.3, 0.9, 0.05, 0.4];
        let result = top_label(&scores);
        assert_eq!(result.label, "insult");
        assert!((result.confidence_score - 0.9).abs() < 1e-10);
    }

    #[test]
    fn test_top_label_tie_goes_to_first() {
        let scores = vec![0.5; 7];
        assert_eq!(top_label(&scores).label, "toxicity");
    }

    #[test]
    fn test_low_scores_are_non_toxic() {
        let scores = vec![0.0008, 0.00001, 0.0002, 0.0001, 0.0003, 0.00005, 0.00002];
        let result = top_label(&scores);
        assert_eq!(result.label, NON_TOXIC_LABEL);
        assert!((result.confidence_score - 0.9992).abs() < 1e-10);
        assert!(!crate::toxicity::hate::is_toxic_label(&result.label));
    }

    #[test]
    fn test_score_just_under_threshold_is_non_toxic() {
        let scores = vec![0.49, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1];
        assert_eq!(top_label(&scores).label, NON_TOXIC_LABEL);
    }

    #[test]
    fn test_every_model_label_is_known_to_the_filter() {
        // The labels that should count as hate speech are in the vocabulary;
        // the sexual/obscene ones deliberately are not.
        use crate::toxicity::hate::is_toxic_label;
        assert!(is_toxic_label(LABEL_ORDER[0]));
        assert!(is_toxic_label(LABEL_ORDER[1]));
        assert!(!is_toxic_label(LABEL_ORDER[2]));
        assert!(is_toxic_label(LABEL_ORDER[3]));
        assert!(is_toxic_label(LABEL_ORDER[4]));
        assert!(is_toxic_label(LABEL_ORDER[5]));
        assert!(!is_toxic_label(LABEL_ORDER[6]));
    }
}
