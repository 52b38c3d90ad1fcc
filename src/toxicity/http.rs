// Remote text classification endpoint.
//
// Speaks the Hugging Face inference API shape, so a hosted model such as
// unitary/unbiased-toxic-roberta or a self-hosted text-generation-inference
// deployment works unchanged:
//   POST <url>  {"inputs": "<text>"}
//   200 -> [{"label": "...", "score": 0.0-1.0}, ...]
//       or [[{"label": "...", "score": 0.0-1.0}, ...]]

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{TextClassification, TextClassifier};

/// Hosted inference endpoints throttle aggressively; stay well under.
const DEFAULT_REQUESTS_PER_SECOND: f64 = 5.0;

pub struct HttpClassifier {
    client: Client,
    url: String,
    token: Option<String>,
    rate_limiter: RateLimiter,
}

impl HttpClassifier {
    pub fn new(url: String, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("flashpoint/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            token,
            rate_limiter: RateLimiter::new(DEFAULT_REQUESTS_PER_SECOND),
        })
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<TextClassification> {
        self.rate_limiter.acquire().await;

        let mut request = self.client.post(&self.url).json(&ClassifyRequest { inputs: text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Classifier endpoint request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Classifier endpoint returned {}: {}", status, body);
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .context("Failed to parse classifier response")?;

        let best = body
            .best()
            .ok_or_else(|| anyhow::anyhow!("Classifier returned no labels"))?;

        debug!(
            label = %best.label,
            confidence = best.confidence_score,
            "Remote classification complete"
        );

        Ok(best)
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

impl ClassifyResponse {
    /// Highest-scoring label across whatever shape came back.
    fn best(self) -> Option<TextClassification> {
        let scores = match self {
            ClassifyResponse::Flat(v) => v,
            ClassifyResponse::Nested(v) => v.into_iter().flatten().collect(),
        };
        scores
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|s| TextClassification::new(s.label, s.score))
    }
}
