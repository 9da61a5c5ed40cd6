//! OpenAI-compatible HTTP embedding client.
//!
//! Calls `POST {url}` with `{"model": ..., "input": [text]}` and reads
//! `data[0].embedding`. Retry strategy:
//! - HTTP 429 or 5xx → retry with exponential backoff
//! - other 4xx → fail immediately
//! - network error → retry

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use stockpulse_ai::{AiError, Embedder};

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dims: usize,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl HttpEmbedderConfig {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            api_key: None,
            dims: 384,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    config: HttpEmbedderConfig,
    client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn request_once(&self, body: &serde_json::Value) -> Result<Vec<f32>, Attempt> {
        let mut request = self.client.post(&self.config.url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Attempt::Retry(format!("request failed: {e}")))?;
        let status = response.status();

        if status.is_success() {
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| Attempt::Fatal(format!("invalid response body: {e}")))?;
            return parse_embedding(&json).map_err(Attempt::Fatal);
        }

        let text = response.text().await.unwrap_or_default();
        let message = format!("embedding endpoint returned {status}: {text}");
        if status.as_u16() == 429 || status.is_server_error() {
            Err(Attempt::Retry(message))
        } else {
            Err(Attempt::Fatal(message))
        }
    }
}

enum Attempt {
    Retry(String),
    Fatal(String),
}

fn parse_embedding(json: &serde_json::Value) -> Result<Vec<f32>, String> {
    let values = json
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| "response is missing data[0].embedding".to_string())?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|x| x as f32)
                .ok_or_else(|| "embedding contains a non-numeric value".to_string())
        })
        .collect()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250u64 << attempt.saturating_sub(1).min(5))
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn dims(&self) -> usize {
        self.config.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": [text],
        });

        let mut last_err = String::from("no attempt made");
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff(attempt)).await;
            }
            match self.request_once(&body).await {
                Ok(vector) => {
                    debug!(model = %self.config.model, dims = vector.len(), "embedding received");
                    return Ok(vector);
                }
                Err(Attempt::Fatal(msg)) => return Err(AiError::EmbeddingFailed(msg)),
                Err(Attempt::Retry(msg)) => {
                    warn!(attempt, error = %msg, "embedding request failed, retrying");
                    last_err = msg;
                }
            }
        }
        Err(AiError::EmbeddingFailed(last_err))
    }
}
