//! HTTP providers for OpenAI-compatible embedding servers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;
use crate::constants::{DEFAULT_EMBED_BATCH_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Retries after the first attempt for 429 and 5xx responses.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// JSON-over-HTTP endpoint with bearer auth and bounded retries.
#[derive(Debug, Clone)]
pub(crate) struct JsonEndpoint {
    client: reqwest::Client,
    url: String,
    max_retries: usize,
}

impl JsonEndpoint {
    pub(crate) fn new(
        base_url: &str,
        path: &str,
        api_key: Option<&str>,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, EmbeddingError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                EmbeddingError::InvalidConfig {
                    reason: "API key is not a valid header value".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: format!("{}/{}", base_url.trim_end_matches('/'), path),
            max_retries,
        })
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn post<Req, Resp>(&self, body: &Req) -> Result<Resp, EmbeddingError>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let mut attempt = 0usize;
        loop {
            let result = self.client.post(&self.url).json(body).send().await;
            match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp.json().await?),
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(url = %self.url, %status, attempt, "Retrying provider request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbeddingError::BadStatus {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) if (err.is_timeout() || err.is_connect()) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(url = %self.url, error = %err, attempt, "Retrying provider request");
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    Duration::from_millis(250 * (1 << attempt.min(5)))
}

/// Settings for [`HttpEmbedder`].
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    /// Base URL including any version prefix, e.g. `http://localhost:8080/v1`.
    pub base_url: String,
    /// Model name sent with each request. Also the cache model identifier.
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub batch_size: usize,
    pub max_retries: usize,
    /// Expected output dimension; responses of another size are rejected.
    pub dimension: Option<usize>,
}

impl HttpEmbedderConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            dimension: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.base_url.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "base_url cannot be empty".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "model cannot be empty".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "batch_size must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    endpoint: JsonEndpoint,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, EmbeddingError> {
        config.validate()?;
        let endpoint = JsonEndpoint::new(
            &config.base_url,
            "embeddings",
            config.api_key.as_deref(),
            config.timeout,
            config.max_retries,
        )?;
        debug!(url = endpoint.url(), model = %config.model, "HTTP embedder configured");
        Ok(Self { endpoint, config })
    }

    pub fn config(&self) -> &HttpEmbedderConfig {
        &self.config
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: inputs,
        };
        let mut parsed: EmbeddingResponse = self.endpoint.post(&request).await?;
        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::InvalidResponse {
                reason: format!(
                    "{} embeddings returned for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                ),
            });
        }
        parsed.data.sort_by_key(|d| d.index);

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        if let Some(expected) = self.config.dimension
            && let Some(bad) = vectors.iter().find(|v| v.len() != expected)
        {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    fn model_identifier(&self) -> &str {
        &self.config.model
    }

    fn dimension(&self) -> Option<usize> {
        self.config.dimension
    }

    fn max_batch_size(&self) -> usize {
        self.config.batch_size
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.request(&[text]).await?;
        vectors.pop().ok_or_else(|| EmbeddingError::InvalidResponse {
            reason: "empty embedding response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            debug!(batch = chunk.len(), model = %self.config.model, "Requesting embeddings");
            out.extend(self.request(chunk).await?);
        }
        Ok(out)
    }
}
