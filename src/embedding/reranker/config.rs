use std::time::Duration;

use crate::constants::{DEFAULT_RERANKER_BATCH_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::embedding::http::DEFAULT_MAX_RETRIES;

/// Settings for [`HttpReranker`](super::HttpReranker).
#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Base URL of a text-embeddings-inference style server.
    pub base_url: String,
    /// Model identifier used in cache keys. Sent to the server when it serves several.
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub batch_size: usize,
    pub max_retries: usize,
}

impl RerankerConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            batch_size: DEFAULT_RERANKER_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
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

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url cannot be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model cannot be empty".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        Ok(())
    }
}
