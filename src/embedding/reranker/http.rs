use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::RerankerConfig;
use super::error::RerankerError;
use super::RerankerProvider;
use crate::embedding::http::JsonEndpoint;

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
    model: &'a str,
}

#[derive(Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

/// Cross-encoder served over HTTP (`POST {base_url}/rerank`).
///
/// Requests raw scores so the caller applies a single sigmoid regardless of the
/// server's own normalisation.
#[derive(Debug, Clone)]
pub struct HttpReranker {
    endpoint: JsonEndpoint,
    config: RerankerConfig,
}

impl HttpReranker {
    pub fn new(config: RerankerConfig) -> Result<Self, RerankerError> {
        if let Err(reason) = config.validate() {
            return Err(RerankerError::InvalidConfig { reason });
        }
        let endpoint = JsonEndpoint::new(
            &config.base_url,
            "rerank",
            config.api_key.as_deref(),
            config.timeout,
            config.max_retries,
        )?;
        debug!(url = endpoint.url(), model = %config.model, "HTTP reranker configured");
        Ok(Self { endpoint, config })
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    async fn request(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, RerankerError> {
        let request = RerankRequest {
            query,
            texts,
            raw_scores: true,
            model: &self.config.model,
        };
        let hits: Vec<RerankHit> = self.endpoint.post(&request).await?;

        let mut scores = vec![None; texts.len()];
        for hit in hits {
            let slot = scores
                .get_mut(hit.index)
                .ok_or_else(|| RerankerError::InvalidResponse {
                    reason: format!("index {} out of range for {} texts", hit.index, texts.len()),
                })?;
            *slot = Some(hit.score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                s.ok_or_else(|| RerankerError::InvalidResponse {
                    reason: format!("no score returned for text {i}"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl RerankerProvider for HttpReranker {
    fn model_identifier(&self) -> &str {
        &self.config.model
    }

    fn max_batch_size(&self) -> usize {
        self.config.batch_size
    }

    async fn score(&self, text_a: &str, text_b: &str) -> Result<f32, RerankerError> {
        let scores = self.request(text_a, &[text_b]).await?;
        scores
            .first()
            .copied()
            .ok_or_else(|| RerankerError::InvalidResponse {
                reason: "empty rerank response".to_string(),
            })
    }

    async fn score_batch(
        &self,
        query: &str,
        candidates: &[&str],
    ) -> Result<Vec<f32>, RerankerError> {
        let mut out = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(self.config.batch_size) {
            debug!(batch = chunk.len(), "Requesting rerank scores");
            out.extend(self.request(query, chunk).await?);
        }
        Ok(out)
    }
}
