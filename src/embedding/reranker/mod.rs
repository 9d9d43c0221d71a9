//! Pairwise relevance scoring.
//!
//! Providers return raw logits; [`sigmoid`] maps them to `[0, 1]` before they
//! replace the text-similarity term of the composite score.

pub mod config;
pub mod error;
mod http;


pub use config::RerankerConfig;
pub use error::RerankerError;
pub use http::HttpReranker;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::catalog::bigram_similarity;
use crate::constants::DEFAULT_RERANKER_BATCH_SIZE;

/// Scores a text pair. Callers pass pairs in canonical order so the result does
/// not depend on which side a text came from.
#[async_trait]
pub trait RerankerProvider: Send + Sync {
    /// Stable identifier of the model behind this provider.
    fn model_identifier(&self) -> &str;

    fn max_batch_size(&self) -> usize {
        DEFAULT_RERANKER_BATCH_SIZE
    }

    /// Raw (pre-sigmoid) score of `(text_a, text_b)`.
    async fn score(&self, text_a: &str, text_b: &str) -> Result<f32, RerankerError>;

    /// Raw scores of `query` against each candidate, in candidate order.
    async fn score_batch(
        &self,
        query: &str,
        candidates: &[&str],
    ) -> Result<Vec<f32>, RerankerError> {
        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            out.push(self.score(query, candidate).await?);
        }
        Ok(out)
    }
}

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

const STOP_WORDS: &[&str] = &["a", "an", "the", "of", "and", "with", "for", "in", "to", "by"];

/// Offline reranker over token overlap.
///
/// Symmetric: recall is averaged over both directions. Falls back to character
/// bigram overlap when either side has no tokens left after stop-word removal.
#[derive(Debug, Clone)]
pub struct LexicalReranker {
    model_identifier: String,
}

impl Default for LexicalReranker {
    fn default() -> Self {
        Self {
            model_identifier: "lexical-overlap-v1".to_string(),
        }
    }
}

impl LexicalReranker {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '.')
            .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
            .map(str::to_string)
            .collect()
    }

    /// Overlap in `[0, 1]` before conversion to a logit.
    pub fn overlap(text_a: &str, text_b: &str) -> f32 {
        let a = Self::tokens(text_a);
        let b = Self::tokens(text_b);
        if a.is_empty() || b.is_empty() {
            return bigram_similarity(text_a, text_b) * 0.5;
        }

        let shared = a.intersection(&b).count() as f32;
        let recall = 0.5 * (shared / a.len() as f32 + shared / b.len() as f32);
        let jaccard = shared / a.union(&b).count() as f32;
        let lexical = 0.6 * recall + 0.4 * jaccard;

        0.5 * lexical + 0.5 * bigram_similarity(text_a, text_b)
    }

    /// Logit whose sigmoid is the overlap stretched around 0.5.
    pub fn logit(text_a: &str, text_b: &str) -> f32 {
        8.0 * (Self::overlap(text_a, text_b) - 0.5)
    }
}

#[async_trait]
impl RerankerProvider for LexicalReranker {
    fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    async fn score(&self, text_a: &str, text_b: &str) -> Result<f32, RerankerError> {
        let score = Self::logit(text_a, text_b);
        debug!(score, "Computed lexical rerank score");
        Ok(score)
    }

    async fn score_batch(
        &self,
        query: &str,
        candidates: &[&str],
    ) -> Result<Vec<f32>, RerankerError> {
        Ok(candidates.iter().map(|c| Self::logit(query, c)).collect())
    }
}
