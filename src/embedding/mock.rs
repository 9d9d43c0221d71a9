//! Counting providers for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::EmbeddingError;
use super::hashed::HashingEmbedder;
use super::provider::EmbeddingProvider;
use super::reranker::{LexicalReranker, RerankerError, RerankerProvider};

/// Embedder that records how many texts it was asked to embed.
///
/// Vectors come from a fixed table when the text is present there, otherwise
/// from a [`HashingEmbedder`].
#[derive(Debug, Default)]
pub struct MockEmbedder {
    inner: HashingEmbedder,
    fixed: HashMap<String, Vec<f32>>,
    texts_embedded: AtomicUsize,
    batches: AtomicUsize,
    fail: AtomicBool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        self.fixed
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.inner.embed_sync(text))
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn model_identifier(&self) -> &str {
        "mock-embedder"
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text]).await.map(|mut v| v.remove(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::RequestFailed {
                reason: "mock failure".to_string(),
            });
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Reranker with fixed per-pair logits and a call counter.
///
/// Pairs not in the table are scored by [`LexicalReranker`].
#[derive(Debug, Default)]
pub struct MockReranker {
    fixed: HashMap<(String, String), f32>,
    pairs_scored: AtomicUsize,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a logit for the pair in either order.
    pub fn with_score(mut self, a: impl Into<String>, b: impl Into<String>, logit: f32) -> Self {
        let (a, b) = (a.into(), b.into());
        self.fixed.insert((b.clone(), a.clone()), logit);
        self.fixed.insert((a, b), logit);
        self
    }

    pub fn pairs_scored(&self) -> usize {
        self.pairs_scored.load(Ordering::SeqCst)
    }

    fn logit(&self, a: &str, b: &str) -> f32 {
        self.fixed
            .get(&(a.to_string(), b.to_string()))
            .copied()
            .unwrap_or_else(|| LexicalReranker::logit(a, b))
    }
}

#[async_trait]
impl RerankerProvider for MockReranker {
    fn model_identifier(&self) -> &str {
        "mock-reranker"
    }

    async fn score(&self, text_a: &str, text_b: &str) -> Result<f32, RerankerError> {
        self.pairs_scored.fetch_add(1, Ordering::SeqCst);
        Ok(self.logit(text_a, text_b))
    }

    async fn score_batch(
        &self,
        query: &str,
        candidates: &[&str],
    ) -> Result<Vec<f32>, RerankerError> {
        self.pairs_scored
            .fetch_add(candidates.len(), Ordering::SeqCst);
        Ok(candidates.iter().map(|c| self.logit(query, c)).collect())
    }
}
