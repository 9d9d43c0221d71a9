//! Offline embedder built from hashed character n-grams.

use async_trait::async_trait;
use tracing::debug;

use super::error::EmbeddingError;
use super::provider::{EmbeddingProvider, normalize};
use crate::constants::DEFAULT_HASHING_DIM;

/// Deterministic feature-hashing embedder.
///
/// Each character unigram, character bigram and whitespace token of the input
/// is hashed with BLAKE3 into one signed bucket; the result is L2-normalised.
/// Texts that share many n-grams get a high cosine similarity, which is enough
/// to drive candidate ranking without a model server.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    model_identifier: String,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIM)
    }
}

impl HashingEmbedder {
    /// Creates an embedder with `dim` buckets (at least one).
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self {
            dim,
            model_identifier: format!("hashing-ngram-{dim}"),
        }
    }

    fn bucket(&self, tag: u8, feature: &str) -> (usize, f32) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[tag]);
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        let value = u64::from_le_bytes(word);
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        ((value % self.dim as u64) as usize, sign)
    }

    /// Synchronous embedding used by the async trait methods.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();

        let mut buf = [0u8; 4];
        for c in &chars {
            let (i, s) = self.bucket(1, c.encode_utf8(&mut buf));
            v[i] += s;
        }
        for pair in chars.windows(2) {
            let gram: String = pair.iter().collect();
            let (i, s) = self.bucket(2, &gram);
            v[i] += s;
        }
        for token in text.split_whitespace() {
            let (i, s) = self.bucket(3, token);
            v[i] += 2.0 * s;
        }

        normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dim)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(batch = texts.len(), dim = self.dim, "Hashing embeddings");
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}
