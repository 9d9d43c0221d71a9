use async_trait::async_trait;

use super::error::EmbeddingError;
use crate::constants::DEFAULT_EMBED_BATCH_SIZE;

/// Maps normalized text to a fixed-length vector.
///
/// The model identifier is part of every cache key derived from this provider's
/// output, so it must change whenever the vectors would.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier of the model behind this provider.
    fn model_identifier(&self) -> &str;

    /// Output dimension, when known ahead of the first call.
    fn dimension(&self) -> Option<usize>;

    /// Largest number of texts [`embed_batch`](Self::embed_batch) accepts at once.
    fn max_batch_size(&self) -> usize {
        DEFAULT_EMBED_BATCH_SIZE
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds `texts` in order. The default issues one [`embed`](Self::embed) per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// L2-normalises `v` in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
