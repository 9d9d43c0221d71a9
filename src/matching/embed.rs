use std::collections::{BTreeSet, HashMap};

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::error::{MatchError, MatchResult};
use crate::cache::{ArtifactCache, ArtifactKind, CacheError, EmbeddingArtifact};
use crate::embedding::EmbeddingProvider;
use crate::hashing::embedding_key;

/// Returns a vector for every distinct text, embedding only cache misses.
///
/// Misses are sent in batches of the provider's `max_batch_size`, with up to
/// `concurrency` batches in flight; results are stored in the cache before this
/// returns, so a text is embedded at most once per model across runs.
pub(crate) async fn resolve_embeddings<'t>(
    embedder: &dyn EmbeddingProvider,
    cache: &ArtifactCache,
    texts: BTreeSet<&'t str>,
    concurrency: usize,
) -> MatchResult<HashMap<&'t str, Vec<f32>>> {
    let model = embedder.model_identifier();
    let mut vectors = HashMap::with_capacity(texts.len());
    let mut misses: Vec<&'t str> = Vec::new();

    for text in texts {
        let key = embedding_key(model, text);
        match cache.lookup_embedding(&key) {
            Some(hit) if hit.text != text => {
                return Err(CacheError::KeyCollision {
                    kind: ArtifactKind::Embedding,
                    key,
                }
                .into());
            }
            Some(hit) => {
                vectors.insert(text, hit.vector.clone());
            }
            None => misses.push(text),
        }
    }

    if misses.is_empty() {
        debug!(cached = vectors.len(), "All embeddings served from cache");
        return Ok(vectors);
    }

    let batch_size = embedder.max_batch_size().max(1);
    let batches: Vec<Vec<Vec<f32>>> = stream::iter(misses.chunks(batch_size))
        .map(|chunk| embedder.embed_batch(chunk))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let embedded: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
    if embedded.len() != misses.len() {
        return Err(MatchError::EmbeddingCountMismatch {
            expected: misses.len(),
            actual: embedded.len(),
        });
    }

    for (text, vector) in misses.iter().zip(embedded) {
        let key = embedding_key(model, text);
        cache.store_embedding(
            key,
            EmbeddingArtifact {
                text: (*text).to_string(),
                vector: vector.clone(),
            },
        )?;
        vectors.insert(*text, vector);
    }

    info!(
        model,
        cached = vectors.len() - misses.len(),
        embedded = misses.len(),
        "Embeddings resolved"
    );
    Ok(vectors)
}
