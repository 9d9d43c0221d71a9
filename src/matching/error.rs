use thiserror::Error;

use crate::cache::CacheError;
use crate::catalog::Side;
use crate::embedding::{EmbeddingError, RerankerError};
use crate::scoring::PolicyError;

#[derive(Debug, Error)]
/// Errors that abort a pipeline run.
pub enum MatchError {
    /// The match policy failed validation.
    #[error("invalid match policy: {0}")]
    Policy(#[from] PolicyError),

    /// Cache integrity failure (key collision or kind mismatch).
    #[error("artifact cache error: {0}")]
    Cache(#[from] CacheError),

    /// The embedding provider failed.
    #[error("embedding provider error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The reranker provider failed.
    #[error("reranker provider error: {0}")]
    Reranker(#[from] RerankerError),

    /// An item's id does not equal its position in the catalog.
    #[error("{side} item at position {position} has id {id}")]
    ItemIdMismatch {
        side: Side,
        position: usize,
        id: usize,
    },

    /// The embedding provider returned a different number of vectors than requested.
    #[error("embedding provider returned {actual} vectors for {expected} texts")]
    EmbeddingCountMismatch { expected: usize, actual: usize },
}

pub type MatchResult<T> = Result<T, MatchError>;
