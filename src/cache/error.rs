use thiserror::Error;

use super::types::ArtifactKind;
use crate::hashing::CacheKey;
use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Errors returned by the artifact cache.
pub enum CacheError {
    /// Two different source contents produced the same key.
    ///
    /// Never expected with a 256-bit digest; treated as a data-integrity failure.
    #[error("cache key collision for {kind} artifact {key}")]
    KeyCollision {
        /// Artifact kind.
        kind: ArtifactKind,
        /// Colliding key.
        key: CacheKey,
    },

    /// The artifact variant does not match the requested kind.
    #[error("expected {expected} artifact, got {actual}")]
    KindMismatch {
        /// Kind the caller asked for.
        expected: ArtifactKind,
        /// Kind of the artifact supplied.
        actual: ArtifactKind,
    },

    /// The artifact is internally inconsistent (e.g. matrix values vs. axes).
    #[error("malformed {kind} artifact {key}: {reason}")]
    Malformed {
        /// Artifact kind.
        kind: ArtifactKind,
        /// Key it was stored under.
        key: CacheKey,
        /// What is inconsistent.
        reason: String,
    },

    /// Snapshot storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Convenience result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
