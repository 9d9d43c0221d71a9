//! Content-addressed artifact cache.
//!
//! Three independent stores, one per [`ArtifactKind`], each keyed by a
//! [`CacheKey`](crate::hashing::CacheKey) derived from `(model identifier, content)`:
//!
//! - embeddings of normalized item text
//! - cosine similarity matrices between two canonical key axes
//! - raw reranker scores for a canonical text pair
//!
//! The cache is opened once per run, shared by every phase, and persisted once at
//! the end with merge-on-save semantics so that runs against the same directory
//! accumulate artifacts.

mod error;
mod store;
mod types;


pub use error::{CacheError, CacheResult};
pub use store::ArtifactCache;
pub use types::{
    Artifact, ArtifactKind, CacheStats, EmbeddingArtifact, KindStats, PersistOutcome,
    PersistReport, RerankerScore, SimilarityMatrix,
};
