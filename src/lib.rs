//! Skumatch library crate (used by the binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`MatchPipeline`] - exact, hard and soft matching over two catalogs
//! - [`MatchPolicy`], [`PassPolicy`], [`ScoringPolicy`] - typed weights and thresholds
//! - [`MatchOutput`], [`MatchRecord`] - matches plus the unique partitions
//!
//! ## Components
//! - [`ExactMatcher`], [`CategoryScopedFuzzyMatcher`], [`Deduplicator`]
//! - [`CompositeScorer`] - weighted blend of pair signals
//!
//! ## Providers
//! - [`EmbeddingProvider`]: [`HttpEmbedder`], [`HashingEmbedder`]
//! - [`RerankerProvider`]: [`HttpReranker`], [`LexicalReranker`]
//!
//! ## Cache
//! - [`ArtifactCache`] - embeddings, similarity matrices and reranker scores,
//!   keyed by BLAKE3 digests and persisted as `rkyv` snapshots
//!
//! ## Test/Mock Support
//! Counting providers are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod matching;
pub mod scoring;
pub mod similarity;
pub mod storage;

pub use cache::{
    Artifact, ArtifactCache, ArtifactKind, CacheError, CacheResult, CacheStats, PersistOutcome,
    PersistReport,
};
pub use catalog::{CatalogItem, CatalogRecord, ItemId, Side, build_items};
pub use config::{Config, ConfigError};
#[cfg(any(test, feature = "mock"))]
pub use embedding::{MockEmbedder, MockReranker};
pub use embedding::{
    EmbeddingError, EmbeddingProvider, HashingEmbedder, HttpEmbedder, HttpEmbedderConfig,
    HttpReranker, LexicalReranker, RerankerConfig, RerankerError, RerankerProvider,
};
pub use hashing::{CacheKey, embedding_key, matrix_key, reranker_key};
pub use matching::{
    CategoryScopedFuzzyMatcher, Deduplicator, ExactMatcher, MatchError, MatchOutput, MatchPhase,
    MatchPipeline, MatchRecord, MatchResult, TextSignal,
};
pub use scoring::{
    CompositeScorer, MatchCandidatePair, MatchPolicy, PassPolicy, PolicyError, ScoringPolicy,
};
