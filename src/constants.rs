//! Cross-cutting, shared constants.
//!
//! Policy defaults live here so `config`, `scoring` and `matching` agree on them.
//! Prefer deriving secondary constants from primary ones to avoid drift.

/// Candidates kept per left item after embedding ranking.
pub const DEFAULT_TOP_K: usize = 30;

/// Rows per chunk when computing a similarity matrix.
pub const DEFAULT_SIMILARITY_CHUNK_SIZE: usize = 500;

/// Texts per embedding request.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Pairs per reranker request.
pub const DEFAULT_RERANKER_BATCH_SIZE: usize = 32;

/// Embedding requests kept in flight at once.
pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

/// Dimension used by the offline [`HashingEmbedder`](crate::embedding::HashingEmbedder).
pub const DEFAULT_HASHING_DIM: usize = 256;

/// HTTP provider request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Relative price window of the hard pass.
pub const HARD_PRICE_TOLERANCE: f64 = 0.15;
/// Relative price window of the soft pass and its fallback.
pub const SOFT_PRICE_TOLERANCE: f64 = 0.20;

/// Minimum embedding similarity for a hard-pass candidate.
pub const HARD_MIN_TEXT_SIMILARITY: f32 = 0.42;
/// Minimum embedding similarity for a soft-pass candidate.
pub const SOFT_MIN_TEXT_SIMILARITY: f32 = 0.38;

pub const HARD_COMPOSITE_THRESHOLD: f32 = 0.50;
pub const SOFT_COMPOSITE_THRESHOLD: f32 = 0.45;
pub const FALLBACK_COMPOSITE_THRESHOLD: f32 = 0.50;

/// Slack allowed when checking that weights sum to at most one.
pub const WEIGHT_SUM_EPSILON: f32 = 1e-4;

/// Separator between model identifier and content in cache keys.
pub const KEY_FIELD_SEPARATOR: &[u8] = b"||";

/// Separator between list elements in cache keys.
pub const KEY_LIST_SEPARATOR: &[u8] = b"\x1f";

pub const EMBEDDING_SNAPSHOT_FILENAME: &str = "embeddings.rkyv";
pub const MATRIX_SNAPSHOT_FILENAME: &str = "similarity_matrices.rkyv";
pub const RERANKER_SNAPSHOT_FILENAME: &str = "reranker_scores.rkyv";
