//! Embedding and reranking providers.
//!
//! - [`EmbeddingProvider`] maps text to vectors ([`HttpEmbedder`], [`HashingEmbedder`]).
//! - [`reranker`] scores text pairs for the top candidates of a phase.

mod error;
mod hashed;
pub(crate) mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod provider;
/// Pairwise reranking.
pub mod reranker;

#[cfg(test)]
mod tests;

pub use error::EmbeddingError;
pub use hashed::HashingEmbedder;
pub use http::{DEFAULT_MAX_RETRIES, HttpEmbedder, HttpEmbedderConfig};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbedder, MockReranker};
pub use provider::{EmbeddingProvider, normalize};
pub use reranker::{
    HttpReranker, LexicalReranker, RerankerConfig, RerankerError, RerankerProvider, sigmoid,
};
