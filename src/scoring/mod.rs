//! Composite scoring of candidate pairs.
//!
//! A [`MatchCandidatePair`] carries the text, brand, category and spec signals of
//! one left/right pair. [`CompositeScorer`] blends them under a [`ScoringPolicy`]
//! and decides acceptance; [`MatchPolicy`] groups the per-pass policies and is
//! validated once before a run starts.

pub mod error;
pub mod policy;
pub mod scorer;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::PolicyError;
pub use policy::{MatchPolicy, PassPolicy, ScoringPolicy};
pub use scorer::CompositeScorer;
pub use types::{MatchCandidatePair, ScoredCandidate};
