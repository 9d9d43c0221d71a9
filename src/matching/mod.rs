//! Multi-phase entity matching.
//!
//! [`MatchPipeline`] runs the phases in order:
//!
//! 1. [`ExactMatcher`]: join on the normalized unique key.
//! 2. [`CategoryScopedFuzzyMatcher`] hard pass: same `(category_l1, category_l3)`,
//!    narrow price window.
//! 3. Soft pass: same `category_l1`, wider window, plus an optional
//!    `category_l3`-only fallback that rejects equal-brand pairs.
//!
//! Every fuzzy pass is followed by [`Deduplicator`]; a final cross-phase
//! deduplication collapses a right item accepted by both passes. Left items that
//! lose a deduplication are *claimed*: they leave the residual pools but are never
//! reported as unique.

mod candidates;
mod dedup;
mod embed;
mod error;
mod exact;
mod fuzzy;
mod pipeline;
mod types;


pub use candidates::PassKind;
pub use dedup::{DedupOutcome, Deduplicator};
pub use error::{MatchError, MatchResult};
pub use exact::ExactMatcher;
pub use fuzzy::{CategoryScopedFuzzyMatcher, PassOutput};
pub use pipeline::MatchPipeline;
pub use types::{
    ItemState, MatchOutput, MatchPhase, MatchRecord, MatchState, MatchSummary, PhaseSummary,
    TextSignal,
};
