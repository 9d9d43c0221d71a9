use std::fmt;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::catalog::{CatalogItem, ItemId};

/// Phase that accepted a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Exact,
    Hard,
    Soft,
}

impl MatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPhase::Exact => "exact",
            MatchPhase::Hard => "hard",
            MatchPhase::Soft => "soft",
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted left/right pairing. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchRecord {
    pub left_id: ItemId,
    pub right_id: ItemId,
    pub composite_score: f32,
    pub phase: MatchPhase,
}

/// Where the text term of the composite score comes from.
///
/// Chosen once when the pipeline is built and never changed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSignal {
    /// Sigmoid of the reranker score for the top-K candidates.
    Reranked,
    /// Cosine similarity of the item embeddings.
    Embedding,
    /// Character bigram overlap of the normalized names.
    Lexical,
}

/// Lifecycle of one catalog item during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Unmatched,
    Matched(MatchPhase),
    /// Left item that lost a deduplication; excluded from later phases and from
    /// the unique partition.
    Claimed,
    Unique,
}

/// Per-item states for both catalogs, indexed by [`ItemId`].
#[derive(Debug, Clone)]
pub struct MatchState {
    left: Vec<ItemState>,
    right: Vec<ItemState>,
}

impl MatchState {
    pub fn new(left_len: usize, right_len: usize) -> Self {
        Self {
            left: vec![ItemState::Unmatched; left_len],
            right: vec![ItemState::Unmatched; right_len],
        }
    }

    pub fn left(&self, id: ItemId) -> ItemState {
        self.left[id.0]
    }

    pub fn right(&self, id: ItemId) -> ItemState {
        self.right[id.0]
    }

    pub fn record_match(&mut self, record: &MatchRecord) {
        self.left[record.left_id.0] = ItemState::Matched(record.phase);
        self.right[record.right_id.0] = ItemState::Matched(record.phase);
    }

    pub fn claim_left(&mut self, id: ItemId) {
        self.left[id.0] = ItemState::Claimed;
    }

    pub fn unmatched_left(&self) -> impl Iterator<Item = ItemId> + '_ {
        Self::with_state(&self.left, |s| s == ItemState::Unmatched)
    }

    pub fn unmatched_right(&self) -> impl Iterator<Item = ItemId> + '_ {
        Self::with_state(&self.right, |s| s == ItemState::Unmatched)
    }

    /// Right items not yet matched, or matched by the hard pass.
    pub fn right_open_to_soft(&self) -> impl Iterator<Item = ItemId> + '_ {
        Self::with_state(&self.right, |s| {
            matches!(s, ItemState::Unmatched | ItemState::Matched(MatchPhase::Hard))
        })
    }

    pub fn claimed_left(&self) -> impl Iterator<Item = ItemId> + '_ {
        Self::with_state(&self.left, |s| s == ItemState::Claimed)
    }

    /// Terminal transition: every still-unmatched item becomes unique.
    pub fn finish(&mut self) {
        for state in self.left.iter_mut().chain(self.right.iter_mut()) {
            if *state == ItemState::Unmatched {
                *state = ItemState::Unique;
            }
        }
    }

    pub fn unique_left(&self) -> impl Iterator<Item = ItemId> + '_ {
        Self::with_state(&self.left, |s| s == ItemState::Unique)
    }

    pub fn unique_right(&self) -> impl Iterator<Item = ItemId> + '_ {
        Self::with_state(&self.right, |s| s == ItemState::Unique)
    }

    fn with_state<'a>(
        states: &'a [ItemState],
        pred: impl Fn(ItemState) -> bool + 'a,
    ) -> impl Iterator<Item = ItemId> + 'a {
        states
            .iter()
            .enumerate()
            .filter(move |(_, s)| pred(**s))
            .map(|(i, _)| ItemId(i))
    }
}

/// Counts for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    /// Records produced before deduplication.
    pub proposed: usize,
    /// Records kept after deduplication.
    pub accepted: usize,
    /// Left items dropped by deduplication.
    pub claimed: usize,
}

/// Run-level statistics handed out with the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub text_signal: TextSignal,
    pub exact: PhaseSummary,
    pub hard: PhaseSummary,
    pub soft: PhaseSummary,
    /// Records removed by the final cross-phase deduplication.
    pub cross_phase_dropped: usize,
    pub cache: CacheStats,
}

/// Result of a pipeline run. Every item appears in exactly one partition:
/// a match, `claimed_left` (left only) or the unique lists.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutput {
    pub matches: Vec<MatchRecord>,
    pub left_unique: Vec<CatalogItem>,
    pub right_unique: Vec<CatalogItem>,
    pub claimed_left: Vec<ItemId>,
    pub summary: MatchSummary,
}

impl MatchOutput {
    pub fn matches_in(&self, phase: MatchPhase) -> impl Iterator<Item = &MatchRecord> {
        self.matches.iter().filter(move |r| r.phase == phase)
    }
}
