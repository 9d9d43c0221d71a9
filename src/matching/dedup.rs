use std::collections::{HashMap, HashSet};

use super::types::MatchRecord;
use crate::catalog::ItemId;

/// Result of deduplicating one batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// At most one record per `right_id`, in input order.
    pub kept: Vec<MatchRecord>,
    /// Left items whose record lost to a higher-scoring one for the same right
    /// item. They count as matched for pool exclusion and never become unique.
    pub claimed: Vec<ItemId>,
}

/// Enforces at-most-one record per right item.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    /// Keeps the highest-scoring record per `right_id`.
    ///
    /// A later record displaces the current winner only with a strictly higher
    /// score, so ties keep the earliest record in input order.
    pub fn deduplicate(records: Vec<MatchRecord>) -> DedupOutcome {
        let mut winner: HashMap<ItemId, usize> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            match winner.get(&record.right_id) {
                Some(&current) if records[current].composite_score >= record.composite_score => {}
                _ => {
                    winner.insert(record.right_id, idx);
                }
            }
        }

        let kept_idx: HashSet<usize> = winner.into_values().collect();
        let mut kept = Vec::with_capacity(kept_idx.len());
        let mut dropped = Vec::new();
        for (idx, record) in records.into_iter().enumerate() {
            if kept_idx.contains(&idx) {
                kept.push(record);
            } else {
                dropped.push(record.left_id);
            }
        }

        let kept_left: HashSet<ItemId> = kept.iter().map(|r| r.left_id).collect();
        let mut seen = HashSet::new();
        let claimed = dropped
            .into_iter()
            .filter(|id| !kept_left.contains(id) && seen.insert(*id))
            .collect();

        DedupOutcome { kept, claimed }
    }
}
