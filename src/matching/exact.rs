use std::collections::HashMap;

use tracing::debug;

use super::types::{MatchPhase, MatchRecord};
use crate::catalog::{CatalogItem, ItemId};

/// Inner join of two item lists on their normalized unique key.
///
/// No price or text checks and no deduplication: every left item pairs with every
/// right item that shares its key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl ExactMatcher {
    /// Records are ordered by left position, then right position.
    pub fn match_items<'a, L, R>(left: L, right: R) -> Vec<MatchRecord>
    where
        L: IntoIterator<Item = &'a CatalogItem>,
        R: IntoIterator<Item = &'a CatalogItem>,
    {
        let mut by_key: HashMap<&str, Vec<ItemId>> = HashMap::new();
        for item in right {
            if let Some(key) = item.unique_key.as_deref() {
                by_key.entry(key).or_default().push(item.id);
            }
        }

        let mut records = Vec::new();
        for item in left {
            let Some(rights) = item.unique_key.as_deref().and_then(|k| by_key.get(k)) else {
                continue;
            };
            records.extend(rights.iter().map(|&right_id| MatchRecord {
                left_id: item.id,
                right_id,
                composite_score: 1.0,
                phase: MatchPhase::Exact,
            }));
        }

        debug!(
            keys = by_key.len(),
            records = records.len(),
            "Exact key join complete"
        );
        records
    }
}
