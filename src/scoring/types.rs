use crate::catalog::{CatalogItem, ItemId, spec_similarity};

/// Signals of one left/right pair inside a single phase. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidatePair {
    pub left_id: ItemId,
    pub right_id: ItemId,
    /// In `[0, 1]`: reranker probability, embedding cosine or lexical overlap.
    pub text_similarity: f32,
    pub brand_equal: bool,
    /// `0.5` per matching category level.
    pub category_similarity: f32,
    pub spec_similarity: f32,
    /// Both items carry the same non-empty `category_l3`.
    pub subcategory_equal: bool,
}

impl MatchCandidatePair {
    /// Derives the attribute signals from the two items.
    pub fn from_items(left: &CatalogItem, right: &CatalogItem, text_similarity: f32) -> Self {
        let l1_equal = !left.category_l1.is_empty() && left.category_l1 == right.category_l1;
        let l3_equal = !left.category_l3.is_empty() && left.category_l3 == right.category_l3;

        Self {
            left_id: left.id,
            right_id: right.id,
            text_similarity: text_similarity.clamp(0.0, 1.0),
            brand_equal: left.brand_equals(right),
            category_similarity: 0.5 * (l1_equal as u8 as f32) + 0.5 * (l3_equal as u8 as f32),
            spec_similarity: spec_similarity(&left.spec_signature, &right.spec_signature),
            subcategory_equal: l3_equal,
        }
    }
}

/// A scored pair that passed every requirement of its policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub pair: MatchCandidatePair,
    pub score: f32,
}
