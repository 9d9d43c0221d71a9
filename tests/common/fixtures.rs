//! Catalog and pipeline fixtures.

use std::collections::HashSet;
use std::sync::Arc;

use skumatch::cache::ArtifactCache;
use skumatch::catalog::{CatalogItem, CatalogRecord, ItemId, build_items};
use skumatch::matching::{MatchOutput, MatchPhase, MatchPipeline};
use skumatch::scoring::{MatchPolicy, PassPolicy, ScoringPolicy};

pub const DRINKS: &str = "drinks";
pub const SODA: &str = "soda";

/// Priced record in `(l1, l3)`.
pub fn product(name: &str, price: f64, l1: &str, l3: &str) -> CatalogRecord {
    CatalogRecord::new(name)
        .with_price(price)
        .with_categories(l1, l3)
}

pub fn items(records: Vec<CatalogRecord>) -> Vec<CatalogItem> {
    build_items(records)
}

/// Hard pass that scores on text similarity alone.
pub fn text_only_hard(threshold: f32) -> PassPolicy {
    let mut pass = MatchPolicy::default_hard();
    pass.scoring = ScoringPolicy {
        text_weight: 1.0,
        brand_weight: 0.0,
        category_weight: 0.0,
        spec_weight: 0.0,
        brand_match_bonus: 0.0,
        composite_threshold: threshold,
        require_brand_match: false,
        require_subcategory_match: false,
    };
    pass
}

/// Pipeline without providers: lexical text signal, in-memory cache.
pub fn lexical_pipeline(policy: MatchPolicy) -> MatchPipeline {
    MatchPipeline::new(Arc::new(ArtifactCache::in_memory()), policy).unwrap()
}

/// Unit vector at `cos` similarity to `[1, 0]`.
pub fn at_cosine(cos: f32) -> Vec<f32> {
    vec![cos, (1.0 - cos * cos).sqrt()]
}

/// Asserts that every item lands in exactly one output partition.
pub fn assert_partition(output: &MatchOutput, left_len: usize, right_len: usize) {
    let mut left_seen: HashSet<ItemId> = HashSet::new();
    let mut right_seen: HashSet<ItemId> = HashSet::new();

    for record in &output.matches {
        left_seen.insert(record.left_id);
        right_seen.insert(record.right_id);
    }
    let matched_left = left_seen.clone();
    let matched_right = right_seen.clone();

    for id in &output.claimed_left {
        assert!(!matched_left.contains(id), "claimed left {id} is also matched");
        assert!(left_seen.insert(*id), "left {id} claimed twice");
    }
    for item in &output.left_unique {
        assert!(left_seen.insert(item.id), "left {} is not uniquely placed", item.id);
    }
    for item in &output.right_unique {
        assert!(!matched_right.contains(&item.id), "right {} is matched and unique", item.id);
        assert!(right_seen.insert(item.id), "right {} unique twice", item.id);
    }

    assert_eq!(left_seen.len(), left_len);
    assert_eq!(right_seen.len(), right_len);
}

/// Asserts the at-most-one invariant over the fuzzy phases.
pub fn assert_one_record_per_right(output: &MatchOutput) {
    let mut seen = HashSet::new();
    for record in output
        .matches
        .iter()
        .filter(|r| r.phase != MatchPhase::Exact)
    {
        assert!(
            seen.insert(record.right_id),
            "right {} matched twice",
            record.right_id
        );
    }
}
