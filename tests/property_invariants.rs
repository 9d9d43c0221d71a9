//! Property tests for the matching and cache invariants.

mod common;

use std::collections::HashMap;

use common::fixtures::{assert_one_record_per_right, assert_partition, lexical_pipeline};
use proptest::prelude::*;
use skumatch::cache::{ArtifactCache, EmbeddingArtifact};
use skumatch::catalog::{CatalogRecord, ItemId, build_items};
use skumatch::hashing::embedding_key;
use skumatch::matching::MatchPhase;
use skumatch::scoring::{CompositeScorer, MatchCandidatePair, MatchPolicy, ScoringPolicy};

const NAMES: &[&str] = &[
    "acme cola 330ml",
    "acme cola 500ml",
    "acme cola zero 330ml",
    "zest lemon soda 330ml",
    "zest orange soda 1l",
    "brandx chips 100g",
    "brandy chips 100g",
];
const L1: &[&str] = &["drinks", "snacks", ""];
const L3: &[&str] = &["soda", "chips", ""];
const KEYS: &[&str] = &["k1", "k2", "k3"];

fn record_strategy() -> impl Strategy<Value = CatalogRecord> {
    (
        0..NAMES.len(),
        prop::option::of(1u32..40),
        0..L1.len(),
        0..L3.len(),
        prop::option::weighted(0.2, 0..KEYS.len()),
    )
        .prop_map(|(name, price, l1, l3, key)| {
            let mut record = CatalogRecord::new(NAMES[name]).with_categories(L1[l1], L3[l3]);
            if let Some(price) = price {
                record = record.with_price(f64::from(price) / 4.0);
            }
            if let Some(key) = key {
                record = record.with_unique_key(KEYS[key]);
            }
            record
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_item_lands_in_one_partition(
        left in prop::collection::vec(record_strategy(), 0..12),
        right in prop::collection::vec(record_strategy(), 0..12),
        share in any::<bool>(),
    ) {
        let (left_len, right_len) = (left.len(), right.len());
        let pipeline = lexical_pipeline(MatchPolicy::default().with_shared_right_pool(share));
        let output = runtime().block_on(pipeline.run_records(left, right)).unwrap();

        assert_partition(&output, left_len, right_len);
        assert_one_record_per_right(&output);
    }

    #[test]
    fn prop_exact_join_pairs_all_shared_keys(
        left in prop::collection::vec(record_strategy(), 0..12),
        right in prop::collection::vec(record_strategy(), 0..12),
    ) {
        let left_items = build_items(left);
        let right_items = build_items(right);
        let expected: Vec<(ItemId, ItemId)> = left_items
            .iter()
            .flat_map(|l| {
                right_items
                    .iter()
                    .filter(move |r| l.unique_key.is_some() && l.unique_key == r.unique_key)
                    .map(move |r| (l.id, r.id))
            })
            .collect();

        let pipeline = lexical_pipeline(MatchPolicy::default());
        let output = runtime().block_on(pipeline.run(left_items, right_items)).unwrap();
        let exact: Vec<(ItemId, ItemId)> = output
            .matches_in(MatchPhase::Exact)
            .map(|r| (r.left_id, r.right_id))
            .collect();

        prop_assert_eq!(exact, expected);
    }

    #[test]
    fn prop_fuzzy_scores_within_bounds(
        left in prop::collection::vec(record_strategy(), 0..12),
        right in prop::collection::vec(record_strategy(), 0..12),
    ) {
        let policy = MatchPolicy::default();
        let pipeline = lexical_pipeline(policy.clone());
        let output = runtime().block_on(pipeline.run_records(left, right)).unwrap();

        for record in &output.matches {
            let ceiling = match record.phase {
                MatchPhase::Exact => 1.0,
                MatchPhase::Hard => policy.hard.scoring.max_score(),
                MatchPhase::Soft => policy.soft.scoring.max_score().max(
                    policy.fallback.map_or(0.0, |f| f.scoring.max_score()),
                ),
            };
            prop_assert!(record.composite_score >= 0.0);
            prop_assert!(record.composite_score <= ceiling + 1e-5);
        }
    }

    #[test]
    fn prop_cache_round_trip(
        model in "[a-z0-9-]{1,16}",
        text in "\\PC{0,40}",
        vector in prop::collection::vec(-1.0f32..1.0, 0..16),
    ) {
        let cache = ArtifactCache::in_memory();
        let key = embedding_key(&model, &text);
        let artifact = EmbeddingArtifact { text: text.clone(), vector: vector.clone() };
        cache.store_embedding(key, artifact.clone()).unwrap();

        let stored = cache.lookup_embedding(&key).unwrap();
        prop_assert_eq!(&*stored, &artifact);
    }

    #[test]
    fn prop_composite_score_bounded(
        raw_weights in prop::array::uniform4(0.0f32..1.0),
        bonus in 0.0f32..0.5,
        require_brand in any::<bool>(),
        text in -0.5f32..1.5,
        category in 0.0f32..1.0,
        spec in 0.0f32..1.0,
        brand_equal in any::<bool>(),
    ) {
        let total: f32 = raw_weights.iter().sum::<f32>().max(1.0);
        let [text_weight, brand_weight, category_weight, spec_weight] =
            raw_weights.map(|w| w / total);
        let policy = ScoringPolicy {
            text_weight,
            brand_weight,
            category_weight,
            spec_weight,
            brand_match_bonus: bonus,
            composite_threshold: 0.0,
            require_brand_match: require_brand,
            require_subcategory_match: false,
        };
        let scorer = CompositeScorer::new(policy).unwrap();
        let pair = MatchCandidatePair {
            left_id: ItemId(0),
            right_id: ItemId(0),
            text_similarity: text,
            brand_equal,
            category_similarity: category,
            spec_similarity: spec,
            subcategory_equal: false,
        };

        let score = scorer.score(&pair);
        prop_assert!(score >= 0.0);
        prop_assert!(score <= 1.0 + bonus + 1e-5);
    }
}

#[test]
fn test_shared_keys_produce_cross_product() {
    let left = build_items(vec![
        CatalogRecord::new("a").with_unique_key("k"),
        CatalogRecord::new("b").with_unique_key("k"),
    ]);
    let right = build_items(vec![CatalogRecord::new("c").with_unique_key("k")]);

    let output = runtime()
        .block_on(lexical_pipeline(MatchPolicy::default()).run(left, right))
        .unwrap();
    let mut counts: HashMap<ItemId, usize> = HashMap::new();
    for record in &output.matches {
        *counts.entry(record.right_id).or_default() += 1;
    }
    assert_eq!(counts.get(&ItemId(0)), Some(&2));
}
