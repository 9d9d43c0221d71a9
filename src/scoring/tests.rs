use super::*;
use crate::catalog::{CatalogItem, CatalogRecord, ItemId};

fn pair(right: usize, text: f32, brand_equal: bool) -> MatchCandidatePair {
    MatchCandidatePair {
        left_id: ItemId(0),
        right_id: ItemId(right),
        text_similarity: text,
        brand_equal,
        category_similarity: 0.0,
        spec_similarity: 0.0,
        subcategory_equal: false,
    }
}

fn text_brand_policy() -> ScoringPolicy {
    ScoringPolicy {
        text_weight: 0.6,
        brand_weight: 0.3,
        category_weight: 0.0,
        spec_weight: 0.0,
        brand_match_bonus: 0.0,
        composite_threshold: 0.4,
        require_brand_match: false,
        require_subcategory_match: false,
    }
}

#[test]
fn test_brand_outweighs_closer_price() {
    let scorer = CompositeScorer::new(text_brand_policy()).unwrap();
    let same_brand = pair(0, 0.95, true);
    let other_brand = pair(1, 0.80, false);

    assert!((scorer.score(&same_brand) - 0.87).abs() < 1e-5);
    assert!((scorer.score(&other_brand) - 0.48).abs() < 1e-5);

    let best = scorer.select_best([other_brand, same_brand]).unwrap();
    assert_eq!(best.pair.right_id, ItemId(0));
}

#[test]
fn test_threshold_is_inclusive() {
    let scorer = CompositeScorer::new(ScoringPolicy {
        text_weight: 1.0,
        brand_weight: 0.0,
        composite_threshold: 0.5,
        ..text_brand_policy()
    })
    .unwrap();
    assert!(scorer.evaluate(pair(0, 0.5, false)).is_some());
    assert!(scorer.evaluate(pair(0, 0.49, false)).is_none());
}

#[test]
fn test_exact_tie_keeps_first_candidate() {
    let scorer = CompositeScorer::new(text_brand_policy()).unwrap();
    let best = scorer
        .select_best([pair(4, 0.9, false), pair(2, 0.9, false)])
        .unwrap();
    assert_eq!(best.pair.right_id, ItemId(4));
}

#[test]
fn test_strictly_higher_later_candidate_wins() {
    let scorer = CompositeScorer::new(text_brand_policy()).unwrap();
    let best = scorer
        .select_best([pair(1, 0.7, false), pair(2, 0.9, false)])
        .unwrap();
    assert_eq!(best.pair.right_id, ItemId(2));
}

#[test]
fn test_no_acceptable_candidate() {
    let scorer = CompositeScorer::new(text_brand_policy()).unwrap();
    assert!(scorer.select_best([pair(1, 0.1, false)]).is_none());
    assert!(scorer.select_best(Vec::new()).is_none());
}

#[test]
fn test_bonus_only_applies_when_brand_required() {
    let base = ScoringPolicy {
        brand_match_bonus: 0.1,
        ..text_brand_policy()
    };
    let without = CompositeScorer::new(base).unwrap();
    let with = CompositeScorer::new(ScoringPolicy {
        require_brand_match: true,
        ..base
    })
    .unwrap();

    let p = pair(0, 1.0, true);
    assert!((without.score(&p) - 0.9).abs() < 1e-5);
    assert!((with.score(&p) - 1.0).abs() < 1e-5);
    assert!((with.policy().max_score() - 1.0).abs() < 1e-5);
}

#[test]
fn test_required_flags_reject_high_scores() {
    let scorer = CompositeScorer::new(ScoringPolicy {
        require_brand_match: true,
        ..text_brand_policy()
    })
    .unwrap();
    assert!(scorer.evaluate(pair(0, 1.0, false)).is_none());

    let scorer = CompositeScorer::new(ScoringPolicy {
        require_subcategory_match: true,
        ..text_brand_policy()
    })
    .unwrap();
    assert!(scorer.evaluate(pair(0, 1.0, true)).is_none());
    let ok = MatchCandidatePair {
        subcategory_equal: true,
        ..pair(0, 1.0, true)
    };
    assert!(scorer.evaluate(ok).is_some());
}

#[test]
fn test_out_of_range_signals_are_clamped() {
    let scorer = CompositeScorer::new(text_brand_policy()).unwrap();
    let p = MatchCandidatePair {
        text_similarity: 1.7,
        ..pair(0, 0.0, false)
    };
    assert!((scorer.score(&p) - 0.6).abs() < 1e-6);
    let p = MatchCandidatePair {
        text_similarity: -0.4,
        ..pair(0, 0.0, false)
    };
    assert_eq!(scorer.score(&p), 0.0);
}

#[test]
fn test_pair_from_items_derives_signals() {
    let left = CatalogItem::from_record(
        ItemId(0),
        CatalogRecord::new("ColaBrandX 500ml").with_categories("Drinks", "Soda"),
    );
    let right = CatalogItem::from_record(
        ItemId(3),
        CatalogRecord::new("ColaBrandX 500ml can").with_categories("Drinks", "Juice"),
    );
    let p = MatchCandidatePair::from_items(&left, &right, 0.9);

    assert_eq!(p.right_id, ItemId(3));
    assert!(p.brand_equal);
    assert_eq!(p.category_similarity, 0.5);
    assert!(!p.subcategory_equal);
    assert_eq!(p.spec_similarity, 1.0);
}

#[test]
fn test_empty_categories_never_match() {
    let a = CatalogItem::from_record(ItemId(0), CatalogRecord::new("x"));
    let b = CatalogItem::from_record(ItemId(1), CatalogRecord::new("y"));
    let p = MatchCandidatePair::from_items(&a, &b, 0.5);
    assert_eq!(p.category_similarity, 0.0);
    assert!(!p.subcategory_equal);
}

#[test]
fn test_default_policy_is_valid() {
    assert_eq!(MatchPolicy::default().validate(), Ok(()));
    assert!(MatchPolicy::default().without_fallback().fallback.is_none());
}

#[test]
fn test_policy_rejects_weight_sum_above_one() {
    let mut policy = MatchPolicy::default();
    policy.soft.scoring.text_weight = 0.9;
    assert!(matches!(
        policy.validate(),
        Err(PolicyError::WeightSumExceeded { pass: "soft", .. })
    ));
}

#[test]
fn test_policy_rejects_out_of_range_fields() {
    let mut policy = MatchPolicy::default();
    policy.hard.scoring.composite_threshold = 1.5;
    assert!(matches!(
        policy.validate(),
        Err(PolicyError::OutOfRange {
            pass: "hard",
            field: "composite_threshold",
            ..
        })
    ));

    let mut policy = MatchPolicy::default();
    policy.soft.price_tolerance = 1.0;
    assert!(matches!(
        policy.validate(),
        Err(PolicyError::InvalidPriceTolerance { .. })
    ));

    let mut policy = MatchPolicy::default();
    policy.soft.scoring.brand_match_bonus = -0.1;
    assert!(matches!(policy.validate(), Err(PolicyError::InvalidBonus { .. })));
}

#[test]
fn test_policy_rejects_hard_category_weight() {
    let mut policy = MatchPolicy::default();
    policy.hard.scoring.category_weight = 0.1;
    policy.hard.scoring.text_weight = 0.5;
    assert_eq!(
        policy.validate(),
        Err(PolicyError::HardCategoryWeight { value: 0.1 })
    );
}

#[test]
fn test_policy_rejects_fallback_requiring_brand() {
    let mut policy = MatchPolicy::default();
    if let Some(fallback) = policy.fallback.as_mut() {
        fallback.scoring.require_brand_match = true;
    }
    assert_eq!(policy.validate(), Err(PolicyError::FallbackRequiresBrand));
}

#[test]
fn test_policy_rejects_fallback_allowing_equal_brands() {
    let mut policy = MatchPolicy::default();
    if let Some(fallback) = policy.fallback.as_mut() {
        fallback.exclude_equal_brands = false;
    }
    assert_eq!(
        policy.validate(),
        Err(PolicyError::FallbackAllowsEqualBrands)
    );
}

#[test]
fn test_policy_rejects_zero_top_k() {
    assert_eq!(
        MatchPolicy::default().with_top_k(0).validate(),
        Err(PolicyError::ZeroTopK)
    );
}

#[test]
fn test_policy_deserializes_partial_json() {
    let policy: MatchPolicy =
        serde_json::from_str(r#"{"top_k": 5, "soft": {"price_tolerance": 0.3}}"#).unwrap();
    assert_eq!(policy.top_k, 5);
    assert_eq!(policy.soft.price_tolerance, 0.3);
    assert_eq!(policy.hard, MatchPolicy::default_hard());
    assert!(policy.fallback.is_some());
}
