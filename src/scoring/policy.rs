use serde::{Deserialize, Serialize};

use super::error::PolicyError;
use crate::constants::{
    DEFAULT_TOP_K, FALLBACK_COMPOSITE_THRESHOLD, HARD_COMPOSITE_THRESHOLD,
    HARD_MIN_TEXT_SIMILARITY, HARD_PRICE_TOLERANCE, SOFT_COMPOSITE_THRESHOLD,
    SOFT_MIN_TEXT_SIMILARITY, SOFT_PRICE_TOLERANCE, WEIGHT_SUM_EPSILON,
};

/// Weights and acceptance rules of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub text_weight: f32,
    pub brand_weight: f32,
    pub category_weight: f32,
    pub spec_weight: f32,
    /// Added when `require_brand_match` is set and the brands are equal.
    pub brand_match_bonus: f32,
    pub composite_threshold: f32,
    pub require_brand_match: bool,
    pub require_subcategory_match: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            text_weight: 0.5,
            brand_weight: 0.2,
            category_weight: 0.15,
            spec_weight: 0.15,
            brand_match_bonus: 0.0,
            composite_threshold: SOFT_COMPOSITE_THRESHOLD,
            require_brand_match: false,
            require_subcategory_match: false,
        }
    }
}

impl ScoringPolicy {
    pub fn weight_sum(&self) -> f32 {
        self.text_weight + self.brand_weight + self.category_weight + self.spec_weight
    }

    /// Upper bound of [`CompositeScorer::score`](super::CompositeScorer::score).
    pub fn max_score(&self) -> f32 {
        self.weight_sum()
            + if self.require_brand_match {
                self.brand_match_bonus
            } else {
                0.0
            }
    }

    pub fn validate(&self, pass: &'static str) -> Result<(), PolicyError> {
        for (field, value) in [
            ("text_weight", self.text_weight),
            ("brand_weight", self.brand_weight),
            ("category_weight", self.category_weight),
            ("spec_weight", self.spec_weight),
            ("composite_threshold", self.composite_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::OutOfRange { pass, field, value });
            }
        }

        let sum = self.weight_sum();
        if sum > 1.0 + WEIGHT_SUM_EPSILON {
            return Err(PolicyError::WeightSumExceeded { pass, sum });
        }

        if !self.brand_match_bonus.is_finite() || self.brand_match_bonus < 0.0 {
            return Err(PolicyError::InvalidBonus {
                pass,
                value: self.brand_match_bonus,
            });
        }

        Ok(())
    }
}

/// Candidate filters and scoring rules of one matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassPolicy {
    /// Relative price window around the left item's price.
    pub price_tolerance: f64,
    /// Candidates whose ranking similarity falls below this are never scored.
    pub min_text_similarity: f32,
    /// Reject pairs whose brands are equal (variant guard for the fallback pass).
    pub exclude_equal_brands: bool,
    pub scoring: ScoringPolicy,
}

impl Default for PassPolicy {
    fn default() -> Self {
        MatchPolicy::default_soft()
    }
}

impl PassPolicy {
    pub fn validate(&self, pass: &'static str) -> Result<(), PolicyError> {
        if !self.price_tolerance.is_finite() || !(0.0..1.0).contains(&self.price_tolerance) {
            return Err(PolicyError::InvalidPriceTolerance {
                pass,
                value: self.price_tolerance,
            });
        }
        if !(0.0..=1.0).contains(&self.min_text_similarity) {
            return Err(PolicyError::OutOfRange {
                pass,
                field: "min_text_similarity",
                value: self.min_text_similarity,
            });
        }
        self.scoring.validate(pass)
    }
}

/// Complete matching configuration: one policy per fuzzy pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    pub hard: PassPolicy,
    pub soft: PassPolicy,
    /// Soft sub-pass grouped by `category_l3` alone. `None` disables it.
    pub fallback: Option<PassPolicy>,
    /// Candidates kept per left item after similarity ranking.
    pub top_k: usize,
    /// Let the soft pass consider right items already matched by the hard pass.
    pub share_right_pool: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            hard: Self::default_hard(),
            soft: Self::default_soft(),
            fallback: Some(Self::default_fallback()),
            top_k: DEFAULT_TOP_K,
            share_right_pool: false,
        }
    }
}

impl MatchPolicy {
    pub fn default_hard() -> PassPolicy {
        PassPolicy {
            price_tolerance: HARD_PRICE_TOLERANCE,
            min_text_similarity: HARD_MIN_TEXT_SIMILARITY,
            exclude_equal_brands: false,
            scoring: ScoringPolicy {
                text_weight: 0.6,
                brand_weight: 0.25,
                category_weight: 0.0,
                spec_weight: 0.15,
                brand_match_bonus: 0.0,
                composite_threshold: HARD_COMPOSITE_THRESHOLD,
                require_brand_match: false,
                require_subcategory_match: false,
            },
        }
    }

    pub fn default_soft() -> PassPolicy {
        PassPolicy {
            price_tolerance: SOFT_PRICE_TOLERANCE,
            min_text_similarity: SOFT_MIN_TEXT_SIMILARITY,
            exclude_equal_brands: false,
            scoring: ScoringPolicy::default(),
        }
    }

    pub fn default_fallback() -> PassPolicy {
        PassPolicy {
            price_tolerance: SOFT_PRICE_TOLERANCE,
            min_text_similarity: SOFT_MIN_TEXT_SIMILARITY,
            exclude_equal_brands: true,
            scoring: ScoringPolicy {
                text_weight: 0.6,
                brand_weight: 0.0,
                category_weight: 0.2,
                spec_weight: 0.2,
                brand_match_bonus: 0.0,
                composite_threshold: FALLBACK_COMPOSITE_THRESHOLD,
                require_brand_match: false,
                require_subcategory_match: true,
            },
        }
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_shared_right_pool(mut self, share: bool) -> Self {
        self.share_right_pool = share;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.top_k == 0 {
            return Err(PolicyError::ZeroTopK);
        }

        self.hard.validate("hard")?;
        if self.hard.scoring.category_weight != 0.0 {
            return Err(PolicyError::HardCategoryWeight {
                value: self.hard.scoring.category_weight,
            });
        }

        self.soft.validate("soft")?;

        if let Some(fallback) = &self.fallback {
            fallback.validate("fallback")?;
            if !fallback.exclude_equal_brands {
                return Err(PolicyError::FallbackAllowsEqualBrands);
            }
            if fallback.scoring.require_brand_match {
                return Err(PolicyError::FallbackRequiresBrand);
            }
        }

        Ok(())
    }
}
