use tracing::trace;

use super::error::PolicyError;
use super::policy::ScoringPolicy;
use super::types::{MatchCandidatePair, ScoredCandidate};

/// Pure weighted blend of pair signals under one [`ScoringPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct CompositeScorer {
    policy: ScoringPolicy,
}

impl CompositeScorer {
    /// Validates `policy` and wraps it.
    pub fn new(policy: ScoringPolicy) -> Result<Self, PolicyError> {
        policy.validate("scoring")?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Composite score in `[0, policy.max_score()]`.
    pub fn score(&self, pair: &MatchCandidatePair) -> f32 {
        let p = &self.policy;
        let brand = if pair.brand_equal { 1.0 } else { 0.0 };
        let bonus = if p.require_brand_match && pair.brand_equal {
            p.brand_match_bonus
        } else {
            0.0
        };

        pair.text_similarity.clamp(0.0, 1.0) * p.text_weight
            + brand * p.brand_weight
            + pair.category_similarity.clamp(0.0, 1.0) * p.category_weight
            + pair.spec_similarity.clamp(0.0, 1.0) * p.spec_weight
            + bonus
    }

    /// `true` when every required flag holds for the pair.
    pub fn requirements_met(&self, pair: &MatchCandidatePair) -> bool {
        (!self.policy.require_brand_match || pair.brand_equal)
            && (!self.policy.require_subcategory_match || pair.subcategory_equal)
    }

    /// Scores the pair and returns it if it is acceptable.
    pub fn evaluate(&self, pair: MatchCandidatePair) -> Option<ScoredCandidate> {
        let score = self.score(&pair);
        let accepted = score >= self.policy.composite_threshold && self.requirements_met(&pair);
        trace!(
            left = %pair.left_id,
            right = %pair.right_id,
            score,
            accepted,
            "Scored candidate pair"
        );
        accepted.then_some(ScoredCandidate { pair, score })
    }

    /// Best acceptable candidate of one left item.
    ///
    /// A later candidate replaces the current best only with a strictly higher
    /// score, so exact ties keep the first candidate in iteration order.
    pub fn select_best<I>(&self, pairs: I) -> Option<ScoredCandidate>
    where
        I: IntoIterator<Item = MatchCandidatePair>,
    {
        pairs
            .into_iter()
            .filter_map(|pair| self.evaluate(pair))
            .fold(None, |best: Option<ScoredCandidate>, candidate| match best {
                Some(current) if candidate.score <= current.score => Some(current),
                _ => Some(candidate),
            })
    }
}
