use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info};

use super::candidates::{
    Candidate, CandidateGroup, PassKind, RankingSource, generate_candidates, group_items,
};
use super::error::MatchResult;
use super::types::MatchRecord;
use crate::cache::{ArtifactCache, ArtifactKind, CacheError, RerankerScore};
use crate::catalog::CatalogItem;
use crate::embedding::{RerankerError, RerankerProvider, sigmoid};
use crate::hashing::{CacheKey, canonical_pair, reranker_key};
use crate::scoring::{CompositeScorer, MatchCandidatePair, PassPolicy};

/// Records proposed by one pass, before deduplication.
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    /// At most one record per left item, ordered by left id.
    pub records: Vec<MatchRecord>,
    pub groups: usize,
    /// Candidate pairs that reached the composite scorer.
    pub candidates: usize,
}

/// Category-scoped approximate matcher.
///
/// One instance serves every pass of a run; the pass kind and policy are passed
/// per call. Embeddings must already be attached to the items when ranking by
/// embedding.
pub struct CategoryScopedFuzzyMatcher<'a> {
    ranking: RankingSource<'a>,
    reranker: Option<&'a dyn RerankerProvider>,
    cache: &'a ArtifactCache,
    top_k: usize,
}

impl<'a> CategoryScopedFuzzyMatcher<'a> {
    pub(crate) fn new(
        ranking: RankingSource<'a>,
        reranker: Option<&'a dyn RerankerProvider>,
        cache: &'a ArtifactCache,
        top_k: usize,
    ) -> Self {
        Self {
            ranking,
            reranker,
            cache,
            top_k,
        }
    }

    /// Runs one pass over the given residual pools.
    pub async fn run_pass(
        &self,
        kind: PassKind,
        policy: &PassPolicy,
        left: &[&CatalogItem],
        right: &[&CatalogItem],
    ) -> MatchResult<PassOutput> {
        let scorer = CompositeScorer::new(policy.scoring)?;
        let groups = group_items(kind, left, right);

        let mut staged: Vec<Vec<Vec<Candidate>>> = Vec::with_capacity(groups.len());
        for group in &groups {
            let similarities = self.ranking.group_similarity(group)?;
            let candidates = generate_candidates(kind, group, &similarities, policy, self.top_k);
            debug!(
                pass = kind.as_str(),
                l1 = group.key.0,
                l3 = group.key.1,
                left = group.left.len(),
                right = group.right.len(),
                candidates = candidates.iter().map(Vec::len).sum::<usize>(),
                "Generated group candidates"
            );
            staged.push(candidates);
        }

        let logits = match self.reranker {
            Some(reranker) => Some(self.resolve_reranker_scores(reranker, &groups, &staged).await?),
            None => None,
        };
        let reranker_model = self.reranker.map(|r| r.model_identifier());

        let mut output = PassOutput {
            groups: groups.len(),
            ..Default::default()
        };
        for (group, candidates) in groups.iter().zip(&staged) {
            output.candidates += candidates.iter().map(Vec::len).sum::<usize>();

            let best: Vec<_> = group
                .left
                .par_iter()
                .zip(candidates.par_iter())
                .map(|(left, cands)| {
                    scorer.select_best(cands.iter().map(|c| {
                        let right = group.right[c.right];
                        let text_similarity = match (&logits, reranker_model) {
                            (Some(logits), Some(model)) => {
                                let key = reranker_key(model, left.match_text(), right.match_text());
                                logits.get(&key).copied().map(sigmoid).unwrap_or(0.0)
                            }
                            _ => c.ranking,
                        };
                        MatchCandidatePair::from_items(left, right, text_similarity)
                    }))
                })
                .collect();

            output
                .records
                .extend(best.into_iter().flatten().map(|s| MatchRecord {
                    left_id: s.pair.left_id,
                    right_id: s.pair.right_id,
                    composite_score: s.score,
                    phase: kind.phase(),
                }));
        }
        output.records.sort_by_key(|r| r.left_id);

        info!(
            pass = kind.as_str(),
            groups = output.groups,
            left = left.len(),
            right = right.len(),
            candidates = output.candidates,
            proposed = output.records.len(),
            "Fuzzy pass complete"
        );
        Ok(output)
    }

    /// Raw reranker scores for every candidate pair of the pass, keyed by reranker key.
    ///
    /// Pairs are canonicalised, served from the cache when possible, and the rest
    /// are requested grouped by their first text in chunks of the provider's
    /// batch size.
    async fn resolve_reranker_scores(
        &self,
        reranker: &dyn RerankerProvider,
        groups: &[CandidateGroup<'_>],
        staged: &[Vec<Vec<Candidate>>],
    ) -> MatchResult<HashMap<CacheKey, f32>> {
        let model = reranker.model_identifier();
        let mut logits: HashMap<CacheKey, f32> = HashMap::new();
        let mut seen: HashSet<CacheKey> = HashSet::new();
        let mut misses: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for (group, candidates) in groups.iter().zip(staged) {
            for (left, cands) in group.left.iter().zip(candidates) {
                for c in cands {
                    let right = group.right[c.right];
                    let key = reranker_key(model, left.match_text(), right.match_text());
                    if !seen.insert(key) {
                        continue;
                    }
                    let (a, b) = canonical_pair(left.match_text(), right.match_text());
                    match self.cache.lookup_reranker_score(&key) {
                        Some(hit) if hit.text_a != a || hit.text_b != b => {
                            return Err(CacheError::KeyCollision {
                                kind: ArtifactKind::RerankerScore,
                                key,
                            }
                            .into());
                        }
                        Some(hit) => {
                            logits.insert(key, hit.score);
                        }
                        None => {
                            misses.entry(a).or_default().insert(b);
                        }
                    }
                }
            }
        }

        let cached = logits.len();
        let batch_size = reranker.max_batch_size().max(1);
        for (query, others) in &misses {
            let others: Vec<&str> = others.iter().copied().collect();
            for chunk in others.chunks(batch_size) {
                let scores = reranker.score_batch(query, chunk).await?;
                if scores.len() != chunk.len() {
                    return Err(RerankerError::InvalidResponse {
                        reason: format!("{} scores for {} texts", scores.len(), chunk.len()),
                    }
                    .into());
                }
                for (other, score) in chunk.iter().zip(scores) {
                    let key = reranker_key(model, query, other);
                    self.cache.store_reranker_score(
                        key,
                        RerankerScore {
                            text_a: (*query).to_string(),
                            text_b: (*other).to_string(),
                            score,
                        },
                    )?;
                    logits.insert(key, score);
                }
            }
        }

        debug!(
            model,
            cached,
            scored = logits.len() - cached,
            "Reranker scores resolved"
        );
        Ok(logits)
    }
}
