use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::candidates::{PassKind, RankingSource};
use super::dedup::{DedupOutcome, Deduplicator};
use super::embed::resolve_embeddings;
use super::error::{MatchError, MatchResult};
use super::exact::ExactMatcher;
use super::fuzzy::CategoryScopedFuzzyMatcher;
use super::types::{
    ItemState, MatchOutput, MatchState, MatchSummary, PhaseSummary, TextSignal,
};
use crate::cache::{ArtifactCache, PersistReport};
use crate::catalog::{CatalogItem, CatalogRecord, ItemId, Side, build_items};
use crate::constants::{DEFAULT_EMBED_CONCURRENCY, DEFAULT_SIMILARITY_CHUNK_SIZE};
use crate::embedding::{EmbeddingProvider, RerankerProvider};
use crate::scoring::MatchPolicy;

/// Orchestrates exact, hard and soft matching over two catalogs.
///
/// Phases run strictly in order; each one only sees the items every earlier
/// phase left unmatched. The cache is injected and shared with the caller, who
/// decides when to [`persist`](ArtifactCache::persist) it.
pub struct MatchPipeline {
    policy: MatchPolicy,
    cache: Arc<ArtifactCache>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    reranker: Option<Arc<dyn RerankerProvider>>,
    similarity_chunk_size: usize,
    embed_concurrency: usize,
}

impl std::fmt::Debug for MatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchPipeline")
            .field("policy", &self.policy)
            .field("text_signal", &self.text_signal())
            .field(
                "embedder",
                &self.embedder.as_ref().map(|e| e.model_identifier()),
            )
            .field(
                "reranker",
                &self.reranker.as_ref().map(|r| r.model_identifier()),
            )
            .finish()
    }
}

impl MatchPipeline {
    /// Validates `policy` and creates a pipeline in [`TextSignal::Lexical`] mode.
    pub fn new(cache: Arc<ArtifactCache>, policy: MatchPolicy) -> MatchResult<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            cache,
            embedder: None,
            reranker: None,
            similarity_chunk_size: DEFAULT_SIMILARITY_CHUNK_SIZE,
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
        })
    }

    /// Ranks candidates by embedding similarity.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Replaces the text term with the reranker's sigmoid score.
    pub fn with_reranker(mut self, reranker: Arc<dyn RerankerProvider>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_similarity_chunk_size(mut self, rows: usize) -> Self {
        self.similarity_chunk_size = rows.max(1);
        self
    }

    pub fn with_embed_concurrency(mut self, batches_in_flight: usize) -> Self {
        self.embed_concurrency = batches_in_flight.max(1);
        self
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    pub fn text_signal(&self) -> TextSignal {
        match (&self.reranker, &self.embedder) {
            (Some(_), _) => TextSignal::Reranked,
            (None, Some(_)) => TextSignal::Embedding,
            (None, None) => TextSignal::Lexical,
        }
    }

    /// Merge-on-save of every artifact computed so far.
    pub fn persist_cache(&self) -> PersistReport {
        self.cache.persist()
    }

    /// Builds items from loader records and runs the pipeline.
    pub async fn run_records(
        &self,
        left: Vec<CatalogRecord>,
        right: Vec<CatalogRecord>,
    ) -> MatchResult<MatchOutput> {
        self.run(build_items(left), build_items(right)).await
    }

    /// Runs every phase. Item ids must equal their position in each list.
    #[instrument(skip_all, fields(left = left.len(), right = right.len()))]
    pub async fn run(
        &self,
        mut left: Vec<CatalogItem>,
        mut right: Vec<CatalogItem>,
    ) -> MatchResult<MatchOutput> {
        check_ids(Side::Left, &left)?;
        check_ids(Side::Right, &right)?;

        let text_signal = self.text_signal();
        info!(?text_signal, "Starting match run");

        let mut state = MatchState::new(left.len(), right.len());

        let exact = ExactMatcher::match_items(&left, &right);
        for record in &exact {
            state.record_match(record);
        }
        let exact_summary = PhaseSummary {
            proposed: exact.len(),
            accepted: exact.len(),
            claimed: 0,
        };
        info!(matches = exact.len(), "Exact phase complete");

        if let Some(embedder) = &self.embedder {
            self.attach_embeddings(embedder.as_ref(), &mut left, &mut right, &state)
                .await?;
        }

        let ranking = match &self.embedder {
            Some(embedder) => RankingSource::Embedding {
                model: embedder.model_identifier(),
                cache: &self.cache,
                chunk_size: self.similarity_chunk_size,
            },
            None => RankingSource::Lexical,
        };
        let matcher = CategoryScopedFuzzyMatcher::new(
            ranking,
            self.reranker.as_deref(),
            &self.cache,
            self.policy.top_k,
        );

        // Hard pass.
        let pool_left = select(&left, state.unmatched_left());
        let pool_right = select(&right, state.unmatched_right());
        let hard = matcher
            .run_pass(PassKind::Hard, &self.policy.hard, &pool_left, &pool_right)
            .await?;
        let hard_proposed = hard.records.len();
        let hard_dedup = Deduplicator::deduplicate(hard.records);
        apply(&mut state, &hard_dedup);
        let hard_summary = summarize(hard_proposed, &hard_dedup);

        // Soft pass, then the category_l3 fallback for lefts it found nothing for.
        let pool_left = select(&left, state.unmatched_left());
        let pool_right = if self.policy.share_right_pool {
            select(&right, state.right_open_to_soft())
        } else {
            select(&right, state.unmatched_right())
        };
        let soft = matcher
            .run_pass(PassKind::Soft, &self.policy.soft, &pool_left, &pool_right)
            .await?;
        let mut soft_records = soft.records;

        if let Some(fallback) = &self.policy.fallback {
            let proposed: HashSet<ItemId> = soft_records.iter().map(|r| r.left_id).collect();
            let fallback_left: Vec<&CatalogItem> = pool_left
                .iter()
                .copied()
                .filter(|item| !proposed.contains(&item.id))
                .collect();
            let fallback_out = matcher
                .run_pass(PassKind::Fallback, fallback, &fallback_left, &pool_right)
                .await?;
            soft_records.extend(fallback_out.records);
        }

        let soft_proposed = soft_records.len();
        let soft_dedup = Deduplicator::deduplicate(soft_records);
        apply(&mut state, &soft_dedup);
        let soft_summary = summarize(soft_proposed, &soft_dedup);

        // Cross-phase: a right item kept by both passes goes to the better record.
        let mut phase_records = hard_dedup.kept;
        phase_records.extend(soft_dedup.kept);
        let before = phase_records.len();
        let cross = Deduplicator::deduplicate(phase_records);
        for id in &cross.claimed {
            state.claim_left(*id);
        }
        for record in &cross.kept {
            state.record_match(record);
        }
        let cross_phase_dropped = before - cross.kept.len();
        if cross_phase_dropped > 0 {
            debug!(dropped = cross_phase_dropped, "Cross-phase deduplication");
        }

        state.finish();

        let mut matches = exact;
        matches.extend(cross.kept);

        let summary = MatchSummary {
            text_signal,
            exact: exact_summary,
            hard: hard_summary,
            soft: soft_summary,
            cross_phase_dropped,
            cache: self.cache.stats(),
        };

        let claimed_left: Vec<ItemId> = state.claimed_left().collect();
        let left_unique = take_items(left, state.unique_left());
        let right_unique = take_items(right, state.unique_right());

        info!(
            matches = matches.len(),
            left_unique = left_unique.len(),
            right_unique = right_unique.len(),
            claimed = claimed_left.len(),
            "Match run complete"
        );

        Ok(MatchOutput {
            matches,
            left_unique,
            right_unique,
            claimed_left,
            summary,
        })
    }

    /// Embeds every still-unmatched priced item and attaches the vector to it.
    ///
    /// Unpriced items are skipped: no price-windowed pass can place them.
    async fn attach_embeddings(
        &self,
        embedder: &dyn EmbeddingProvider,
        left: &mut [CatalogItem],
        right: &mut [CatalogItem],
        state: &MatchState,
    ) -> MatchResult<()> {
        let wanted = |item: &CatalogItem, s: ItemState| {
            item.price.is_some() && s == ItemState::Unmatched
        };

        let texts: Vec<String> = left
            .iter()
            .filter(|i| wanted(*i, state.left(i.id)))
            .chain(right.iter().filter(|i| wanted(*i, state.right(i.id))))
            .map(|i| i.match_text().to_string())
            .collect();
        let distinct: BTreeSet<&str> = texts.iter().map(String::as_str).collect();

        let vectors =
            resolve_embeddings(embedder, &self.cache, distinct, self.embed_concurrency).await?;

        for item in left.iter_mut() {
            if wanted(item, state.left(item.id)) {
                item.embedding = vectors.get(item.match_text()).cloned();
            }
        }
        for item in right.iter_mut() {
            if wanted(item, state.right(item.id)) {
                item.embedding = vectors.get(item.match_text()).cloned();
            }
        }
        Ok(())
    }
}

fn check_ids(side: Side, items: &[CatalogItem]) -> MatchResult<()> {
    match items.iter().enumerate().find(|(pos, item)| item.id.0 != *pos) {
        Some((position, item)) => Err(MatchError::ItemIdMismatch {
            side,
            position,
            id: item.id.0,
        }),
        None => Ok(()),
    }
}

fn select<'a>(items: &'a [CatalogItem], ids: impl Iterator<Item = ItemId>) -> Vec<&'a CatalogItem> {
    ids.map(|id| &items[id.0]).collect()
}

fn apply(state: &mut MatchState, outcome: &DedupOutcome) {
    for record in &outcome.kept {
        state.record_match(record);
    }
    for id in &outcome.claimed {
        state.claim_left(*id);
    }
}

fn summarize(proposed: usize, outcome: &DedupOutcome) -> PhaseSummary {
    PhaseSummary {
        proposed,
        accepted: outcome.kept.len(),
        claimed: outcome.claimed.len(),
    }
}

/// Moves the items with the given positional ids out of `items`, in id order.
fn take_items(items: Vec<CatalogItem>, ids: impl Iterator<Item = ItemId>) -> Vec<CatalogItem> {
    let mut slots: Vec<Option<CatalogItem>> = items.into_iter().map(Some).collect();
    ids.filter_map(|id| slots.get_mut(id.0).and_then(Option::take))
        .map(|mut item| {
            item.embedding = None;
            item
        })
        .collect()
}
