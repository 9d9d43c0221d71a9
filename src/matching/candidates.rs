//! Grouping and candidate generation shared by the fuzzy passes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rayon::prelude::*;

use super::types::MatchPhase;
use crate::cache::{ArtifactCache, CacheResult, SimilarityMatrix};
use crate::catalog::{CatalogItem, bigram_similarity};
use crate::hashing::{CacheKey, canonical_axis, embedding_key, matrix_key};
use crate::scoring::PassPolicy;
use crate::similarity::{similarity_matrix, top_k};

/// Which fuzzy pass is running; decides how items are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Same `(category_l1, category_l3)`; both must be present.
    Hard,
    /// Same `category_l1`. Items without one form their own group.
    Soft,
    /// Same `category_l3`, ignoring `category_l1`; must be present.
    Fallback,
}

impl PassKind {
    pub fn phase(self) -> MatchPhase {
        match self {
            PassKind::Hard => MatchPhase::Hard,
            PassKind::Soft | PassKind::Fallback => MatchPhase::Soft,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PassKind::Hard => "hard",
            PassKind::Soft => "soft",
            PassKind::Fallback => "fallback",
        }
    }

    /// Group of `item` in this pass, or `None` if the pass cannot place it.
    fn group_key(self, item: &CatalogItem) -> Option<(&str, &str)> {
        match self {
            PassKind::Hard => (!item.category_l1.is_empty() && !item.category_l3.is_empty())
                .then_some((item.category_l1.as_str(), item.category_l3.as_str())),
            PassKind::Soft => Some((item.category_l1.as_str(), "")),
            PassKind::Fallback => {
                (!item.category_l3.is_empty()).then_some(("", item.category_l3.as_str()))
            }
        }
    }
}

/// Items of both sides that share a group key. Each side keeps input order.
#[derive(Debug)]
pub(crate) struct CandidateGroup<'a> {
    pub key: (&'a str, &'a str),
    pub left: Vec<&'a CatalogItem>,
    pub right: Vec<&'a CatalogItem>,
}

/// Groups both sides by `kind`'s key. Groups missing either side are dropped.
pub(crate) fn group_items<'a>(
    kind: PassKind,
    left: &[&'a CatalogItem],
    right: &[&'a CatalogItem],
) -> Vec<CandidateGroup<'a>> {
    type Sides<'a> = (Vec<&'a CatalogItem>, Vec<&'a CatalogItem>);
    let mut groups: BTreeMap<(&'a str, &'a str), Sides<'a>> = BTreeMap::new();

    for &item in left {
        if let Some(key) = kind.group_key(item) {
            groups.entry(key).or_default().0.push(item);
        }
    }
    for &item in right {
        if let Some(key) = kind.group_key(item)
            && let Some(sides) = groups.get_mut(&key)
        {
            sides.1.push(item);
        }
    }

    groups
        .into_iter()
        .filter(|(_, (l, r))| !l.is_empty() && !r.is_empty())
        .map(|(key, (left, right))| CandidateGroup { key, left, right })
        .collect()
}

/// How candidates are ranked before the top-K cut.
#[derive(Clone, Copy)]
pub(crate) enum RankingSource<'a> {
    /// Cosine similarity of attached embeddings, via cached matrices.
    Embedding {
        model: &'a str,
        cache: &'a ArtifactCache,
        chunk_size: usize,
    },
    /// Character bigram overlap of the normalized names.
    Lexical,
}

impl RankingSource<'_> {
    /// Row-major `left x right` ranking similarities of one group.
    pub(crate) fn group_similarity(&self, group: &CandidateGroup<'_>) -> CacheResult<Vec<f32>> {
        match *self {
            RankingSource::Lexical => Ok(group
                .left
                .par_iter()
                .flat_map_iter(|l| {
                    group
                        .right
                        .iter()
                        .map(move |r| bigram_similarity(l.match_text(), r.match_text()))
                })
                .collect()),
            RankingSource::Embedding {
                model,
                cache,
                chunk_size,
            } => {
                let row_keys = embedded_keys(model, &group.left);
                let col_keys = embedded_keys(model, &group.right);

                let matrix = cached_matrix(cache, model, group, &row_keys, &col_keys, chunk_size)?;
                let row_pos: Vec<Option<usize>> = row_keys
                    .iter()
                    .map(|k| k.as_ref().and_then(|k| matrix.row_index(k)))
                    .collect();
                let col_pos: Vec<Option<usize>> = col_keys
                    .iter()
                    .map(|k| k.as_ref().and_then(|k| matrix.col_index(k)))
                    .collect();

                let mut values = Vec::with_capacity(row_pos.len() * col_pos.len());
                for row in &row_pos {
                    for col in &col_pos {
                        values.push(match (row, col) {
                            (Some(r), Some(c)) => matrix.value(*r, *c),
                            _ => 0.0,
                        });
                    }
                }
                Ok(values)
            }
        }
    }
}

/// Embedding key of each item's text, or `None` for items without an embedding.
///
/// Items without a vector never reach the matrix, so they cannot shadow another
/// item with the same text or leave a zero row in a cached matrix.
fn embedded_keys(model: &str, items: &[&CatalogItem]) -> Vec<Option<CacheKey>> {
    items
        .iter()
        .map(|i| {
            i.embedding
                .is_some()
                .then(|| embedding_key(model, i.match_text()))
        })
        .collect()
}

/// Fetches the group's similarity matrix from the cache, computing it on a miss.
///
/// The matrix is built over the canonical (sorted, de-duplicated) axes of the
/// embedded items only, so any group embedding to the same texts reuses it.
fn cached_matrix(
    cache: &ArtifactCache,
    model: &str,
    group: &CandidateGroup<'_>,
    row_keys: &[Option<CacheKey>],
    col_keys: &[Option<CacheKey>],
    chunk_size: usize,
) -> CacheResult<Arc<SimilarityMatrix>> {
    let axis = |keys: &[Option<CacheKey>]| {
        canonical_axis(&keys.iter().flatten().copied().collect::<Vec<_>>())
    };
    let rows = axis(row_keys);
    let cols = axis(col_keys);
    if rows.is_empty() || cols.is_empty() {
        return Ok(Arc::new(SimilarityMatrix {
            rows,
            cols,
            values: Vec::new(),
        }));
    }

    let key = matrix_key(model, &rows, &cols);
    if let Some(matrix) = cache.lookup_matrix(&key)
        && matrix.rows == rows
        && matrix.cols == cols
    {
        return Ok(matrix);
    }

    let mut vectors: HashMap<CacheKey, &[f32]> = HashMap::new();
    for (keys, items) in [(row_keys, &group.left), (col_keys, &group.right)] {
        for (key, item) in keys.iter().zip(items.iter()) {
            if let (Some(key), Some(vector)) = (key, item.embedding.as_deref()) {
                vectors.entry(*key).or_insert(vector);
            }
        }
    }

    // Every axis key came from an embedded item, so each has a vector.
    let lookup = |k: &CacheKey| vectors.get(k).copied();
    let row_vecs: Vec<&[f32]> = rows.iter().filter_map(lookup).collect();
    let col_vecs: Vec<&[f32]> = cols.iter().filter_map(lookup).collect();
    let values = similarity_matrix(&row_vecs, &col_vecs, chunk_size);

    cache.store_matrix(key, SimilarityMatrix { rows, cols, values })
}

/// One surviving candidate of a left item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    /// Position in the group's right list.
    pub right: usize,
    /// Ranking similarity used for the top-K cut.
    pub ranking: f32,
}

/// Per left item of `group`: right items inside the price window (and brand
/// filter, always on for the fallback pass) with ranking similarity at least
/// `min_text_similarity`, cut to the `top_k` best and returned in right-side
/// order.
pub(crate) fn generate_candidates(
    kind: PassKind,
    group: &CandidateGroup<'_>,
    similarities: &[f32],
    policy: &PassPolicy,
    top_k_limit: usize,
) -> Vec<Vec<Candidate>> {
    let width = group.right.len();
    let exclude_equal_brands = kind == PassKind::Fallback || policy.exclude_equal_brands;
    group
        .left
        .par_iter()
        .enumerate()
        .map(|(li, left)| {
            let scored: Vec<(usize, f32)> = group
                .right
                .iter()
                .enumerate()
                .filter(|(_, right)| left.price_within(right, policy.price_tolerance))
                .filter(|(_, right)| !(exclude_equal_brands && left.brand_equals(right)))
                .map(|(ri, _)| (ri, similarities[li * width + ri]))
                .filter(|(_, sim)| *sim >= policy.min_text_similarity)
                .collect();

            let mut kept = top_k(scored, top_k_limit);
            kept.sort_unstable_by_key(|(ri, _)| *ri);
            kept.into_iter()
                .map(|(right, ranking)| Candidate { right, ranking })
                .collect()
        })
        .collect()
}
