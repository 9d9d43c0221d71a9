use rkyv::{Archive, Deserialize, Serialize};

use crate::constants::{
    EMBEDDING_SNAPSHOT_FILENAME, MATRIX_SNAPSHOT_FILENAME, RERANKER_SNAPSHOT_FILENAME,
};
use crate::hashing::CacheKey;

/// The three independent artifact stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Embedding,
    SimilarityMatrix,
    RerankerScore,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Embedding,
        ArtifactKind::SimilarityMatrix,
        ArtifactKind::RerankerScore,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Embedding => "embedding",
            ArtifactKind::SimilarityMatrix => "similarity_matrix",
            ArtifactKind::RerankerScore => "reranker_score",
        }
    }

    #[inline]
    pub fn snapshot_filename(&self) -> &'static str {
        match self {
            ArtifactKind::Embedding => EMBEDDING_SNAPSHOT_FILENAME,
            ArtifactKind::SimilarityMatrix => MATRIX_SNAPSHOT_FILENAME,
            ArtifactKind::RerankerScore => RERANKER_SNAPSHOT_FILENAME,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedding vector together with the text it was computed from.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EmbeddingArtifact {
    pub text: String,
    pub vector: Vec<f32>,
}

/// Row-major cosine similarity matrix between two canonical key axes.
///
/// Axes are sorted and de-duplicated (see [`crate::hashing::canonical_axis`]), so a
/// matrix can be reused by any item set that embeds to the same texts.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    pub rows: Vec<CacheKey>,
    pub cols: Vec<CacheKey>,
    pub values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Returns `None` if `values` does not match the axis lengths.
    pub fn new(rows: Vec<CacheKey>, cols: Vec<CacheKey>, values: Vec<f32>) -> Option<Self> {
        let matrix = Self { rows, cols, values };
        matrix.shape_error().is_none().then_some(matrix)
    }

    /// Describes the mismatch when `values` is not `rows x cols` long.
    pub fn shape_error(&self) -> Option<String> {
        let expected = self.rows.len().checked_mul(self.cols.len());
        (expected != Some(self.values.len())).then(|| {
            format!(
                "{} values for a {}x{} matrix",
                self.values.len(),
                self.rows.len(),
                self.cols.len()
            )
        })
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.cols.len() + col]
    }

    pub fn row_index(&self, key: &CacheKey) -> Option<usize> {
        self.rows.binary_search(key).ok()
    }

    pub fn col_index(&self, key: &CacheKey) -> Option<usize> {
        self.cols.binary_search(key).ok()
    }
}

/// Raw (pre-sigmoid) reranker score for a text pair in canonical order.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RerankerScore {
    pub text_a: String,
    pub text_b: String,
    pub score: f32,
}

/// Any cached artifact. The variant determines its [`ArtifactKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Embedding(EmbeddingArtifact),
    SimilarityMatrix(SimilarityMatrix),
    RerankerScore(RerankerScore),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Embedding(_) => ArtifactKind::Embedding,
            Artifact::SimilarityMatrix(_) => ArtifactKind::SimilarityMatrix,
            Artifact::RerankerScore(_) => ArtifactKind::RerankerScore,
        }
    }
}

/// Hit/miss counters and sizes for one artifact kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct KindStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries held in memory.
    pub entries: usize,
    /// Entries written this run and not yet persisted.
    pub pending: usize,
}

impl KindStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Per-kind statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub embedding: KindStats,
    pub similarity_matrix: KindStats,
    pub reranker_score: KindStats,
}

impl CacheStats {
    pub fn get(&self, kind: ArtifactKind) -> KindStats {
        match kind {
            ArtifactKind::Embedding => self.embedding,
            ArtifactKind::SimilarityMatrix => self.similarity_matrix,
            ArtifactKind::RerankerScore => self.reranker_score,
        }
    }
}

/// Result of persisting one artifact kind.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// Nothing new to write, or no backing directory.
    Skipped,
    /// Merged store written.
    Written { entries: usize, bytes: u64 },
    /// Write failed; the on-disk store was left untouched.
    Failed { reason: String },
}

/// Outcome of [`ArtifactCache::persist`](super::ArtifactCache::persist) per kind.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PersistReport {
    pub embedding: PersistOutcome,
    pub similarity_matrix: PersistOutcome,
    pub reranker_score: PersistOutcome,
}

impl PersistReport {
    pub fn get(&self, kind: ArtifactKind) -> &PersistOutcome {
        match kind {
            ArtifactKind::Embedding => &self.embedding,
            ArtifactKind::SimilarityMatrix => &self.similarity_matrix,
            ArtifactKind::RerankerScore => &self.reranker_score,
        }
    }

    pub fn all_ok(&self) -> bool {
        ArtifactKind::ALL
            .iter()
            .all(|k| !matches!(self.get(*k), PersistOutcome::Failed { .. }))
    }
}
