use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{CacheError, CacheResult};
use super::types::{
    Artifact, ArtifactKind, CacheStats, EmbeddingArtifact, KindStats, PersistOutcome,
    PersistReport, RerankerScore, SimilarityMatrix,
};
use crate::hashing::CacheKey;
use crate::storage::{SnapshotFile, StorageError, StorageResult};

/// Per-kind snapshot encoding plus the source identity used for collision checks.
pub(super) trait SnapshotCodec: Clone + Send + Sync + Sized + 'static {
    const KIND: ArtifactKind;

    /// `true` when both artifacts were computed from the same content.
    fn same_source(&self, other: &Self) -> bool;

    /// Why the artifact is internally inconsistent, if it is.
    fn shape_error(&self) -> Option<String>;

    fn encode(entries: &BTreeMap<CacheKey, Self>) -> StorageResult<AlignedVec>;

    fn decode(path: &Path, bytes: &[u8]) -> StorageResult<Vec<(CacheKey, Self)>>;
}

macro_rules! snapshot_codec {
    ($record:ident, $artifact:ty, $kind:expr, |$a:ident, $b:ident| $same:expr, $shape:expr) => {
        #[derive(Archive, Serialize, Deserialize)]
        struct $record {
            key: CacheKey,
            artifact: $artifact,
        }

        impl SnapshotCodec for $artifact {
            const KIND: ArtifactKind = $kind;

            fn same_source(&self, other: &Self) -> bool {
                let ($a, $b) = (self, other);
                $same
            }

            fn shape_error(&self) -> Option<String> {
                ($shape)(self)
            }

            fn encode(entries: &BTreeMap<CacheKey, Self>) -> StorageResult<AlignedVec> {
                let records: Vec<$record> = entries
                    .iter()
                    .map(|(key, artifact)| $record {
                        key: *key,
                        artifact: artifact.clone(),
                    })
                    .collect();
                rkyv::to_bytes::<RkyvError>(&records)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            }

            fn decode(path: &Path, bytes: &[u8]) -> StorageResult<Vec<(CacheKey, Self)>> {
                let records = rkyv::from_bytes::<Vec<$record>, RkyvError>(bytes).map_err(|e| {
                    StorageError::Corrupt {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                })?;
                records
                    .into_iter()
                    .map(|r| match r.artifact.shape_error() {
                        Some(reason) => Err(StorageError::Corrupt {
                            path: path.to_path_buf(),
                            reason: format!("entry {}: {reason}", r.key),
                        }),
                        None => Ok((r.key, r.artifact)),
                    })
                    .collect()
            }
        }
    };
}

snapshot_codec!(
    EmbeddingRecord,
    EmbeddingArtifact,
    ArtifactKind::Embedding,
    |a, b| a.text == b.text,
    |_| None
);
snapshot_codec!(
    MatrixRecord,
    SimilarityMatrix,
    ArtifactKind::SimilarityMatrix,
    |a, b| a.rows == b.rows && a.cols == b.cols,
    SimilarityMatrix::shape_error
);
snapshot_codec!(
    RerankerRecord,
    RerankerScore,
    ArtifactKind::RerankerScore,
    |a, b| a.text_a == b.text_a && a.text_b == b.text_b,
    |_| None
);

struct KindEntries<T> {
    entries: HashMap<CacheKey, Arc<T>>,
    /// Keys inserted since the last successful persist.
    dirty: HashSet<CacheKey>,
}

struct KindStore<T> {
    inner: RwLock<KindEntries<T>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: SnapshotCodec> KindStore<T> {
    fn with_entries(entries: HashMap<CacheKey, Arc<T>>) -> Self {
        Self {
            inner: RwLock::new(KindEntries {
                entries,
                dirty: HashSet::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn empty() -> Self {
        Self::with_entries(HashMap::new())
    }

    /// Loads the on-disk snapshot. Unreadable snapshots are logged and start empty.
    fn load(dir: &Path) -> Self {
        let file = SnapshotFile::new(dir.join(T::KIND.snapshot_filename()));
        match read_snapshot::<T>(&file) {
            Ok(records) => {
                let entries: HashMap<_, _> = records
                    .into_iter()
                    .map(|(key, artifact)| (key, Arc::new(artifact)))
                    .collect();
                debug!(
                    kind = %T::KIND,
                    entries = entries.len(),
                    path = %file.path().display(),
                    "Loaded artifact snapshot"
                );
                Self::with_entries(entries)
            }
            Err(e) => {
                warn!(
                    kind = %T::KIND,
                    path = %file.path().display(),
                    error = %e,
                    "Artifact snapshot unreadable; starting empty"
                );
                Self::empty()
            }
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        let found = self.inner.read().entries.get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn insert(&self, key: CacheKey, artifact: T) -> CacheResult<Arc<T>> {
        if let Some(reason) = artifact.shape_error() {
            return Err(CacheError::Malformed {
                kind: T::KIND,
                key,
                reason,
            });
        }
        let mut guard = self.inner.write();
        if let Some(existing) = guard.entries.get(&key)
            && !existing.same_source(&artifact)
        {
            return Err(CacheError::KeyCollision {
                kind: T::KIND,
                key,
            });
        }
        let artifact = Arc::new(artifact);
        guard.entries.insert(key, Arc::clone(&artifact));
        guard.dirty.insert(key);
        Ok(artifact)
    }

    fn stats(&self) -> KindStats {
        let guard = self.inner.read();
        KindStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: guard.entries.len(),
            pending: guard.dirty.len(),
        }
    }

    fn pending(&self) -> Vec<(CacheKey, Arc<T>)> {
        let guard = self.inner.read();
        guard
            .dirty
            .iter()
            .filter_map(|key| guard.entries.get(key).map(|a| (*key, Arc::clone(a))))
            .collect()
    }

    fn mark_persisted(&self, keys: impl IntoIterator<Item = CacheKey>) {
        let mut guard = self.inner.write();
        for key in keys {
            guard.dirty.remove(&key);
        }
    }

    fn persist(&self, dir: Option<&Path>) -> PersistOutcome {
        let Some(dir) = dir else {
            return PersistOutcome::Skipped;
        };
        let pending = self.pending();
        if pending.is_empty() {
            return PersistOutcome::Skipped;
        }

        let file = SnapshotFile::new(dir.join(T::KIND.snapshot_filename()));
        match merge_and_write::<T>(&file, &pending) {
            Ok((entries, bytes)) => {
                self.mark_persisted(pending.iter().map(|(key, _)| *key));
                info!(
                    kind = %T::KIND,
                    new = pending.len(),
                    entries,
                    bytes,
                    "Persisted artifact snapshot"
                );
                PersistOutcome::Written { entries, bytes }
            }
            Err(e) => {
                warn!(
                    kind = %T::KIND,
                    path = %file.path().display(),
                    error = %e,
                    "Failed to persist artifact snapshot"
                );
                PersistOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn read_snapshot<T: SnapshotCodec>(file: &SnapshotFile) -> StorageResult<Vec<(CacheKey, T)>> {
    match file.map() {
        Ok(Some(mmap)) => T::decode(file.path(), &mmap),
        Ok(None) | Err(StorageError::EmptySnapshot { .. }) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Union-overwrites the on-disk store with `pending` and atomically writes it back.
///
/// The read-merge-write cycle runs under the snapshot's exclusive file lock, so
/// concurrent persists against the same directory serialize instead of dropping
/// each other's entries.
fn merge_and_write<T: SnapshotCodec>(
    file: &SnapshotFile,
    pending: &[(CacheKey, Arc<T>)],
) -> StorageResult<(usize, u64)> {
    file.with_exclusive_lock(|| {
        let mut merged: BTreeMap<CacheKey, T> = read_snapshot::<T>(file)?.into_iter().collect();
        for (key, artifact) in pending {
            merged.insert(*key, T::clone(artifact));
        }
        let bytes = T::encode(&merged)?;
        let written = file.write_atomic(&bytes)?;
        Ok((merged.len(), written))
    })
}

/// Content-addressed store for embeddings, similarity matrices and reranker scores.
///
/// Shared by reference across a run (wrap in [`Arc`]). All methods take `&self`;
/// each kind has its own lock so phases can populate them concurrently.
pub struct ArtifactCache {
    dir: Option<PathBuf>,
    embeddings: KindStore<EmbeddingArtifact>,
    matrices: KindStore<SimilarityMatrix>,
    reranker_scores: KindStore<RerankerScore>,
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("dir", &self.dir)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ArtifactCache {
    /// Opens (or creates) a cache backed by snapshots in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|_| StorageError::DirCreationFailed { path: dir.clone() })?;
        }

        let cache = Self {
            embeddings: KindStore::load(&dir),
            matrices: KindStore::load(&dir),
            reranker_scores: KindStore::load(&dir),
            dir: Some(dir),
        };

        let stats = cache.stats();
        info!(
            dir = ?cache.dir,
            embeddings = stats.embedding.entries,
            matrices = stats.similarity_matrix.entries,
            reranker_scores = stats.reranker_score.entries,
            "Artifact cache opened"
        );
        Ok(cache)
    }

    /// A cache with no backing directory. [`persist`](Self::persist) is a no-op.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            embeddings: KindStore::empty(),
            matrices: KindStore::empty(),
            reranker_scores: KindStore::empty(),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Looks up an artifact of `kind`. Counts a hit or a miss.
    pub fn get(&self, kind: ArtifactKind, key: &CacheKey) -> Option<Artifact> {
        match kind {
            ArtifactKind::Embedding => self
                .lookup_embedding(key)
                .map(|a| Artifact::Embedding(EmbeddingArtifact::clone(&a))),
            ArtifactKind::SimilarityMatrix => self
                .lookup_matrix(key)
                .map(|a| Artifact::SimilarityMatrix(SimilarityMatrix::clone(&a))),
            ArtifactKind::RerankerScore => self
                .lookup_reranker_score(key)
                .map(|a| Artifact::RerankerScore(RerankerScore::clone(&a))),
        }
    }

    /// Stores an artifact of `kind`.
    ///
    /// Fails with [`CacheError::KindMismatch`] if the variant is of another kind and
    /// with [`CacheError::KeyCollision`] if `key` already holds an artifact computed
    /// from different content.
    pub fn set(&self, kind: ArtifactKind, key: CacheKey, artifact: Artifact) -> CacheResult<()> {
        let actual = artifact.kind();
        if actual != kind {
            return Err(CacheError::KindMismatch {
                expected: kind,
                actual,
            });
        }
        match artifact {
            Artifact::Embedding(a) => self.store_embedding(key, a).map(drop),
            Artifact::SimilarityMatrix(a) => self.store_matrix(key, a).map(drop),
            Artifact::RerankerScore(a) => self.store_reranker_score(key, a).map(drop),
        }
    }

    pub fn lookup_embedding(&self, key: &CacheKey) -> Option<Arc<EmbeddingArtifact>> {
        self.embeddings.get(key)
    }

    pub fn store_embedding(
        &self,
        key: CacheKey,
        artifact: EmbeddingArtifact,
    ) -> CacheResult<Arc<EmbeddingArtifact>> {
        self.embeddings.insert(key, artifact)
    }

    pub fn lookup_matrix(&self, key: &CacheKey) -> Option<Arc<SimilarityMatrix>> {
        self.matrices.get(key)
    }

    pub fn store_matrix(
        &self,
        key: CacheKey,
        matrix: SimilarityMatrix,
    ) -> CacheResult<Arc<SimilarityMatrix>> {
        self.matrices.insert(key, matrix)
    }

    pub fn lookup_reranker_score(&self, key: &CacheKey) -> Option<Arc<RerankerScore>> {
        self.reranker_scores.get(key)
    }

    pub fn store_reranker_score(
        &self,
        key: CacheKey,
        score: RerankerScore,
    ) -> CacheResult<Arc<RerankerScore>> {
        self.reranker_scores.insert(key, score)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            embedding: self.embeddings.stats(),
            similarity_matrix: self.matrices.stats(),
            reranker_score: self.reranker_scores.stats(),
        }
    }

    /// Merge-on-save of everything stored since the last persist.
    ///
    /// Each kind is handled independently: the current on-disk store is re-read,
    /// overlaid with this process's new entries and atomically replaced. A failure
    /// is logged and reported for that kind only; the previous file is left intact
    /// and the entries stay pending.
    pub fn persist(&self) -> PersistReport {
        let dir = self.dir.as_deref();
        PersistReport {
            embedding: self.embeddings.persist(dir),
            similarity_matrix: self.matrices.persist(dir),
            reranker_score: self.reranker_scores.persist(dir),
        }
    }
}
