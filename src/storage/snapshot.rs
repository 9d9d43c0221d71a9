use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fd_lock::RwLock as FileLock;
use memmap2::Mmap;
use tempfile::Builder as TempBuilder;

use super::error::{StorageError, StorageResult};

/// Suffix of the per-writer temporary file a snapshot is written through.
pub const TEMP_SUFFIX: &str = "tmp";

/// Suffix of the advisory lock file guarding read-modify-write cycles.
pub const LOCK_SUFFIX: &str = "lock";

#[derive(Debug, Clone)]
/// A single snapshot file on disk.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn file_name(&self) -> OsString {
        self.path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default()
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.file_name();
        name.push(".");
        name.push(LOCK_SUFFIX);
        self.path.with_file_name(name)
    }

    fn ensure_dir(&self) -> StorageResult<()> {
        let dir = self.dir();
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|_| StorageError::DirCreationFailed {
                path: dir.to_path_buf(),
            })?;
        }
        Ok(())
    }

    /// Runs `f` while holding an exclusive advisory lock on the snapshot's lock file.
    ///
    /// Blocks until every other holder, in this or another process, has released it.
    pub fn with_exclusive_lock<R>(
        &self,
        f: impl FnOnce() -> StorageResult<R>,
    ) -> StorageResult<R> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())?;
        let mut lock = FileLock::new(file);
        let _guard = lock.write()?;
        f()
    }

    /// Maps the snapshot read-only. Returns `None` when it does not exist yet.
    ///
    /// The mapping is page aligned, which satisfies rkyv's alignment requirement.
    pub fn map(&self) -> StorageResult<Option<Mmap>> {
        if !self.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            return Err(StorageError::EmptySnapshot {
                path: self.path.clone(),
            });
        }

        // SAFETY: snapshots are only ever replaced via rename, never written in
        // place, so the mapped inode is not mutated while we hold the map.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Some(mmap))
    }

    /// Atomically replaces the snapshot with `bytes`. Returns the byte count written.
    ///
    /// Every call writes through its own uniquely named temporary file in the
    /// snapshot's directory, so concurrent writers never share a temp file.
    pub fn write_atomic(&self, bytes: &[u8]) -> StorageResult<u64> {
        self.ensure_dir()?;

        let mut temp = TempBuilder::new()
            .prefix(&self.file_name())
            .suffix(&format!(".{TEMP_SUFFIX}"))
            .tempfile_in(self.dir())?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(bytes.len() as u64)
    }
}
