//! On-disk snapshot files for the artifact cache.
//!
//! A snapshot is a single `rkyv` archive read through a read-only memory map and
//! replaced atomically (unique `<name>*.tmp` + fsync + rename). Read-merge-write
//! cycles hold an advisory lock on `<name>.lock`. Callers own the archive
//! types; this module only moves bytes.

pub mod error;
mod snapshot;


pub use error::{StorageError, StorageResult};
pub use snapshot::{LOCK_SUFFIX, SnapshotFile, TEMP_SUFFIX};
