use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by snapshot storage.
pub enum StorageError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The snapshot exists but is empty.
    #[error("snapshot is empty: {path}")]
    EmptySnapshot {
        /// Snapshot path.
        path: PathBuf,
    },

    /// The snapshot failed archive validation.
    #[error("snapshot at {path} is corrupt: {reason}")]
    Corrupt {
        /// Snapshot path.
        path: PathBuf,
        /// Validation message.
        reason: String,
    },

    /// Failed to create the snapshot directory.
    #[error("failed to create snapshot directory: {path}")]
    DirCreationFailed {
        /// Directory path.
        path: PathBuf,
    },
}

/// Convenience result type for snapshot operations.
pub type StorageResult<T> = Result<T, StorageError>;
