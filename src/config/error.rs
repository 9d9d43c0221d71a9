//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::scoring::PolicyError;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A numeric variable parsed but is outside its allowed range.
    #[error("{name} must be at least {min}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
    },

    /// A model identifier was given without an endpoint, or the reverse.
    #[error("{name} is required when {requires} is set")]
    MissingEnvVar {
        name: &'static str,
        requires: &'static str,
    },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// The policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    PolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The policy file is not valid JSON for a match policy.
    #[error("failed to parse policy file {path}: {source}")]
    PolicyParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The loaded policy failed validation.
    #[error("invalid match policy: {0}")]
    InvalidPolicy(#[from] PolicyError),
}
