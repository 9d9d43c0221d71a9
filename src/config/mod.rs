//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `SKUMATCH_*` environment variables.
//! Weights and thresholds are not environment variables: they live in an
//! optional JSON [`MatchPolicy`] file named by `SKUMATCH_POLICY`.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBED_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RERANKER_BATCH_SIZE, DEFAULT_SIMILARITY_CHUNK_SIZE, DEFAULT_TOP_K,
};
use crate::scoring::MatchPolicy;

/// Run configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `SKUMATCH_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the artifact snapshots. `None` keeps the cache in memory.
    /// Default: `./.skumatch-cache`.
    pub cache_dir: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible embeddings endpoint.
    pub embedding_url: Option<String>,

    /// Model identifier sent to the embedding endpoint and used in cache keys.
    pub embedding_model: Option<String>,

    /// Base URL of a `/rerank` endpoint.
    pub reranker_url: Option<String>,

    /// Model identifier of the reranker.
    pub reranker_model: Option<String>,

    /// Bearer token for both endpoints.
    pub api_key: Option<String>,

    /// Candidates kept per left item. Overrides the policy's `top_k` when set;
    /// otherwise the policy file (or its default of `30`) decides.
    pub top_k: Option<usize>,

    /// Texts per embedding request. Default: `64`.
    pub embed_batch_size: usize,

    /// Embedding requests in flight. Default: `4`.
    pub embed_concurrency: usize,

    /// Pairs per reranker request. Default: `32`.
    pub reranker_batch_size: usize,

    /// Rows per similarity-matrix chunk. Default: `500`.
    pub similarity_chunk_size: usize,

    /// Provider request timeout. Default: `30s`.
    pub request_timeout: Duration,

    /// JSON array of catalog records for the left side.
    pub left_catalog: PathBuf,

    /// JSON array of catalog records for the right side.
    pub right_catalog: PathBuf,

    /// Where the match output is written. `None` writes to stdout.
    pub output: Option<PathBuf>,

    /// Optional JSON match policy. Missing fields take their defaults.
    pub policy_path: Option<PathBuf>,
}

/// Default cache directory used when `SKUMATCH_CACHE_DIR` is not set.
pub const DEFAULT_CACHE_DIR: &str = "./.skumatch-cache";

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from(DEFAULT_CACHE_DIR)),
            embedding_url: None,
            embedding_model: None,
            reranker_url: None,
            reranker_model: None,
            api_key: None,
            top_k: None,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
            reranker_batch_size: DEFAULT_RERANKER_BATCH_SIZE,
            similarity_chunk_size: DEFAULT_SIMILARITY_CHUNK_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            left_catalog: PathBuf::from("left.json"),
            right_catalog: PathBuf::from("right.json"),
            output: None,
            policy_path: None,
        }
    }
}

impl Config {
    const ENV_CACHE_DIR: &'static str = "SKUMATCH_CACHE_DIR";
    const ENV_EMBEDDING_URL: &'static str = "SKUMATCH_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "SKUMATCH_EMBEDDING_MODEL";
    const ENV_RERANKER_URL: &'static str = "SKUMATCH_RERANKER_URL";
    const ENV_RERANKER_MODEL: &'static str = "SKUMATCH_RERANKER_MODEL";
    const ENV_API_KEY: &'static str = "SKUMATCH_API_KEY";
    const ENV_TOP_K: &'static str = "SKUMATCH_TOP_K";
    const ENV_EMBED_BATCH_SIZE: &'static str = "SKUMATCH_EMBED_BATCH_SIZE";
    const ENV_EMBED_CONCURRENCY: &'static str = "SKUMATCH_EMBED_CONCURRENCY";
    const ENV_RERANKER_BATCH_SIZE: &'static str = "SKUMATCH_RERANKER_BATCH_SIZE";
    const ENV_SIMILARITY_CHUNK_SIZE: &'static str = "SKUMATCH_SIMILARITY_CHUNK_SIZE";
    const ENV_REQUEST_TIMEOUT_SECS: &'static str = "SKUMATCH_REQUEST_TIMEOUT_SECS";
    const ENV_LEFT_CATALOG: &'static str = "SKUMATCH_LEFT_CATALOG";
    const ENV_RIGHT_CATALOG: &'static str = "SKUMATCH_RIGHT_CATALOG";
    const ENV_OUTPUT: &'static str = "SKUMATCH_OUTPUT";
    const ENV_POLICY: &'static str = "SKUMATCH_POLICY";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// Setting `SKUMATCH_CACHE_DIR` to an empty string disables persistence.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_dir = match env::var(Self::ENV_CACHE_DIR) {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value.trim())),
            Err(_) => defaults.cache_dir,
        };

        let top_k = match env::var(Self::ENV_TOP_K) {
            Ok(_) => Some(Self::parse_count_from_env(Self::ENV_TOP_K, DEFAULT_TOP_K)?),
            Err(_) => None,
        };
        let embed_batch_size =
            Self::parse_count_from_env(Self::ENV_EMBED_BATCH_SIZE, defaults.embed_batch_size)?;
        let embed_concurrency =
            Self::parse_count_from_env(Self::ENV_EMBED_CONCURRENCY, defaults.embed_concurrency)?;
        let reranker_batch_size = Self::parse_count_from_env(
            Self::ENV_RERANKER_BATCH_SIZE,
            defaults.reranker_batch_size,
        )?;
        let similarity_chunk_size = Self::parse_count_from_env(
            Self::ENV_SIMILARITY_CHUNK_SIZE,
            defaults.similarity_chunk_size,
        )?;
        let timeout_secs = Self::parse_count_from_env(
            Self::ENV_REQUEST_TIMEOUT_SECS,
            defaults.request_timeout.as_secs() as usize,
        )?;

        Ok(Self {
            cache_dir,
            embedding_url: Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_URL),
            embedding_model: Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_MODEL),
            reranker_url: Self::parse_optional_string_from_env(Self::ENV_RERANKER_URL),
            reranker_model: Self::parse_optional_string_from_env(Self::ENV_RERANKER_MODEL),
            api_key: Self::parse_optional_string_from_env(Self::ENV_API_KEY),
            top_k,
            embed_batch_size,
            embed_concurrency,
            reranker_batch_size,
            similarity_chunk_size,
            request_timeout: Duration::from_secs(timeout_secs as u64),
            left_catalog: Self::parse_path_from_env(Self::ENV_LEFT_CATALOG, defaults.left_catalog),
            right_catalog: Self::parse_path_from_env(
                Self::ENV_RIGHT_CATALOG,
                defaults.right_catalog,
            ),
            output: Self::parse_optional_path_from_env(Self::ENV_OUTPUT),
            policy_path: Self::parse_optional_path_from_env(Self::ENV_POLICY),
        })
    }

    /// Validates paths and provider settings (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.cache_dir
            && dir.exists()
            && !dir.is_dir()
        {
            return Err(ConfigError::NotADirectory { path: dir.clone() });
        }

        for path in [&self.left_catalog, &self.right_catalog] {
            Self::require_file(path)?;
        }
        if let Some(path) = &self.policy_path {
            Self::require_file(path)?;
        }

        Self::require_pair(
            &self.embedding_url,
            Self::ENV_EMBEDDING_URL,
            &self.embedding_model,
            Self::ENV_EMBEDDING_MODEL,
        )?;
        Self::require_pair(
            &self.reranker_url,
            Self::ENV_RERANKER_URL,
            &self.reranker_model,
            Self::ENV_RERANKER_MODEL,
        )?;

        Ok(())
    }

    /// Reads the policy file (or the default policy), applies a configured `top_k`
    /// and validates it.
    pub fn load_policy(&self) -> Result<MatchPolicy, ConfigError> {
        let policy = match &self.policy_path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::PolicyRead {
                    path: path.clone(),
                    source,
                })?;
                let parse_err = |source| ConfigError::PolicyParse {
                    path: path.clone(),
                    source,
                };
                // Overlay onto the serialized defaults so a partially specified
                // pass keeps that pass's own defaults.
                let patch: serde_json::Value = serde_json::from_str(&raw).map_err(parse_err)?;
                let mut merged =
                    serde_json::to_value(MatchPolicy::default()).map_err(parse_err)?;
                overlay(&mut merged, patch);
                serde_json::from_value::<MatchPolicy>(merged).map_err(parse_err)?
            }
            None => MatchPolicy::default(),
        };

        let policy = match self.top_k {
            Some(top_k) => policy.with_top_k(top_k),
            None => policy,
        };
        policy.validate()?;
        Ok(policy)
    }

    fn require_file(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn require_pair(
        url: &Option<String>,
        url_name: &'static str,
        model: &Option<String>,
        model_name: &'static str,
    ) -> Result<(), ConfigError> {
        match (url, model) {
            (Some(_), None) => Err(ConfigError::MissingEnvVar {
                name: model_name,
                requires: url_name,
            }),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar {
                name: url_name,
                requires: model_name,
            }),
            _ => Ok(()),
        }
    }

    fn parse_count_from_env(name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(name) {
            Ok(value) => {
                let parsed: u64 =
                    value
                        .trim()
                        .parse()
                        .map_err(|source| ConfigError::InvalidNumber {
                            name,
                            value: value.clone(),
                            source,
                        })?;
                if parsed == 0 {
                    return Err(ConfigError::OutOfRange {
                        name,
                        value: parsed,
                        min: 1,
                    });
                }
                Ok(parsed as usize)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        Self::parse_optional_string_from_env(var_name).map(PathBuf::from)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Recursively replaces fields of `base` with those present in `patch`.
fn overlay(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) if !slot.is_null() => overlay(slot, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
