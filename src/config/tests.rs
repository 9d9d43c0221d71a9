use super::*;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const ALL_VARS: &[&str] = &[
    "SKUMATCH_CACHE_DIR",
    "SKUMATCH_EMBEDDING_URL",
    "SKUMATCH_EMBEDDING_MODEL",
    "SKUMATCH_RERANKER_URL",
    "SKUMATCH_RERANKER_MODEL",
    "SKUMATCH_API_KEY",
    "SKUMATCH_TOP_K",
    "SKUMATCH_EMBED_BATCH_SIZE",
    "SKUMATCH_EMBED_CONCURRENCY",
    "SKUMATCH_RERANKER_BATCH_SIZE",
    "SKUMATCH_SIMILARITY_CHUNK_SIZE",
    "SKUMATCH_REQUEST_TIMEOUT_SECS",
    "SKUMATCH_LEFT_CATALOG",
    "SKUMATCH_RIGHT_CATALOG",
    "SKUMATCH_OUTPUT",
    "SKUMATCH_POLICY",
];

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    clear_skumatch_env();
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    clear_skumatch_env();
    result
}

fn clear_skumatch_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for key in ALL_VARS {
        unsafe { env::remove_var(key) };
    }
}

fn config_with_catalogs(dir: &TempDir) -> Config {
    let left = dir.path().join("left.json");
    let right = dir.path().join("right.json");
    std::fs::write(&left, "[]").unwrap();
    std::fs::write(&right, "[]").unwrap();
    Config {
        cache_dir: Some(dir.path().join("cache")),
        left_catalog: left,
        right_catalog: right,
        ..Default::default()
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.cache_dir, Some(PathBuf::from("./.skumatch-cache")));
    assert!(config.embedding_url.is_none());
    assert!(config.reranker_url.is_none());
    assert_eq!(config.top_k, None);
    assert_eq!(config.similarity_chunk_size, 500);
    assert_eq!(config.reranker_batch_size, 32);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert!(config.output.is_none());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_skumatch_env();
    let config = Config::from_env().expect("should parse with defaults");
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    let config = with_env_vars(
        &[
            ("SKUMATCH_CACHE_DIR", "/tmp/skumatch"),
            ("SKUMATCH_EMBEDDING_URL", "http://embed:8080"),
            ("SKUMATCH_EMBEDDING_MODEL", "bge-m3"),
            ("SKUMATCH_TOP_K", "12"),
            ("SKUMATCH_REQUEST_TIMEOUT_SECS", "5"),
            ("SKUMATCH_OUTPUT", "out.json"),
        ],
        Config::from_env,
    )
    .unwrap();

    assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/skumatch")));
    assert_eq!(config.embedding_url.as_deref(), Some("http://embed:8080"));
    assert_eq!(config.embedding_model.as_deref(), Some("bge-m3"));
    assert_eq!(config.top_k, Some(12));
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.output, Some(PathBuf::from("out.json")));
}

#[test]
#[serial]
fn test_empty_cache_dir_disables_persistence() {
    let config = with_env_vars(&[("SKUMATCH_CACHE_DIR", "  ")], Config::from_env).unwrap();
    assert!(config.cache_dir.is_none());
}

#[test]
#[serial]
fn test_from_env_rejects_bad_numbers() {
    let err = with_env_vars(&[("SKUMATCH_TOP_K", "many")], Config::from_env).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidNumber {
            name: "SKUMATCH_TOP_K",
            ..
        }
    ));

    let err = with_env_vars(&[("SKUMATCH_EMBED_BATCH_SIZE", "0")], Config::from_env).unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { value: 0, .. }));
}

#[test]
fn test_validate_accepts_existing_catalogs() {
    let dir = TempDir::new().unwrap();
    assert!(config_with_catalogs(&dir).validate().is_ok());
}

#[test]
fn test_validate_missing_catalog() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        left_catalog: dir.path().join("missing.json"),
        ..config_with_catalogs(&dir)
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));
}

#[test]
fn test_validate_cache_dir_is_file() {
    let dir = TempDir::new().unwrap();
    let config = config_with_catalogs(&dir);
    let config = Config {
        cache_dir: Some(config.left_catalog.clone()),
        ..config
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));
}

#[test]
fn test_validate_requires_model_with_endpoint() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        reranker_url: Some("http://rerank:8080".to_string()),
        ..config_with_catalogs(&dir)
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingEnvVar {
            name: "SKUMATCH_RERANKER_MODEL",
            ..
        })
    ));
}

#[test]
fn test_load_policy_defaults_and_top_k() {
    let config = Config {
        top_k: Some(7),
        ..Default::default()
    };
    let policy = config.load_policy().unwrap();
    assert_eq!(policy.top_k, 7);
    assert_eq!(policy.hard, MatchPolicy::default().hard);
}

#[test]
fn test_policy_file_top_k_kept_without_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, r#"{"top_k": 12}"#).unwrap();

    let config = Config {
        policy_path: Some(path.clone()),
        ..Default::default()
    };
    assert_eq!(config.load_policy().unwrap().top_k, 12);

    let config = Config {
        policy_path: Some(path),
        top_k: Some(5),
        ..Default::default()
    };
    assert_eq!(config.load_policy().unwrap().top_k, 5);
}

#[test]
#[serial]
fn test_unset_top_k_env_leaves_policy_default() {
    let config = with_env_vars(&[], Config::from_env).unwrap();
    assert_eq!(config.top_k, None);
    assert_eq!(
        config.load_policy().unwrap().top_k,
        MatchPolicy::default().top_k
    );
}

#[test]
fn test_load_policy_from_partial_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(
        &path,
        r#"{"share_right_pool": true, "soft": {"price_tolerance": 0.3}}"#,
    )
    .unwrap();

    let config = Config {
        policy_path: Some(path),
        ..Default::default()
    };
    let policy = config.load_policy().unwrap();
    assert!(policy.share_right_pool);
    assert_eq!(policy.soft.price_tolerance, 0.3);
    assert!(policy.fallback.is_some());
}

#[test]
fn test_partial_pass_keeps_its_own_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, r#"{"hard": {"scoring": {"composite_threshold": 0.7}}}"#).unwrap();

    let config = Config {
        policy_path: Some(path),
        ..Default::default()
    };
    let policy = config.load_policy().unwrap();
    let expected = MatchPolicy::default_hard();
    assert_eq!(policy.hard.scoring.composite_threshold, 0.7);
    assert_eq!(policy.hard.price_tolerance, expected.price_tolerance);
    assert_eq!(policy.hard.scoring.text_weight, expected.scoring.text_weight);
}

#[test]
fn test_null_fallback_disables_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, r#"{"fallback": null}"#).unwrap();

    let config = Config {
        policy_path: Some(path),
        ..Default::default()
    };
    assert!(config.load_policy().unwrap().fallback.is_none());
}

#[test]
fn test_load_policy_rejects_invalid_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, r#"{"hard": {"scoring": {"category_weight": 0.1}}}"#).unwrap();

    let config = Config {
        policy_path: Some(path),
        ..Default::default()
    };
    assert!(matches!(
        config.load_policy(),
        Err(ConfigError::InvalidPolicy(_))
    ));
}

#[test]
fn test_load_policy_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, "{not json").unwrap();

    let config = Config {
        policy_path: Some(path),
        ..Default::default()
    };
    assert!(matches!(
        config.load_policy(),
        Err(ConfigError::PolicyParse { .. })
    ));
}
