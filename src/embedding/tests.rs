use super::*;

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[tokio::test]
async fn test_hashing_embedder_is_deterministic_and_normalized() {
    let embedder = HashingEmbedder::new(128);
    let a = embedder.embed("colabrandx 500ml").await.unwrap();
    let b = embedder.embed("colabrandx 500ml").await.unwrap();

    assert_eq!(a, b);
    assert_eq!(a.len(), 128);
    let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_hashing_embedder_similar_texts_score_higher() {
    let embedder = HashingEmbedder::default();
    let base = embedder.embed("colabrandx 500ml").await.unwrap();
    let near = embedder.embed("colabrandx 330ml").await.unwrap();
    let far = embedder.embed("薯片 原味 12包").await.unwrap();

    assert!(cosine(&base, &near) > cosine(&base, &far));
}

#[tokio::test]
async fn test_hashing_embedder_empty_text_is_zero_vector() {
    let embedder = HashingEmbedder::new(16);
    let v = embedder.embed("").await.unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn test_hashing_embedder_identifier_includes_dimension() {
    assert_eq!(HashingEmbedder::new(64).model_identifier(), "hashing-ngram-64");
    assert_eq!(HashingEmbedder::new(0).dimension(), Some(1));
}

#[tokio::test]
async fn test_batch_matches_single() {
    let embedder = HashingEmbedder::default();
    let batch = embedder.embed_batch(&["a b", "c d"]).await.unwrap();
    assert_eq!(batch[1], embedder.embed("c d").await.unwrap());
}

#[tokio::test]
async fn test_mock_embedder_counts_and_fails_on_demand() {
    let embedder = MockEmbedder::new().with_vector("x", vec![1.0, 0.0]);
    assert_eq!(embedder.embed("x").await.unwrap(), vec![1.0, 0.0]);
    embedder.embed_batch(&["y", "z"]).await.unwrap();
    assert_eq!(embedder.texts_embedded(), 3);
    assert_eq!(embedder.batches(), 2);

    embedder.set_failing(true);
    assert!(embedder.embed("x").await.is_err());
}

#[test]
fn test_normalize_leaves_zero_vector() {
    let mut v = vec![0.0, 0.0];
    normalize(&mut v);
    assert_eq!(v, vec![0.0, 0.0]);

    let mut v = vec![3.0, 4.0];
    normalize(&mut v);
    assert!((v[0] - 0.6).abs() < 1e-6);
}

#[test]
fn test_http_embedder_config_validation() {
    assert!(HttpEmbedderConfig::new("http://localhost:8080/v1", "bge-m3")
        .validate()
        .is_ok());
    assert!(HttpEmbedderConfig::new("", "bge-m3").validate().is_err());
    assert!(HttpEmbedderConfig::new("http://x", " ").validate().is_err());
    assert!(HttpEmbedderConfig::new("http://x", "m")
        .with_batch_size(0)
        .validate()
        .is_err());
}

#[test]
fn test_http_embedder_uses_model_as_identifier() {
    let embedder =
        HttpEmbedder::new(HttpEmbedderConfig::new("http://localhost:8080/v1/", "bge-m3")).unwrap();
    assert_eq!(embedder.model_identifier(), "bge-m3");
    assert_eq!(embedder.max_batch_size(), crate::constants::DEFAULT_EMBED_BATCH_SIZE);
}

#[test]
fn test_endpoint_joins_path() {
    let endpoint = http::JsonEndpoint::new(
        "http://localhost:8080/v1/",
        "embeddings",
        Some("secret"),
        std::time::Duration::from_secs(1),
        0,
    )
    .unwrap();
    assert_eq!(endpoint.url(), "http://localhost:8080/v1/embeddings");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    let config = HttpEmbedderConfig::new("http://127.0.0.1:9/v1", "m")
        .with_timeout(std::time::Duration::from_millis(200));
    let mut config = config;
    config.max_retries = 0;
    let embedder = HttpEmbedder::new(config).unwrap();
    let err = embedder.embed("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::RequestFailed { .. }));
}
