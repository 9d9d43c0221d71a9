//! Skumatch batch entrypoint.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mimalloc::MiMalloc;

use skumatch::cache::ArtifactCache;
use skumatch::catalog::CatalogRecord;
use skumatch::config::Config;
use skumatch::embedding::{
    EmbeddingProvider, HashingEmbedder, HttpEmbedder, HttpEmbedderConfig, HttpReranker,
    RerankerConfig,
};
use skumatch::matching::MatchPipeline;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let policy = config.load_policy()?;

    let cache = Arc::new(match &config.cache_dir {
        Some(dir) => ArtifactCache::open(dir)?,
        None => ArtifactCache::in_memory(),
    });

    let embedder: Arc<dyn EmbeddingProvider> =
        match (&config.embedding_url, &config.embedding_model) {
            (Some(url), Some(model)) => {
                let mut embed_config = HttpEmbedderConfig::new(url.clone(), model.clone())
                    .with_batch_size(config.embed_batch_size)
                    .with_timeout(config.request_timeout);
                if let Some(key) = &config.api_key {
                    embed_config = embed_config.with_api_key(key.clone());
                }
                Arc::new(HttpEmbedder::new(embed_config)?)
            }
            _ => {
                tracing::warn!(
                    "No SKUMATCH_EMBEDDING_URL configured, using the offline hashing embedder"
                );
                Arc::new(HashingEmbedder::default())
            }
        };

    let mut pipeline = MatchPipeline::new(cache.clone(), policy)?
        .with_embedder(embedder)
        .with_similarity_chunk_size(config.similarity_chunk_size)
        .with_embed_concurrency(config.embed_concurrency);

    if let (Some(url), Some(model)) = (&config.reranker_url, &config.reranker_model) {
        let mut rerank_config = RerankerConfig::new(url.clone(), model.clone())
            .with_batch_size(config.reranker_batch_size)
            .with_timeout(config.request_timeout);
        if let Some(key) = &config.api_key {
            rerank_config = rerank_config.with_api_key(key.clone());
        }
        pipeline = pipeline.with_reranker(Arc::new(HttpReranker::new(rerank_config)?));
    }

    let left = read_catalog(&config.left_catalog)?;
    let right = read_catalog(&config.right_catalog)?;

    tracing::info!(
        left = left.len(),
        right = right.len(),
        text_signal = ?pipeline.text_signal(),
        "Skumatch starting"
    );

    let output = pipeline.run_records(left, right).await?;

    let report = pipeline.persist_cache();
    if !report.all_ok() {
        tracing::warn!(?report, "Some cache artifacts were not persisted");
    }

    let json = serde_json::to_vec_pretty(&output)?;
    match &config.output {
        Some(path) => fs::write(path, &json)
            .with_context(|| format!("failed to write output to {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&json)?;
            stdout.write_all(b"\n")?;
        }
    }

    tracing::info!(
        matches = output.matches.len(),
        left_unique = output.left_unique.len(),
        right_unique = output.right_unique.len(),
        claimed = output.claimed_left.len(),
        "Skumatch complete"
    );
    Ok(())
}

fn read_catalog(path: &Path) -> anyhow::Result<Vec<CatalogRecord>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
