//! Providers are synchronous; these run them on tokio's blocking pool.
use anyhow::{Context, Result};
use std::sync::Arc;

use hkrag_core::config::{EmbeddingSettings, GenerationSettings};
use hkrag_core::traits::{Embedder, Generator};

pub async fn embed_query(embedder: &Arc<dyn Embedder>, text: &str) -> Result<Vec<f32>> {
    let embedder = Arc::clone(embedder);
    let text = text.to_string();
    tokio::task::spawn_blocking(move || embedder.embed_query(&text))
        .await
        .context("embedding task failed")?
}

pub async fn embed_batch(embedder: &Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    let embedder = Arc::clone(embedder);
    tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
        .await
        .context("embedding task failed")?
}

pub async fn generate(generator: &Arc<dyn Generator>, prompt: String) -> Result<String> {
    let generator = Arc::clone(generator);
    tokio::task::spawn_blocking(move || generator.generate(&prompt))
        .await
        .context("generation task failed")?
}

pub async fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || hkrag_embed::get_default_embedder(&settings))
        .await
        .context("embedder construction failed")?
}

pub async fn build_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    let settings = settings.clone();
    tokio::task::spawn_blocking(move || hkrag_llm::build_generator(&settings))
        .await
        .context("generator construction failed")?
}
