//! Embedding providers behind `hkrag_core::traits::Embedder`.
//!
//! - `cohere`: Cohere embed API (default; needs `COHERE_API_KEY`)
//! - `local`: BERT-family sentence encoder (all-MiniLM-L6-v2) run with candle
//! - `hash`: deterministic token-hash vectors for tests and offline development
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use hkrag_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use hkrag_core::traits::Embedder;

pub mod cohere;
pub mod hash;
pub mod local;
pub mod pool;
pub mod tokenize;

pub use cohere::CohereEmbedder;
pub use hash::HashEmbedder;
pub use local::LocalBertEmbedder;
pub use pool::masked_mean_l2;

/// Build the configured embedder. Missing credentials fail here, before any work.
///
/// Remote providers use a blocking HTTP client: call this outside of an async
/// context (or from `spawn_blocking`).
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProviderKind::Cohere => Arc::new(CohereEmbedder::new(
            settings.api_key.as_deref(),
            &settings.base_url,
            &settings.model,
            settings.dimension,
            settings.batch_size,
            Duration::from_secs(settings.timeout_secs.max(1)),
        )?),
        EmbeddingProviderKind::Local => {
            let dir = local::resolve_model_dir(settings.model_dir.as_deref().map(PathBuf::from))?;
            Arc::new(LocalBertEmbedder::new(&dir, &settings.model)?)
        }
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(settings.dimension)),
    };
    info!("Embedding provider: {} ({} dims)", embedder.embedder_id(), embedder.dim());
    Ok(embedder)
}
