//! Text generation providers behind `hkrag_core::traits::Generator`.
//!
//! Both clients are blocking (`reqwest::blocking`); async callers run them in
//! `spawn_blocking`. A failed request is returned as an error, never retried.
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use hkrag_core::config::{GenerationProviderKind, GenerationSettings};
use hkrag_core::traits::Generator;

pub mod cohere;
pub mod ollama;

pub use cohere::CohereGenerator;
pub use ollama::OllamaGenerator;

/// Sampling parameters shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl From<&GenerationSettings> for SamplingParams {
    fn from(s: &GenerationSettings) -> Self {
        Self { temperature: s.temperature, max_tokens: s.max_tokens }
    }
}

pub fn build_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    let timeout = Duration::from_secs(settings.timeout_secs.max(1));
    let params = SamplingParams::from(settings);
    let generator: Arc<dyn Generator> = match settings.provider {
        GenerationProviderKind::Cohere => Arc::new(CohereGenerator::new(
            settings.api_key.as_deref(),
            settings.base_url(),
            settings.model(),
            params,
            timeout,
        )?),
        GenerationProviderKind::Ollama => {
            Arc::new(OllamaGenerator::new(settings.base_url(), settings.model(), params, timeout)?)
        }
    };
    info!("Generation model: {}", generator.model_id());
    Ok(generator)
}
