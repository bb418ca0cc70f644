//! Cohere embed API client (`POST /v1/embed`).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use hkrag_core::config::COHERE_API_KEY_VAR;
use hkrag_core::error::Error;
use hkrag_core::traits::Embedder;

pub const API_KEY_HINT: &str = "set COHERE_API_KEY (free keys at https://dashboard.cohere.com/api-keys)";

/// Cohere distinguishes stored passages from search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    SearchDocument,
    SearchQuery,
}

/// Blocking client. A request failure surfaces as an error; there are no retries.
pub struct CohereEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
    batch_size: usize,
    id: String,
}

impl CohereEmbedder {
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        model: &str,
        dim: usize,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = match api_key.map(str::trim) {
            Some(k) if !k.is_empty() => k,
            _ => {
                return Err(Error::MissingCredentials {
                    provider: "Cohere".to_string(),
                    hint: format!("{API_KEY_HINT}; {COHERE_API_KEY_VAR} or embedding.api_key"),
                }
                .into())
            }
        };
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).context("invalid Cohere API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Cohere HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dim,
            batch_size: batch_size.max(1),
            id: format!("cohere:{model}:d{dim}"),
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let request = EmbedRequest { model: &self.model, texts: batch, input_type, truncate: "END" };
            debug!("Cohere embed: {} texts ({:?})", batch.len(), input_type);
            let resp = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .context("Cohere embed request failed")?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                return Err(Error::Operation(format!("Cohere embed request failed ({status}): {body}")).into());
            }
            let parsed: EmbedResponse = resp.json().context("failed to parse Cohere embed response")?;
            anyhow::ensure!(
                parsed.embeddings.len() == batch.len(),
                "Cohere returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                batch.len()
            );
            for v in parsed.embeddings {
                anyhow::ensure!(v.len() == self.dim, "Cohere returned {} dims, expected {}", v.len(), self.dim);
                out.push(v);
            }
        }
        Ok(out)
    }
}

impl Embedder for CohereEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(texts, InputType::SearchDocument)
    }
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()], InputType::SearchQuery)?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Cohere returned no embedding for the query"))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: InputType,
    truncate: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
