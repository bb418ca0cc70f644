use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use hkrag_core::config::COHERE_API_KEY_VAR;
use hkrag_core::error::Error;
use hkrag_core::traits::Generator;

use crate::SamplingParams;

/// Cohere chat API (`POST /v1/chat`) used as a single-turn completion.
pub struct CohereGenerator {
    client: Client,
    endpoint: String,
    model: String,
    model_id: String,
    params: SamplingParams,
}

impl CohereGenerator {
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        model: &str,
        params: SamplingParams,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = match api_key.map(str::trim) {
            Some(k) if !k.is_empty() => k,
            _ => {
                return Err(Error::MissingCredentials {
                    provider: "Cohere".to_string(),
                    hint: format!(
                        "set {COHERE_API_KEY_VAR} or generation.api_key (free keys at https://dashboard.cohere.com/api-keys)"
                    ),
                }
                .into())
            }
        };
        let mut headers = HeaderMap::new();
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
            endpoint: format!("{}/v1/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
            model_id: format!("cohere:{model}"),
            params,
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl Generator for CohereGenerator {
    fn model_id(&self) -> &str { &self.model_id }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            message: prompt,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        };
        debug!("Cohere chat: {} prompt chars", prompt.len());
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .context("failed to call Cohere chat API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Operation(format!("Cohere returned {status}: {text}")).into());
        }
        let parsed: ChatResponse = resp.json().context("failed to parse Cohere chat response")?;
        let answer = parsed.text.trim().to_string();
        if answer.is_empty() {
            bail!("Cohere response missing text");
        }
        Ok(answer)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: String,
}
