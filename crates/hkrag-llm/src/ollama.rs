use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hkrag_core::error::Error;
use hkrag_core::traits::Generator;

use crate::SamplingParams;

/// Local Ollama server, non-streaming `POST /api/generate`.
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
    model_id: String,
    params: SamplingParams,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, params: SamplingParams, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            model_id: format!("ollama:{model}"),
            params,
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

impl Generator for OllamaGenerator {
    fn model_id(&self) -> &str { &self.model_id }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.params.temperature, num_predict: self.params.max_tokens },
        };
        debug!("Ollama generate: {} prompt chars", prompt.len());
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .with_context(|| format!("failed to reach Ollama at {}", self.endpoint))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Operation(format!("Ollama returned {status}: {text}")).into());
        }
        let parsed: GenerateResponse = resp.json().context("failed to parse Ollama response")?;
        let answer = parsed.response.trim().to_string();
        if answer.is_empty() {
            bail!("Ollama response missing text");
        }
        Ok(answer)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_disables_streaming() {
        let req = GenerateRequest {
            model: "llama3.2",
            prompt: "Q",
            stream: false,
            options: GenerateOptions { temperature: 0.3, num_predict: 256 },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["options"]["num_predict"], 256);
    }

    #[test]
    fn generate_response_reads_response_field() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"model":"llama3.2","response":"Answer","done":true}"#).unwrap();
        assert_eq!(parsed.response, "Answer");
    }
}
