use serde::Serialize;

use hkrag_core::types::{QueryResponse, RetrievalResult};

use crate::query::QueryAnswer;

pub const PREVIEW_CHARS: usize = 150;

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn to_response(answer: &QueryAnswer) -> QueryResponse {
    QueryResponse {
        answer: answer.answer.clone(),
        sources: answer.sources.clone(),
        latency_seconds: Some(round2(answer.latency.as_secs_f64())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcePreview {
    pub source_id: String,
    pub preview: String,
}

/// First `PREVIEW_CHARS` characters followed by `...`.
pub fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

pub fn source_previews(results: &[RetrievalResult]) -> Vec<SourcePreview> {
    results
        .iter()
        .map(|r| SourcePreview { source_id: r.source_id().to_string(), preview: preview(&r.text) })
        .collect()
}

/// Numbered markdown list, one entry per retrieved chunk.
pub fn sources_markdown(results: &[RetrievalResult]) -> String {
    source_previews(results)
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. **{}**: {}", i + 1, p.source_id, p.preview))
        .collect::<Vec<_>>()
        .join("\n")
}
