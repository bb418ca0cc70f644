//! Domain types shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Label used when a stored chunk carries no source metadata.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A raw source unit produced by the loader.
///
/// - `content`: the extracted text
/// - `source_id`: file name, or `file#n` for records inside a JSON file
/// - `doc_type`: free-form tag such as `statistics` or `facility`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub source_id: String,
    pub doc_type: String,
}

impl Document {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self { content: content.into(), source_id: source_id.into(), doc_type: doc_type.into() }
    }
}

/// A contiguous slice of a document's content; the unit of storage and retrieval.
///
/// `start_offset` is measured in characters from the start of the parent document.
/// `chunk_index`/`total_chunks` number the chunks of one `source_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source_id: String,
    pub doc_type: String,
    pub text: String,
    pub start_offset: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_id: String,
    pub doc_type: String,
}

/// One hit of a similarity search. Higher `score` is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

impl RetrievalResult {
    pub fn source_id(&self) -> &str {
        if self.metadata.source_id.trim().is_empty() { UNKNOWN_SOURCE } else { &self.metadata.source_id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_seconds: Option<f64>,
}
