use async_trait::async_trait;

use crate::types::{Chunk, RetrievalResult};

pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g., `cohere:embed-english-light-v3.0:d384`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality.
    fn dim(&self) -> usize;
    /// Embed chunk texts for storage.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
    /// Embed a question for search. Providers with asymmetric query encoding override this.
    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder {} returned no vector", self.embedder_id()))
    }
}

pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;
    /// Single blocking completion; the full text output is the answer.
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append chunks with their embeddings. Returns the number of rows written.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> anyhow::Result<usize>;
    /// At most `k` results ordered by non-increasing similarity.
    async fn similarity_search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<RetrievalResult>>;
    async fn count(&self) -> anyhow::Result<usize>;
}
