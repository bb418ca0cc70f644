//! Question answering, grounded in retrieved chunks when a store exists.
//!
//! The variant is chosen once by [`QueryPipeline::select`] (or
//! [`QueryPipeline::from_settings`]) and never re-checked per request.
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use hkrag_core::config::Settings;
use hkrag_core::traits::{Embedder, Generator, VectorStore};
use hkrag_core::types::RetrievalResult;
use hkrag_vector::LanceVectorStore;

use crate::blocking;
use crate::prompt::{build_context, grounded_prompt, ungrounded_prompt};

#[derive(Debug, Clone)]
pub struct QueryAnswer {
    pub answer: String,
    /// One `source_id` per retrieved chunk, in retrieval order.
    pub sources: Vec<String>,
    pub retrieved: Vec<RetrievalResult>,
    pub latency: Duration,
}

pub struct GroundedQuery {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    k: usize,
}

impl GroundedQuery {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, generator: Arc<dyn Generator>, k: usize) -> Self {
        Self { embedder, store, generator, k }
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievalResult>> {
        let q_vec = blocking::embed_query(&self.embedder, question).await?;
        let results = self.store.similarity_search(&q_vec, self.k).await?;
        debug!("Retrieved {} chunks (k={})", results.len(), self.k);
        Ok(results)
    }

    pub async fn run(&self, question: &str) -> Result<QueryAnswer> {
        let start = Instant::now();
        let retrieved = self.retrieve(question).await?;
        let prompt = grounded_prompt(&build_context(&retrieved), question);
        let answer = blocking::generate(&self.generator, prompt).await?;
        let sources = retrieved.iter().map(|r| r.source_id().to_string()).collect();
        Ok(QueryAnswer { answer, sources, retrieved, latency: start.elapsed() })
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> { &self.store }
}

pub struct UngroundedQuery {
    generator: Arc<dyn Generator>,
}

impl UngroundedQuery {
    pub fn new(generator: Arc<dyn Generator>) -> Self { Self { generator } }

    pub async fn run(&self, question: &str) -> Result<QueryAnswer> {
        let start = Instant::now();
        let answer = blocking::generate(&self.generator, ungrounded_prompt(question)).await?;
        Ok(QueryAnswer { answer, sources: Vec::new(), retrieved: Vec::new(), latency: start.elapsed() })
    }
}

pub enum QueryPipeline {
    Grounded(GroundedQuery),
    Ungrounded(UngroundedQuery),
}

impl QueryPipeline {
    pub fn select(
        store: Option<Arc<dyn VectorStore>>,
        embedder: Option<Arc<dyn Embedder>>,
        generator: Arc<dyn Generator>,
        k: usize,
    ) -> Self {
        match (store, embedder) {
            (Some(store), Some(embedder)) => QueryPipeline::Grounded(GroundedQuery::new(embedder, store, generator, k)),
            _ => QueryPipeline::Ungrounded(UngroundedQuery::new(generator)),
        }
    }

    /// Builds providers from settings and opens the store if one was ingested.
    /// Credentials and embedder mismatches fail here rather than per request.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let generator = blocking::build_generator(&settings.generation).await?;
        let store_dir = settings.data.store_dir();
        if !hkrag_vector::store_exists(&store_dir, &settings.data.table).await? {
            warn!("No vector store at {}; answering without retrieved context", store_dir.display());
            return Ok(QueryPipeline::Ungrounded(UngroundedQuery::new(generator)));
        }
        let embedder = blocking::build_embedder(&settings.embedding).await?;
        let store = LanceVectorStore::open(&store_dir, &settings.data.table, embedder.dim()).await?;
        store.check_embedder(embedder.embedder_id()).await?;
        info!("Vector store loaded from {} ({} chunks)", store_dir.display(), store.count().await?);
        let store: Arc<dyn VectorStore> = Arc::new(store);
        Ok(Self::select(Some(store), Some(embedder), generator, settings.retrieval.k))
    }

    pub fn mode(&self) -> &'static str {
        match self {
            QueryPipeline::Grounded(_) => "grounded",
            QueryPipeline::Ungrounded(_) => "ungrounded",
        }
    }

    pub fn is_grounded(&self) -> bool { matches!(self, QueryPipeline::Grounded(_)) }

    pub async fn answer(&self, question: &str) -> Result<QueryAnswer> {
        match self {
            QueryPipeline::Grounded(q) => q.run(question).await,
            QueryPipeline::Ungrounded(q) => q.run(question).await,
        }
    }

    /// Entries in the backing store; `None` without one.
    pub async fn document_count(&self) -> Result<Option<usize>> {
        match self {
            QueryPipeline::Grounded(q) => Ok(Some(q.store.count().await?)),
            QueryPipeline::Ungrounded(_) => Ok(None),
        }
    }
}
