use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use hkrag_core::config::{EmbeddingProviderKind, GenerationProviderKind, Settings};
use hkrag_core::traits::{Embedder, Generator, VectorStore};
use hkrag_core::types::Document;
use hkrag_core::splitter::TextSplitter;
use hkrag_embed::HashEmbedder;
use hkrag_pipeline::prompt::{GROUNDED_PREAMBLE, UNGROUNDED_PREAMBLE};
use hkrag_pipeline::{IngestOptions, Ingestor, QueryPipeline};
use hkrag_vector::LanceVectorStore;
use tempfile::TempDir;

const DIM: usize = 128;

/// Returns a canned answer and remembers every prompt.
#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl Generator for RecordingGenerator {
    fn model_id(&self) -> &str { "stub" }
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("The Hospital Authority.".to_string())
    }
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn model_id(&self) -> &str { "down" }
    fn generate(&self, _prompt: &str) -> Result<String> { bail!("model unavailable") }
}

async fn populated_store(dir: &Path, docs: &[Document]) -> Arc<dyn VectorStore> {
    let embedder = HashEmbedder::new(DIM);
    let chunks = TextSplitter::default().split_documents(docs);
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let store = LanceVectorStore::open(dir, "documents", DIM).await.unwrap();
    store.add(&chunks, &embedder.embed_batch(&texts).unwrap()).await.unwrap();
    Arc::new(store)
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new("Hospital Authority governs public hospitals in Hong Kong", "HA_report.pdf", "reports"),
        Document::new("Dental clinics for civil servants open on weekdays.", "dental.txt", "document"),
        Document::new("Vaccination programmes run through District Health Centres.", "vaccines.txt", "document"),
        Document::new("Elderly health care vouchers cover private clinic visits.", "", "document"),
        Document::new("Accident and emergency waiting times are published hourly.", "ae.csv", "statistics"),
    ]
}

#[tokio::test]
async fn grounded_answer_cites_the_governing_report() {
    let tmp = TempDir::new().unwrap();
    let store = populated_store(tmp.path(), &corpus()).await;
    let generator = Arc::new(RecordingGenerator::default());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let pipeline = QueryPipeline::select(Some(store), Some(embedder), generator.clone(), 3);
    assert_eq!(pipeline.mode(), "grounded");

    let answer = pipeline.answer("Who governs public hospitals?").await.unwrap();
    assert_eq!(answer.answer, "The Hospital Authority.");
    assert!(answer.sources.len() <= 3);
    assert!(answer.sources.contains(&"HA_report.pdf".to_string()));
    assert_eq!(answer.sources.len(), answer.retrieved.len());
    for (s, r) in answer.sources.iter().zip(&answer.retrieved) {
        assert_eq!(s, r.source_id());
    }

    let prompt = generator.last_prompt();
    assert!(prompt.starts_with(GROUNDED_PREAMBLE));
    assert!(prompt.contains("Hospital Authority governs public hospitals in Hong Kong"));
    assert!(prompt.trim_end().ends_with("Question: Who governs public hospitals?\n\nAnswer:"));
    let context = answer.retrieved.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join("\n\n");
    assert!(prompt.contains(&format!("Context:\n{context}\n\nQuestion:")));
    assert_eq!(pipeline.document_count().await.unwrap(), Some(5));
}

#[tokio::test]
async fn missing_source_reported_as_unknown() {
    let tmp = TempDir::new().unwrap();
    let store = populated_store(tmp.path(), &corpus()).await;
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let pipeline = QueryPipeline::select(Some(store), Some(embedder), Arc::new(RecordingGenerator::default()), 5);
    let answer = pipeline.answer("elderly health care vouchers").await.unwrap();
    assert!(answer.sources.contains(&"unknown".to_string()));
}

#[tokio::test]
async fn ungrounded_answers_without_sources() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = QueryPipeline::select(None, None, generator.clone(), 4);
    assert_eq!(pipeline.mode(), "ungrounded");
    let answer = pipeline.answer("What is the Hospital Authority?").await.unwrap();
    assert!(!answer.answer.is_empty());
    assert!(answer.sources.is_empty());
    assert_eq!(
        generator.last_prompt(),
        format!("{UNGROUNDED_PREAMBLE}\n\nWhat is the Hospital Authority?")
    );
    assert_eq!(pipeline.document_count().await.unwrap(), None);
}

#[tokio::test]
async fn empty_store_still_answers() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn VectorStore> = Arc::new(LanceVectorStore::open(tmp.path(), "documents", DIM).await.unwrap());
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let pipeline = QueryPipeline::select(Some(store), Some(embedder), Arc::new(RecordingGenerator::default()), 4);
    let answer = pipeline.answer("anything").await.unwrap();
    assert!(!answer.answer.is_empty());
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn generation_failure_is_returned_not_raised() {
    let pipeline = QueryPipeline::select(None, None, Arc::new(FailingGenerator), 4);
    let err = pipeline.answer("hello").await.unwrap_err();
    assert!(err.to_string().contains("model unavailable"));
}

fn offline_settings(root: &Path) -> Settings {
    let mut s = Settings::default();
    s.data.input_dir = root.join("data").to_string_lossy().to_string();
    s.data.store_dir = root.join("chroma_db").to_string_lossy().to_string();
    s.embedding.provider = EmbeddingProviderKind::Hash;
    s.embedding.dimension = DIM;
    s.generation.provider = GenerationProviderKind::Ollama;
    s.generation.model = Some("llama3.2:3b".to_string());
    s.generation.base_url = Some("http://127.0.0.1:9".to_string());
    s
}

#[tokio::test]
async fn variant_selected_from_store_presence() {
    let tmp = TempDir::new().unwrap();
    let settings = offline_settings(tmp.path());
    let pipeline = QueryPipeline::from_settings(&settings).await.unwrap();
    assert!(!pipeline.is_grounded());

    let data = settings.data.input_dir();
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("ha.txt"), "Hospital Authority governs public hospitals in Hong Kong").unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    Ingestor::new(&settings, embedder).unwrap().run(&IngestOptions::default()).await.unwrap();

    let pipeline = QueryPipeline::from_settings(&settings).await.unwrap();
    assert!(pipeline.is_grounded());
    assert_eq!(pipeline.document_count().await.unwrap(), Some(1));
}

#[tokio::test]
async fn mismatched_embedder_fails_at_startup() {
    let tmp = TempDir::new().unwrap();
    let mut settings = offline_settings(tmp.path());
    let data = settings.data.input_dir();
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("ha.txt"), "Hospital Authority governs public hospitals in Hong Kong").unwrap();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    Ingestor::new(&settings, embedder).unwrap().run(&IngestOptions::default()).await.unwrap();

    settings.embedding.dimension = 64;
    let err = QueryPipeline::from_settings(&settings).await.err().expect("mismatch");
    assert!(matches!(
        err.downcast_ref::<hkrag_core::error::Error>(),
        Some(hkrag_core::error::Error::EmbedderMismatch { .. })
    ));
}
