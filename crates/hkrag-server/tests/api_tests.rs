use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use hkrag_core::splitter::TextSplitter;
use hkrag_core::traits::{Embedder, Generator, VectorStore};
use hkrag_core::types::{Chunk, Document, QueryResponse, RetrievalResult};
use hkrag_embed::HashEmbedder;
use hkrag_pipeline::QueryPipeline;
use hkrag_server::{app_router, AppState, ErrorBody, HealthResponse, Metrics, MetricsSnapshot, RootResponse, WELCOME_MESSAGE};
use hkrag_vector::LanceVectorStore;
use serde_json::json;
use tempfile::TempDir;

const DIM: usize = 128;

/// Fails any question mentioning "fail", answers everything else.
struct StubGenerator;

impl Generator for StubGenerator {
    fn model_id(&self) -> &str { "stub" }
    fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("fail") {
            bail!("upstream model error");
        }
        Ok("The Hospital Authority manages public hospitals.".to_string())
    }
}

async fn grounded_pipeline(dir: &Path) -> QueryPipeline {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let docs = vec![
        Document::new("Hospital Authority governs public hospitals in Hong Kong", "HA_report.pdf", "reports"),
        Document::new("General outpatient clinics serve low-income patients.", "gopc.txt", "document"),
        Document::new("Facility: Queen Mary Hospital\nType: Hospital\nDistrict: Southern\nAddress: Unknown", "facilities.json#0", "facility"),
    ];
    let chunks = TextSplitter::default().split_documents(&docs);
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let store = LanceVectorStore::open(dir, "documents", DIM).await.unwrap();
    store.add(&chunks, &embedder.embed_batch(&texts).unwrap()).await.unwrap();
    let store: Arc<dyn VectorStore> = Arc::new(store);
    QueryPipeline::select(Some(store), Some(embedder), Arc::new(StubGenerator), 4)
}

async fn spawn_server(pipeline: QueryPipeline) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(AppState::new(pipeline));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });
    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn query_returns_answer_sources_and_latency() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = spawn_server(grounded_pipeline(tmp.path()).await).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/query"))
        .json(&json!({"question": "Who governs public hospitals?"}))
        .send()
        .await
        .expect("query response");
    assert_eq!(resp.status(), 200);
    let body: QueryResponse = resp.json().await.expect("query json");
    assert!(!body.answer.is_empty());
    assert!(body.sources.contains(&"HA_report.pdf".to_string()));
    assert!(body.sources.len() <= 4);
    assert!(body.latency_seconds.is_some());

    handle.abort();
}

#[tokio::test]
async fn metrics_count_successes_and_failures() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = spawn_server(grounded_pipeline(tmp.path()).await).await;
    let client = reqwest::Client::new();

    let ok = client.post(format!("{base}/query")).json(&json!({"question": "Who governs public hospitals?"})).send().await.unwrap();
    assert_eq!(ok.status(), 200);
    let failed = client.post(format!("{base}/query")).json(&json!({"question": "please fail"})).send().await.unwrap();
    assert_eq!(failed.status(), 500);
    let err: ErrorBody = failed.json().await.unwrap();
    assert!(err.detail.contains("upstream model error"));

    let m: MetricsSnapshot = client.get(format!("{base}/metrics")).send().await.unwrap().json().await.unwrap();
    assert_eq!(m.total_queries, 2);
    assert_eq!(m.total_errors, 1);
    assert_eq!(m.error_rate, 50.0);
    assert!(m.average_latency_seconds >= 0.0);
    assert!(chrono::DateTime::parse_from_rfc3339(&m.uptime_since).is_ok());

    let reset: MetricsSnapshot = client.post(format!("{base}/metrics/reset")).send().await.unwrap().json().await.unwrap();
    assert_eq!((reset.total_queries, reset.total_errors, reset.error_rate), (0, 0, 0.0));
    assert_eq!(reset.uptime_since, m.uptime_since);

    handle.abort();
}

#[tokio::test]
async fn blank_question_is_rejected_and_not_counted() {
    let (base, handle) = spawn_server(QueryPipeline::select(None, None, Arc::new(StubGenerator), 4)).await;
    let client = reqwest::Client::new();
    let resp = client.post(format!("{base}/query")).json(&json!({"question": "   "})).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let m: MetricsSnapshot = client.get(format!("{base}/metrics")).send().await.unwrap().json().await.unwrap();
    assert_eq!(m.total_queries, 0);
    assert_eq!(m.error_rate, 0.0);
    handle.abort();
}

#[tokio::test]
async fn health_reports_store_entries() {
    let tmp = TempDir::new().unwrap();
    let (base, handle) = spawn_server(grounded_pipeline(tmp.path()).await).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: HealthResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "healthy");
    assert_eq!(body.documents, 3);
    assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
    handle.abort();
}

#[tokio::test]
async fn ungrounded_server_is_unhealthy_but_answers() {
    let (base, handle) = spawn_server(QueryPipeline::select(None, None, Arc::new(StubGenerator), 4)).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), 503);
    let err: ErrorBody = health.json().await.unwrap();
    assert_eq!(err.detail, "Service unhealthy");

    let root: RootResponse = client.get(format!("{base}/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(root.message, WELCOME_MESSAGE);
    assert_eq!(root.mode, "ungrounded");

    let resp: QueryResponse = client
        .post(format!("{base}/query"))
        .json(&json!({"question": "What is the Hospital Authority?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!resp.answer.is_empty());
    assert!(resp.sources.is_empty());
    handle.abort();
}

#[test]
fn metrics_object_lifecycle() {
    let m = Metrics::new();
    assert_eq!(m.snapshot().average_latency_seconds, 0.0);
    m.record_success(Duration::from_millis(1500));
    m.record_success(Duration::from_millis(500));
    m.record_failure();
    let s = m.snapshot();
    assert_eq!(s.total_queries, 3);
    assert_eq!(s.total_errors, 1);
    assert_eq!(s.error_rate, 33.33);
    assert_eq!(s.average_latency_seconds, 0.67);
    m.reset();
    assert_eq!(m.snapshot().total_queries, 0);
}

struct UnreachableEmbedder;

impl Embedder for UnreachableEmbedder {
    fn embedder_id(&self) -> &str { "cohere:embed-english-light-v3.0:d128" }
    fn dim(&self) -> usize { DIM }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("embedding service unreachable")
    }
}

/// A store whose files went missing after startup.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn add(&self, _chunks: &[Chunk], _embeddings: &[Vec<f32>]) -> Result<usize> {
        bail!("store is read-only")
    }
    async fn similarity_search(&self, _query_vec: &[f32], _k: usize) -> Result<Vec<RetrievalResult>> {
        bail!("vector index unreadable")
    }
    async fn count(&self) -> Result<usize> {
        bail!("vector index unreadable")
    }
}

async fn assert_query_fails_and_is_counted(pipeline: QueryPipeline, expected: &str) {
    let (base, handle) = spawn_server(pipeline).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("{base}/query")).json(&json!({"question": "Who runs public hospitals?"})).send().await.unwrap();
    assert_eq!(resp.status(), 500);
    let err: ErrorBody = resp.json().await.expect("json error body");
    assert!(err.detail.contains(expected), "{}", err.detail);

    let m: MetricsSnapshot = client.get(format!("{base}/metrics")).send().await.unwrap().json().await.unwrap();
    assert_eq!((m.total_queries, m.total_errors), (1, 1));
    assert_eq!(m.error_rate, 100.0);

    let root = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(root.status(), 200, "server keeps serving after a failed query");
    handle.abort();
}

#[tokio::test]
async fn embedding_failure_is_a_counted_500() {
    let tmp = TempDir::new().unwrap();
    let store: Arc<dyn VectorStore> = Arc::new(LanceVectorStore::open(tmp.path(), "documents", DIM).await.unwrap());
    let pipeline = QueryPipeline::select(Some(store), Some(Arc::new(UnreachableEmbedder)), Arc::new(StubGenerator), 4);
    assert_query_fails_and_is_counted(pipeline, "embedding service unreachable").await;
}

#[tokio::test]
async fn retrieval_failure_is_a_counted_500() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let pipeline = QueryPipeline::select(Some(Arc::new(BrokenStore)), Some(embedder), Arc::new(StubGenerator), 4);
    assert_query_fails_and_is_counted(pipeline, "vector index unreadable").await;
}

#[tokio::test]
async fn unreadable_store_reports_unhealthy() {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let pipeline = QueryPipeline::select(Some(Arc::new(BrokenStore)), Some(embedder), Arc::new(StubGenerator), 4);
    let (base, handle) = spawn_server(pipeline).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 503);
    let err: ErrorBody = resp.json().await.unwrap();
    assert_eq!(err.detail, "Service unhealthy");
    handle.abort();
}

#[tokio::test]
async fn malformed_bodies_get_a_detail_error() {
    let (base, handle) = spawn_server(QueryPipeline::select(None, None, Arc::new(StubGenerator), 4)).await;
    let client = reqwest::Client::new();

    let missing_field = client.post(format!("{base}/query")).json(&json!({"q": "hospitals"})).send().await.unwrap();
    assert_eq!(missing_field.status(), 422);
    let err: ErrorBody = missing_field.json().await.expect("json error body");
    assert!(err.detail.contains("question"), "{}", err.detail);

    let not_json = client
        .post(format!("{base}/query"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), 400);
    let err: ErrorBody = not_json.json().await.expect("json error body");
    assert!(!err.detail.is_empty());

    let m: MetricsSnapshot = client.get(format!("{base}/metrics")).send().await.unwrap().json().await.unwrap();
    assert_eq!(m.total_queries, 0);
    handle.abort();
}
