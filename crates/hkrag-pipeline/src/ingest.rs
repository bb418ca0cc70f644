//! Offline ingestion: load -> split -> embed -> append to the vector store.
//!
//! Appending is not deduplicated: running twice over the same files stores every
//! chunk twice. `IngestOptions::reset` removes the store first.
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use hkrag_core::config::Settings;
use hkrag_core::loader::{DocumentLoader, SkippedFile};
use hkrag_core::splitter::{ChunkingConfig, TextSplitter};
use hkrag_core::traits::{Embedder, VectorStore};
use hkrag_vector::LanceVectorStore;

use crate::blocking;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Delete the store directory before writing.
    pub reset: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub files: Vec<PathBuf>,
    pub documents: usize,
    pub chunks: usize,
    pub written: usize,
    pub total_in_store: usize,
    pub store_dir: PathBuf,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The input directory did not exist; it has been created empty.
    MissingInput(PathBuf),
    NoFiles(PathBuf),
    NoChunks { files: Vec<PathBuf>, skipped: Vec<SkippedFile> },
    Completed(IngestReport),
}

pub struct Ingestor {
    input_dir: PathBuf,
    store_dir: PathBuf,
    table: String,
    batch_size: usize,
    loader: DocumentLoader,
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
}

impl Ingestor {
    pub fn new(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let splitter = TextSplitter::new(ChunkingConfig::from(&settings.chunking))?;
        Ok(Self {
            input_dir: settings.data.input_dir(),
            store_dir: settings.data.store_dir(),
            table: settings.data.table.clone(),
            batch_size: settings.embedding.batch_size.max(1),
            loader: DocumentLoader::new(),
            splitter,
            embedder,
        })
    }

    pub fn input_dir(&self) -> &PathBuf { &self.input_dir }
    pub fn store_dir(&self) -> &PathBuf { &self.store_dir }

    pub async fn run(&self, opts: &IngestOptions) -> Result<IngestOutcome> {
        if !self.input_dir.exists() {
            std::fs::create_dir_all(&self.input_dir)
                .with_context(|| format!("failed to create {}", self.input_dir.display()))?;
            warn!("Input directory {} was missing and has been created", self.input_dir.display());
            return Ok(IngestOutcome::MissingInput(self.input_dir.clone()));
        }
        let files = self.loader.discover_files(&self.input_dir);
        if files.is_empty() {
            warn!("No supported files in {}", self.input_dir.display());
            return Ok(IngestOutcome::NoFiles(self.input_dir.clone()));
        }
        info!("Found {} files in {}", files.len(), self.input_dir.display());

        let report = self.loader.load_directory(&self.input_dir);
        let chunks = self.splitter.split_documents(&report.documents);
        info!("Loaded {} documents, split into {} chunks", report.documents.len(), chunks.len());
        if chunks.is_empty() {
            return Ok(IngestOutcome::NoChunks { files, skipped: report.skipped });
        }

        if opts.reset && self.store_dir.exists() {
            info!("Removing existing store at {}", self.store_dir.display());
            std::fs::remove_dir_all(&self.store_dir)
                .with_context(|| format!("failed to remove {}", self.store_dir.display()))?;
        }
        let store = LanceVectorStore::open(&self.store_dir, &self.table, self.embedder.dim()).await?;
        store.check_embedder(self.embedder.embedder_id()).await?;
        // Claim the store before the first row lands so a partial ingest still pins the model.
        if store.recorded_embedder().await?.is_none() {
            store.record_embedder(self.embedder.embedder_id()).await?;
        }

        let pb = if opts.show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} embedded ({percent}%)")?
                .progress_chars("#>-"),
        );
        let mut written = 0usize;
        for batch in chunks.chunks(self.batch_size) {
            let texts = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = blocking::embed_batch(&self.embedder, texts).await?;
            written += store.add(batch, &embeddings).await?;
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        let total_in_store = store.count().await?;
        info!("Stored {} chunks; store now holds {}", written, total_in_store);
        Ok(IngestOutcome::Completed(IngestReport {
            files,
            documents: report.documents.len(),
            chunks: chunks.len(),
            written,
            total_in_store,
            store_dir: self.store_dir.clone(),
            skipped: report.skipped,
        }))
    }
}
