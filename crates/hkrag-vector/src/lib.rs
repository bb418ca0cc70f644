//! Persistent vector store on LanceDB.
//!
//! Layout on disk: a LanceDB directory (default `./chroma_db`) holding the chunk
//! table and a `hkrag_meta` table with the embedder id and dimension.
use anyhow::Result;
use async_trait::async_trait;
use lancedb::Connection;
use std::path::Path;
use tracing::{debug, info};

use hkrag_core::error::Error;
use hkrag_core::traits::VectorStore;
use hkrag_core::types::{Chunk, RetrievalResult};

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use table::store_exists;

const META_EMBEDDER_ID: &str = "embedder_id";
const META_DIMENSION: &str = "dimension";

pub struct LanceVectorStore {
	db: Connection,
	table_name: String,
	dim: usize,
	show_progress: bool,
}

impl LanceVectorStore {
	/// Open or create the store directory. The chunk table is created on first write.
	pub async fn open(path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		std::fs::create_dir_all(path)?;
		let db = table::open_db(&path.to_string_lossy()).await?;
		Ok(Self { db, table_name: table_name.to_string(), dim, show_progress: false })
	}

	/// `None` when no persisted chunk table exists at `path`.
	pub async fn open_existing(path: &Path, table_name: &str, dim: usize) -> Result<Option<Self>> {
		if !store_exists(path, table_name).await? {
			debug!("No vector store at {}", path.display());
			return Ok(None);
		}
		Ok(Some(Self::open(path, table_name, dim).await?))
	}

	pub fn with_progress(mut self, show: bool) -> Self {
		self.show_progress = show;
		self
	}

	pub fn table_name(&self) -> &str { &self.table_name }
	pub fn dim(&self) -> usize { self.dim }

	pub async fn recorded_embedder(&self) -> Result<Option<String>> {
		table::get_meta(&self.db, schema::META_TABLE, META_EMBEDDER_ID).await
	}

	/// Fails with `EmbedderMismatch` when the store was built by a different model.
	/// A store without a recorded embedder accepts any.
	pub async fn check_embedder(&self, embedder_id: &str) -> Result<()> {
		match self.recorded_embedder().await? {
			Some(recorded) if recorded != embedder_id => Err(Error::EmbedderMismatch {
				expected: recorded,
				found: embedder_id.to_string(),
			}
			.into()),
			_ => Ok(()),
		}
	}

	pub async fn record_embedder(&self, embedder_id: &str) -> Result<()> {
		table::set_meta(&self.db, schema::META_TABLE, META_EMBEDDER_ID, embedder_id).await?;
		table::set_meta(&self.db, schema::META_TABLE, META_DIMENSION, &self.dim.to_string()).await?;
		info!("Recorded embedder '{}' ({} dims)", embedder_id, self.dim);
		Ok(())
	}
}

#[async_trait]
impl VectorStore for LanceVectorStore {
	async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
		writer::append_chunks(&self.db, &self.table_name, self.dim, chunks, embeddings, self.show_progress).await
	}

	async fn similarity_search(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
		if !table::table_exists(&self.db, &self.table_name).await? {
			return Ok(Vec::new());
		}
		if query_vec.len() != self.dim {
			anyhow::bail!("query vector has {} dims, store expects {}", query_vec.len(), self.dim);
		}
		search::search_table(&self.db, &self.table_name, query_vec, k).await
	}

	async fn count(&self) -> Result<usize> {
		if !table::table_exists(&self.db, &self.table_name).await? {
			return Ok(0);
		}
		let t = self.db.open_table(&self.table_name).execute().await?;
		Ok(t.count_rows(None).await?)
	}
}
