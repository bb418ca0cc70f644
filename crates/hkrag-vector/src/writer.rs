use anyhow::{ensure, Result};
use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;
use tracing::info;

use hkrag_core::types::Chunk;

use crate::schema::build_chunk_schema;
use crate::table::table_exists;

pub const WRITE_BATCH_SIZE: usize = 1000;

/// Append rows, creating the table on first write. Returns rows written.
pub async fn append_chunks(
	db: &Connection,
	table_name: &str,
	dim: usize,
	chunks: &[Chunk],
	embeddings: &[Vec<f32>],
	show_progress: bool,
) -> Result<usize> {
	ensure!(chunks.len() == embeddings.len(), "chunks ({}) and embeddings ({}) length must match", chunks.len(), embeddings.len());
	if chunks.is_empty() { return Ok(0); }
	if let Some(bad) = embeddings.iter().find(|v| v.len() != dim) {
		anyhow::bail!("embedding has {} dims, store expects {}", bad.len(), dim);
	}
	info!("Writing {} chunks into table '{}'", chunks.len(), table_name);
	let pb = if show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
	pb.set_style(
		ProgressStyle::default_bar()
			.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
			.progress_chars("#>-"),
	);
	let mut written = 0usize;
	for (batch_chunks, batch_vecs) in chunks.chunks(WRITE_BATCH_SIZE).zip(embeddings.chunks(WRITE_BATCH_SIZE)) {
		let record_batch = to_record_batch(dim, batch_chunks, batch_vecs)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists(db, table_name).await? {
			db.open_table(table_name).execute().await?.add(reader).execute().await?;
		} else {
			db.create_table(table_name, reader).execute().await?;
		}
		written += batch_chunks.len();
		pb.set_position(written as u64);
	}
	pb.finish_with_message("stored");
	Ok(written)
}

fn to_record_batch(dim: usize, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
	let vectors = embeddings.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
	let record_batch = RecordBatch::try_new(build_chunk_schema(dim), vec![
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source_id.as_str()))),
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.doc_type.as_str()))),
		Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
		Arc::new(Int64Array::from_iter_values(chunks.iter().map(|c| c.start_offset as i64))),
		Arc::new(Int32Array::from_iter_values(chunks.iter().map(|c| c.chunk_index as i32))),
		Arc::new(Int32Array::from_iter_values(chunks.iter().map(|c| c.total_chunks as i32))),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim as i32)),
	])?;
	Ok(record_batch)
}
