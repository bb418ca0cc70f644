use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};

use hkrag_core::types::{ChunkMetadata, RetrievalResult, UNKNOWN_SOURCE};

/// Cosine nearest neighbours; `score = 1 - cosine distance`, best first.
pub async fn search_table(db: &Connection, table_name: &str, query_vec: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
	if k == 0 { return Ok(Vec::new()); }
	let table = db.open_table(table_name).execute().await?;
	let mut stream = table
		.vector_search(query_vec.to_vec())?
		.distance_type(DistanceType::Cosine)
		.limit(k)
		.execute()
		.await?;
	let mut results = Vec::new();
	while let Some(batch) = stream.try_next().await? {
		results.extend(batch_to_results(&batch)?);
	}
	results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	results.truncate(k);
	Ok(results)
}

fn batch_to_results(batch: &RecordBatch) -> Result<Vec<RetrievalResult>> {
	let text = string_col(batch, "text")?;
	let source = string_col(batch, "source_id")?;
	let doc_type = string_col(batch, "doc_type")?;
	let distance = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| anyhow!("_distance column missing from search results"))?;
	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let source_id = if source.is_null(i) || source.value(i).is_empty() { UNKNOWN_SOURCE } else { source.value(i) };
		out.push(RetrievalResult {
			text: text.value(i).to_string(),
			metadata: ChunkMetadata { source_id: source_id.to_string(), doc_type: doc_type.value(i).to_string() },
			score: 1.0 - distance.value(i),
		});
	}
	Ok(out)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("column '{name}' missing from search results"))
}
