//! Ingestion and query pipelines over the capability traits in `hkrag-core`.
pub mod blocking;
pub mod chat;
pub mod format;
pub mod ingest;
pub mod prompt;
pub mod query;

pub use ingest::{IngestOptions, IngestOutcome, IngestReport, Ingestor};
pub use query::{GroundedQuery, QueryAnswer, QueryPipeline, UngroundedQuery};
