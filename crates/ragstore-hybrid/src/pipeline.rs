//! Ingestion: embed chunks with both providers, then append them to a
//! collection in batches.
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ragstore_core::traits::{DenseEmbedder, SparseEmbedder};
use ragstore_core::types::{Chunk, Record};
use ragstore_core::{Error, Result};
use ragstore_vector::{CollectionState, CollectionStats};

use crate::context::ServiceContext;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
	pub collection: String,
	pub rows_inserted: usize,
	pub batches: Vec<usize>,
	pub embed_duration: Duration,
	pub insert_duration: Duration,
	pub state: CollectionState,
	pub stats: CollectionStats,
}

/// Ensure the collection, embed every chunk, insert.
///
/// The first embedding failure aborts the call before anything is written.
pub async fn ingest_chunks(ctx: &ServiceContext, collection: &str, chunks: Vec<Chunk>, batch_size: usize) -> Result<IngestReport> {
	if batch_size == 0 {
		return Err(Error::InvalidInput("batch_size must be >= 1".into()));
	}
	let state = ctx.store.ensure_collection(collection, ctx.dense.dim()).await?;
	tracing::info!(collection, chunks = chunks.len(), ?state, "ingesting");

	let embed_start = Instant::now();
	let records = embed_chunks(ctx, collection, chunks).await?;
	let embed_duration = embed_start.elapsed();
	tracing::info!(collection, records = records.len(), elapsed_ms = embed_duration.as_millis() as u64, "embedded chunks");

	let report = ctx.store.insert(collection, &records, batch_size).await?;
	let stats = ctx.store.collection_stats(collection).await?;
	Ok(IngestReport {
		collection: collection.to_string(),
		rows_inserted: report.rows_written,
		batches: report.batches,
		embed_duration,
		insert_duration: report.duration,
		state,
		stats,
	})
}

async fn embed_chunks(ctx: &ServiceContext, collection: &str, chunks: Vec<Chunk>) -> Result<Vec<Record>> {
	let dense = Arc::clone(&ctx.dense);
	let sparse = Arc::clone(&ctx.sparse);
	let show_progress = ctx.settings.ingest.show_progress;
	tokio::task::spawn_blocking(move || embed_all(dense.as_ref(), sparse.as_ref(), chunks, show_progress))
		.await
		.map_err(|e| Error::store("embed", collection, e))?
}

fn embed_all(dense: &dyn DenseEmbedder, sparse: &dyn SparseEmbedder, chunks: Vec<Chunk>, show_progress: bool) -> Result<Vec<Record>> {
	let pb = if show_progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
	if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
		pb.set_style(style.progress_chars("#>-"));
	}
	let mut records = Vec::with_capacity(chunks.len());
	for chunk in chunks {
		let failure = |field: &str, e: anyhow::Error| Error::Embedding {
			chunk_id: chunk.id,
			source_document: chunk.source_document.clone(),
			reason: format!("{field} embedding: {e:#}"),
		};
		let dense_vec = dense.embed(&chunk.text).map_err(|e| failure("dense", e))?;
		let sparse_vec = sparse.embed(&chunk.text).map_err(|e| failure("sparse", e))?;
		records.push(Record { dense: dense_vec, sparse: sparse_vec, text: chunk.text });
		pb.inc(1);
	}
	pb.finish_and_clear();
	Ok(records)
}
