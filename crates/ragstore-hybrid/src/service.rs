//! Entry points consumed by the transport layer.
use serde::Serialize;

use ragstore_core::data_processor::TextSplitter;
use ragstore_core::types::{ScoredPassage, SourceText};
use ragstore_core::{Error, Result};
use ragstore_vector::{CollectionState, CollectionStats};

use crate::context::ServiceContext;
use crate::pipeline::ingest_chunks;
use crate::retriever::retrieve;

pub const UPLOAD_MESSAGE: &str = "Document uploaded successfully!";

#[derive(Debug, Clone, Serialize)]
pub struct Timings {
	pub embed_ms: u64,
	pub insert_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
	pub message: String,
	pub rows_inserted: usize,
	pub state: CollectionState,
	pub stats: CollectionStats,
	pub timings: Timings,
}

impl ServiceContext {
	/// Split `docs`, embed the chunks and store them in `collection`.
	pub async fn ingest(&self, collection: &str, docs: &[SourceText], chunk_size: usize, overlap: usize, batch_size: usize) -> Result<IngestResponse> {
		let splitter = TextSplitter::new(chunk_size, overlap)?;
		let chunks = splitter.split_documents(docs);
		let report = ingest_chunks(self, collection, chunks, batch_size).await?;
		Ok(IngestResponse {
			message: UPLOAD_MESSAGE.to_string(),
			rows_inserted: report.rows_inserted,
			state: report.state,
			stats: report.stats,
			timings: Timings {
				embed_ms: report.embed_duration.as_millis() as u64,
				insert_ms: report.insert_duration.as_millis() as u64,
			},
		})
	}

	pub async fn query(&self, collection: &str, question: &str, k: usize) -> Result<Vec<ScoredPassage>> {
		let hits = retrieve(self, collection, question, k).await?;
		Ok(hits.into_iter().map(|h| ScoredPassage { text: h.text, score: h.score }).collect())
	}

	pub async fn list_collections(&self) -> Result<Vec<String>> {
		self.store.list_collections().await
	}

	pub async fn delete_collection(&self, name: &str) -> Result<()> {
		self.store.drop_collection(name).await
	}

	/// Drop every collection in the store. Returns the dropped names.
	pub async fn reset(&self) -> Result<Vec<String>> {
		let names = self.store.list_collections().await?;
		for name in &names {
			match self.store.drop_collection(name).await {
				// dropped concurrently by another caller
				Ok(()) | Err(Error::CollectionNotFound(_)) => {}
				Err(e) => return Err(e),
			}
		}
		tracing::info!(uri = self.store.uri(), dropped = names.len(), "reset store");
		Ok(names)
	}
}
