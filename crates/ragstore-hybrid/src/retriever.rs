//! Hybrid retrieval: one search per vector field, fused with RRF.
use std::sync::Arc;

use ragstore_core::types::FusedHit;
use ragstore_core::{Error, Result};

use crate::context::ServiceContext;
use crate::fusion::reciprocal_rank_fusion;

pub async fn retrieve(ctx: &ServiceContext, collection: &str, query: &str, k: usize) -> Result<Vec<FusedHit>> {
	if k == 0 {
		return Err(Error::InvalidInput("k must be >= 1".into()));
	}
	if query.trim().is_empty() {
		return Err(Error::InvalidInput("query must not be empty".into()));
	}
	let schema = ctx.store.schema(collection).await?;

	let dense = Arc::clone(&ctx.dense);
	let sparse = Arc::clone(&ctx.sparse);
	let text = query.to_string();
	let (dense_vec, sparse_vec) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
		Ok((dense.embed(&text)?, sparse.embed_query(&text)?))
	})
	.await
	.map_err(|e| Error::store("embed_query", collection, e))?
	.map_err(|e| Error::QueryEmbedding { collection: collection.to_string(), reason: format!("{e:#}") })?;

	if dense_vec.len() != schema.embed_dim {
		return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: schema.embed_dim, actual: dense_vec.len(), record: None });
	}

	let search = &ctx.settings.search;
	let candidates = k.saturating_mul(search.over_fetch);
	let (dense_hits, sparse_hits) = tokio::try_join!(
		ctx.store.search_dense(collection, &dense_vec, candidates),
		ctx.store.search_sparse(collection, &sparse_vec, candidates),
	)?;
	let fused = reciprocal_rank_fusion(&dense_hits, &sparse_hits, search.rrf_k, k);
	tracing::debug!(collection, k, candidates, dense = dense_hits.len(), sparse = sparse_hits.len(), fused = fused.len(), "hybrid search");
	Ok(fused)
}
