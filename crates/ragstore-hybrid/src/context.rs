use std::sync::Arc;

use anyhow::Context as _;

use ragstore_core::config::{expand_path, Settings};
use ragstore_core::traits::{DenseEmbedder, SparseEmbedder};
use ragstore_embed::build_dense_embedder;
use ragstore_text::Bm25SparseEmbedder;
use ragstore_vector::CollectionStore;

/// Everything a pipeline or retriever call needs, built once at startup and
/// shared by reference afterwards.
#[derive(Clone)]
pub struct ServiceContext {
	pub store: CollectionStore,
	pub dense: Arc<dyn DenseEmbedder>,
	pub sparse: Arc<dyn SparseEmbedder>,
	pub settings: Settings,
}

impl ServiceContext {
	pub fn new(store: CollectionStore, dense: Arc<dyn DenseEmbedder>, sparse: Arc<dyn SparseEmbedder>, settings: Settings) -> Self {
		Self { store, dense, sparse, settings }
	}

	pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
		settings.validate()?;
		let uri = expand_path(&settings.store.uri).to_string_lossy().to_string();
		let store = CollectionStore::open(&uri, settings.store.create_if_missing).await?;

		let dense_cfg = settings.dense.clone();
		// model loading reads large weight files
		let dense = tokio::task::spawn_blocking(move || build_dense_embedder(&dense_cfg))
			.await
			.context("dense embedder loader panicked")??;
		let sparse: Arc<dyn SparseEmbedder> = Arc::new(Bm25SparseEmbedder::from_config(&settings.sparse)?);
		tracing::info!(uri = %uri, dense_model = dense.model_id(), dim = dense.dim(), "service context ready");
		Ok(Self { store, dense, sparse, settings })
	}
}
