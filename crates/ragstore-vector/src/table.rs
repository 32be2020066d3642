//! Collection lifecycle over a LanceDB connection.
//!
//! One Lance table per collection. The handle keeps a registry of loaded
//! collections; searches and inserts load on demand.
use arrow_array::RecordBatchIterator;
use arrow_schema::SchemaRef;
use lancedb::{connect, Connection, Table};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use ragstore_core::types::Record;
use ragstore_core::{Error, Result};

use crate::schema::{build_collection_schema, validate_collection_name, CollectionSchema};
use crate::writer::{records_to_batch, BatchSink, TableSink};

/// Outcome of [`CollectionStore::ensure_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
	Created,
	Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
	Loaded,
	NotLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
	pub name: String,
	pub row_count: usize,
	pub embed_dim: usize,
	pub load_state: LoadState,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertReport {
	pub rows_written: usize,
	/// Size of each committed write, in order.
	pub batches: Vec<usize>,
	pub duration: Duration,
}

pub(crate) struct OpenCollection {
	pub(crate) table: Table,
	pub(crate) schema: CollectionSchema,
	pub(crate) arrow: SchemaRef,
	write_lock: Mutex<()>,
}

struct StoreInner {
	conn: Connection,
	uri: String,
	registry: RwLock<HashMap<String, Arc<OpenCollection>>>,
	create_lock: Mutex<()>,
}

/// Shared handle to one LanceDB database. Cloning is cheap.
#[derive(Clone)]
pub struct CollectionStore {
	inner: Arc<StoreInner>,
}

fn is_remote(uri: &str) -> bool { uri.contains("://") }

impl CollectionStore {
	pub async fn open(uri: &str, create_if_missing: bool) -> Result<Self> {
		let connection_error = |reason: String| Error::Connection { uri: uri.to_string(), reason };
		if !is_remote(uri) {
			let path = Path::new(uri);
			if !path.exists() {
				if !create_if_missing { return Err(connection_error("path does not exist".into())); }
				std::fs::create_dir_all(path).map_err(|e| connection_error(e.to_string()))?;
			} else if !path.is_dir() {
				return Err(connection_error("not a directory".into()));
			}
		}
		let conn = connect(uri).execute().await.map_err(|e| connection_error(e.to_string()))?;
		// listing forces the backend to read the target
		let names = conn.table_names().execute().await.map_err(|e| connection_error(e.to_string()))?;
		tracing::info!(uri, collections = names.len(), "opened collection store");
		Ok(Self {
			inner: Arc::new(StoreInner {
				conn,
				uri: uri.to_string(),
				registry: RwLock::new(HashMap::new()),
				create_lock: Mutex::new(()),
			}),
		})
	}

	pub fn uri(&self) -> &str { &self.inner.uri }

	/// Create the collection, or load it if it already exists.
	pub async fn ensure_collection(&self, name: &str, embed_dim: usize) -> Result<CollectionState> {
		validate_collection_name(name)?;
		if embed_dim == 0 || embed_dim > i32::MAX as usize {
			return Err(Error::InvalidInput(format!("embed_dim must be within 1..={}, got {embed_dim}", i32::MAX)));
		}
		let _guard = self.inner.create_lock.lock().await;
		if let Some(open) = self.inner.registry.read().await.get(name).cloned() {
			check_dim(&open.schema, embed_dim)?;
			return Ok(CollectionState::Loaded);
		}

		let arrow = build_collection_schema(embed_dim);
		let empty = RecordBatchIterator::new(vec![].into_iter(), arrow.clone());
		match self.inner.conn.create_table(name, Box::new(empty)).execute().await {
			Ok(table) => {
				let open = Arc::new(OpenCollection {
					table,
					schema: CollectionSchema::new(name, embed_dim),
					arrow,
					write_lock: Mutex::new(()),
				});
				self.inner.registry.write().await.insert(name.to_string(), open);
				tracing::info!(collection = name, embed_dim, "created collection");
				Ok(CollectionState::Created)
			}
			Err(lancedb::Error::TableAlreadyExists { .. }) => self.load_existing(name, embed_dim).await,
			Err(e) => {
				// another process may have won the race with a different error shape
				if self.exists(name).await? { return self.load_existing(name, embed_dim).await; }
				Err(Error::store("create_collection", name, e))
			}
		}
	}

	async fn load_existing(&self, name: &str, embed_dim: usize) -> Result<CollectionState> {
		let open = self.load(name).await?;
		check_dim(&open.schema, embed_dim)?;
		tracing::info!(collection = name, embed_dim, "loaded collection");
		Ok(CollectionState::Loaded)
	}

	pub async fn exists(&self, name: &str) -> Result<bool> {
		Ok(self.list_collections().await?.iter().any(|n| n == name))
	}

	pub async fn list_collections(&self) -> Result<Vec<String>> {
		let mut names = self.inner.conn.table_names().execute().await.map_err(|e| Error::store("list_collections", "*", e))?;
		names.sort();
		Ok(names)
	}

	/// Open the table and register it as loaded.
	pub async fn load_collection(&self, name: &str) -> Result<CollectionSchema> {
		Ok(self.load(name).await?.schema.clone())
	}

	/// Forget the loaded table. Data is untouched.
	pub async fn release_collection(&self, name: &str) -> Result<()> {
		let removed = self.inner.registry.write().await.remove(name);
		if removed.is_none() && !self.exists(name).await? {
			return Err(Error::CollectionNotFound(name.to_string()));
		}
		tracing::debug!(collection = name, "released collection");
		Ok(())
	}

	pub async fn schema(&self, name: &str) -> Result<CollectionSchema> {
		Ok(self.get_or_load(name).await?.schema.clone())
	}

	pub async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
		let registered = self.inner.registry.read().await.get(name).cloned();
		let load_state = if registered.is_some() { LoadState::Loaded } else { LoadState::NotLoad };
		let (table, schema) = match registered {
			Some(open) => (open.table.clone(), open.schema.clone()),
			None => {
				let table = self.open_table(name).await?;
				let schema = read_schema(name, &table).await?;
				(table, schema)
			}
		};
		let row_count = table.count_rows(None).await.map_err(|e| Error::store("collection_stats", name, e))?;
		Ok(CollectionStats { name: name.to_string(), row_count, embed_dim: schema.embed_dim, load_state })
	}

	pub async fn drop_collection(&self, name: &str) -> Result<()> {
		let _guard = self.inner.create_lock.lock().await;
		if !self.exists(name).await? {
			return Err(Error::CollectionNotFound(name.to_string()));
		}
		match self.inner.conn.drop_table(name, &[]).await {
			Ok(()) => {}
			Err(lancedb::Error::TableNotFound { .. }) => return Err(Error::CollectionNotFound(name.to_string())),
			Err(e) => return Err(Error::store("drop_collection", name, e)),
		}
		self.inner.registry.write().await.remove(name);
		tracing::info!(collection = name, "dropped collection");
		Ok(())
	}

	/// Validate every record, then append them in batches of at most
	/// `batch_size`. Ids continue from the current row count.
	pub async fn insert(&self, name: &str, records: &[Record], batch_size: usize) -> Result<InsertReport> {
		self.insert_into(name, records, batch_size, &mut TableSink).await
	}

	pub(crate) async fn insert_into<S: BatchSink>(&self, name: &str, records: &[Record], batch_size: usize, sink: &mut S) -> Result<InsertReport> {
		if batch_size == 0 {
			return Err(Error::InvalidInput("batch_size must be >= 1".into()));
		}
		let open = self.get_or_load(name).await?;
		let dim = open.schema.embed_dim;
		for (i, record) in records.iter().enumerate() {
			if record.dense.len() != dim {
				return Err(Error::DimensionMismatch { collection: name.to_string(), expected: dim, actual: record.dense.len(), record: Some(i) });
			}
			if record.text.len() > open.schema.max_text_bytes {
				return Err(Error::InvalidInput(format!("record {i}: text is {} bytes, limit is {}", record.text.len(), open.schema.max_text_bytes)));
			}
		}

		let start = Instant::now();
		let _write = open.write_lock.lock().await;
		let mut next_id = open.table.count_rows(None).await.map_err(|e| Error::store("insert", name, e))? as i64;
		let mut report = InsertReport { rows_written: 0, batches: Vec::new(), duration: Duration::ZERO };
		for (batch_index, batch) in records.chunks(batch_size).enumerate() {
			let partial = |source: Error, rows_written: usize| Error::PartialInsert {
				collection: name.to_string(),
				rows_written,
				batch_index,
				source: Box::new(source),
			};
			let rb = records_to_batch(open.arrow.clone(), dim, next_id, batch)
				.map_err(|e| partial(Error::store("insert", name, e), report.rows_written))?;
			if let Err(e) = sink.append(&open.table, rb).await {
				tracing::error!(collection = name, batch_index, rows_written = report.rows_written, error = %e, "batch write failed");
				return Err(partial(Error::store("insert", name, e), report.rows_written));
			}
			next_id += batch.len() as i64;
			report.rows_written += batch.len();
			report.batches.push(batch.len());
			tracing::debug!(collection = name, batch_index, rows = batch.len(), "committed batch");
		}
		report.duration = start.elapsed();
		tracing::info!(collection = name, rows = report.rows_written, batches = report.batches.len(), elapsed_ms = report.duration.as_millis() as u64, "inserted records");
		Ok(report)
	}

	pub(crate) async fn get_or_load(&self, name: &str) -> Result<Arc<OpenCollection>> {
		if let Some(open) = self.inner.registry.read().await.get(name).cloned() {
			return Ok(open);
		}
		self.load(name).await
	}

	async fn load(&self, name: &str) -> Result<Arc<OpenCollection>> {
		let table = self.open_table(name).await?;
		let schema = read_schema(name, &table).await?;
		let open = Arc::new(OpenCollection {
			table,
			arrow: build_collection_schema(schema.embed_dim),
			schema,
			write_lock: Mutex::new(()),
		});
		let mut registry = self.inner.registry.write().await;
		// keep the first registration so concurrent loaders share one write lock
		let open = registry.entry(name.to_string()).or_insert(open).clone();
		Ok(open)
	}

	async fn open_table(&self, name: &str) -> Result<Table> {
		match self.inner.conn.open_table(name).execute().await {
			Ok(table) => Ok(table),
			Err(lancedb::Error::TableNotFound { .. }) => Err(Error::CollectionNotFound(name.to_string())),
			Err(e) => Err(Error::store("open_collection", name, e)),
		}
	}
}

async fn read_schema(name: &str, table: &Table) -> Result<CollectionSchema> {
	let arrow = table.schema().await.map_err(|e| Error::store("load_collection", name, e))?;
	CollectionSchema::from_arrow(name, &arrow)
}

fn check_dim(schema: &CollectionSchema, embed_dim: usize) -> Result<()> {
	if schema.embed_dim != embed_dim {
		return Err(Error::DimensionMismatch { collection: schema.name.clone(), expected: schema.embed_dim, actual: embed_dim, record: None });
	}
	Ok(())
}
