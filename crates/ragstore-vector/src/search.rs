use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int64Type, UInt32Type};
use arrow_array::{Array, RecordBatch};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::DistanceType;

use ragstore_core::types::{SearchHit, SparseVector, VectorField};
use ragstore_core::{Error, Result};

use crate::schema::{DENSE_COL, ID_COL, SPARSE_COL, TEXT_COL};
use crate::table::CollectionStore;

impl CollectionStore {
	/// Top-`k` records by cosine similarity (`1 - cosine distance`) on the dense field.
	pub async fn search_dense(&self, name: &str, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		let open = self.get_or_load(name).await?;
		if vector.len() != open.schema.embed_dim {
			return Err(Error::DimensionMismatch { collection: name.to_string(), expected: open.schema.embed_dim, actual: vector.len(), record: None });
		}
		let op = "search_dense";
		if k == 0 || open.table.count_rows(None).await.map_err(|e| Error::store(op, name, e))? == 0 {
			return Ok(Vec::new());
		}
		let mut stream = open
			.table
			.vector_search(vector.to_vec())
			.map_err(|e| Error::store(op, name, e))?
			.column(DENSE_COL)
			.distance_type(DistanceType::Cosine)
			.select(Select::columns(&[ID_COL, TEXT_COL]))
			.limit(k)
			.execute()
			.await
			.map_err(|e| Error::store(op, name, e))?;

		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(|e| Error::store(op, name, e))? {
			let (ids, texts) = id_and_text(&batch, name, op)?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_primitive_opt::<Float32Type>())
				.ok_or_else(|| missing_column(name, op, "_distance"))?;
			for i in 0..batch.num_rows() {
				hits.push(SearchHit { id: ids.value(i), text: texts.value(i).to_string(), score: 1.0 - distances.value(i), field: VectorField::Dense });
			}
		}
		Ok(rank(hits, k))
	}

	/// Top-`k` records by inner product on the sparse field. Records sharing
	/// no term with the query are never returned.
	pub async fn search_sparse(&self, name: &str, query: &SparseVector, k: usize) -> Result<Vec<SearchHit>> {
		let open = self.get_or_load(name).await?;
		if k == 0 || query.is_empty() {
			return Ok(Vec::new());
		}
		let op = "search_sparse";
		let mut stream = open
			.table
			.query()
			.select(Select::columns(&[ID_COL, TEXT_COL, SPARSE_COL]))
			.execute()
			.await
			.map_err(|e| Error::store(op, name, e))?;

		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(|e| Error::store(op, name, e))? {
			let (ids, texts) = id_and_text(&batch, name, op)?;
			let sparse = batch
				.column_by_name(SPARSE_COL)
				.and_then(|c| c.as_list_opt::<i32>())
				.ok_or_else(|| missing_column(name, op, SPARSE_COL))?;
			for i in 0..batch.num_rows() {
				if sparse.is_null(i) { continue; }
				let entries = sparse.value(i);
				let entries = entries.as_struct_opt().ok_or_else(|| missing_column(name, op, "sparse.item"))?;
				let terms = entries
					.column_by_name("index")
					.and_then(|c| c.as_primitive_opt::<UInt32Type>())
					.ok_or_else(|| missing_column(name, op, "sparse.index"))?;
				let weights = entries
					.column_by_name("weight")
					.and_then(|c| c.as_primitive_opt::<Float32Type>())
					.ok_or_else(|| missing_column(name, op, "sparse.weight"))?;
				let score: f32 = terms.values().iter().zip(weights.values().iter()).map(|(&t, &w)| query.weight(t) * w).sum();
				if score > 0.0 {
					hits.push(SearchHit { id: ids.value(i), text: texts.value(i).to_string(), score, field: VectorField::Sparse });
				}
			}
		}
		Ok(rank(hits, k))
	}
}

fn id_and_text<'a>(batch: &'a RecordBatch, name: &str, op: &'static str) -> Result<(&'a arrow_array::Int64Array, &'a arrow_array::StringArray)> {
	let ids = batch
		.column_by_name(ID_COL)
		.and_then(|c| c.as_primitive_opt::<Int64Type>())
		.ok_or_else(|| missing_column(name, op, ID_COL))?;
	let texts = batch
		.column_by_name(TEXT_COL)
		.and_then(|c| c.as_string_opt::<i32>())
		.ok_or_else(|| missing_column(name, op, TEXT_COL))?;
	Ok((ids, texts))
}

fn missing_column(name: &str, op: &'static str, column: &str) -> Error {
	Error::store(op, name, format!("result batch has no usable '{column}' column"))
}

/// Score descending, then id ascending; at most `k` hits.
fn rank(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
	hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
	hits.truncate(k);
	hits
}
