use arrow_array::types::Float32Type;
use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, Int64Array, ListArray, RecordBatch, RecordBatchIterator, StringArray, StructArray, UInt32Array};
use arrow_buffer::OffsetBuffer;
use arrow_schema::{ArrowError, SchemaRef};
use lancedb::Table;
use std::sync::Arc;

use ragstore_core::types::{Record, RecordId};

use crate::schema::{sparse_entry_fields, sparse_item_field};

/// Convert records into one Arrow batch with ids `first_id, first_id + 1, ...`.
pub fn records_to_batch(schema: SchemaRef, embed_dim: usize, first_id: RecordId, records: &[Record]) -> Result<RecordBatch, ArrowError> {
	let ids = Int64Array::from_iter_values((0..records.len() as i64).map(|i| first_id + i));

	let vectors = records.iter().map(|r| Some(r.dense.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
	let dense = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, embed_dim as i32);

	let terms: Vec<u32> = records.iter().flat_map(|r| r.sparse.entries().iter().map(|&(t, _)| t)).collect();
	let weights: Vec<f32> = records.iter().flat_map(|r| r.sparse.entries().iter().map(|&(_, w)| w)).collect();
	let entries = StructArray::try_new(
		sparse_entry_fields(),
		vec![Arc::new(UInt32Array::from(terms)) as ArrayRef, Arc::new(Float32Array::from(weights)) as ArrayRef],
		None,
	)?;
	let offsets = OffsetBuffer::<i32>::from_lengths(records.iter().map(|r| r.sparse.len()));
	let sparse = ListArray::try_new(sparse_item_field(), offsets, Arc::new(entries), None)?;

	let texts = StringArray::from_iter_values(records.iter().map(|r| r.text.as_str()));

	RecordBatch::try_new(schema, vec![
		Arc::new(ids),
		Arc::new(dense),
		Arc::new(sparse),
		Arc::new(texts),
	])
}

/// Destination of one committed write.
pub(crate) trait BatchSink {
	async fn append(&mut self, table: &Table, batch: RecordBatch) -> lancedb::Result<()>;
}

/// Appends straight to the Lance table.
pub(crate) struct TableSink;

impl BatchSink for TableSink {
	async fn append(&mut self, table: &Table, batch: RecordBatch) -> lancedb::Result<()> {
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		table.add(reader).execute().await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::build_collection_schema;
	use arrow_array::cast::AsArray;
	use ragstore_core::types::SparseVector;

	#[test]
	fn batch_layout_matches_collection_schema() {
		let records = vec![
			Record { dense: vec![1.0, 0.0], sparse: SparseVector::from_pairs([(3, 0.5)]).unwrap(), text: "a".into() },
			Record { dense: vec![0.0, 1.0], sparse: SparseVector::new(), text: "b".into() },
			Record { dense: vec![0.6, 0.8], sparse: SparseVector::from_pairs([(1, 1.0), (9, 2.0)]).unwrap(), text: "c".into() },
		];
		let batch = records_to_batch(build_collection_schema(2), 2, 10, &records).unwrap();
		assert_eq!(batch.num_rows(), 3);
		let ids = batch.column(0).as_primitive::<arrow_array::types::Int64Type>();
		assert_eq!(ids.values().to_vec(), vec![10, 11, 12]);
		let sparse = batch.column(2).as_list::<i32>();
		assert_eq!(sparse.value_length(0), 1);
		assert_eq!(sparse.value_length(1), 0);
		assert_eq!(sparse.value_length(2), 2);
	}
}
