use arrow_schema::{DataType, Field, Fields, Schema};
use serde::Serialize;
use std::sync::Arc;

use ragstore_core::types::VectorField;
use ragstore_core::{Error, Result};

pub const ID_COL: &str = "id";
pub const DENSE_COL: &str = "dense";
pub const SPARSE_COL: &str = "sparse";
pub const TEXT_COL: &str = "text";

/// Upper bound on the UTF-8 size of a stored text.
pub const MAX_TEXT_BYTES: usize = 65_536;

pub fn sparse_entry_fields() -> Fields {
	Fields::from(vec![
		Field::new("index", DataType::UInt32, false),
		Field::new("weight", DataType::Float32, false),
	])
}

pub fn sparse_item_field() -> Arc<Field> {
	Arc::new(Field::new("item", DataType::Struct(sparse_entry_fields()), true))
}

pub fn build_collection_schema(embed_dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID_COL, DataType::Int64, false),
		Field::new(DENSE_COL, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), embed_dim as i32), true),
		Field::new(SPARSE_COL, DataType::List(sparse_item_field()), true),
		Field::new(TEXT_COL, DataType::Utf8, false),
	]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
	Cosine,
	InnerProduct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
	/// Exhaustive scan over every stored vector.
	Flat,
	/// Only records sharing at least one term with the query are candidates.
	Inverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldIndex {
	pub field: VectorField,
	pub metric: Metric,
	pub kind: IndexKind,
}

/// Logical view of a collection's fixed schema and per-field index settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSchema {
	pub name: String,
	pub embed_dim: usize,
	pub dense: FieldIndex,
	pub sparse: FieldIndex,
	pub max_text_bytes: usize,
}

impl CollectionSchema {
	pub fn new(name: &str, embed_dim: usize) -> Self {
		Self {
			name: name.to_string(),
			embed_dim,
			dense: FieldIndex { field: VectorField::Dense, metric: Metric::Cosine, kind: IndexKind::Flat },
			sparse: FieldIndex { field: VectorField::Sparse, metric: Metric::InnerProduct, kind: IndexKind::Inverted },
			max_text_bytes: MAX_TEXT_BYTES,
		}
	}

	/// Rebuild from a stored table schema, rejecting tables that were not
	/// created as collections.
	pub fn from_arrow(name: &str, schema: &Schema) -> Result<Self> {
		let incompatible = |what: String| Error::store("load_collection", name, format!("incompatible table schema: {what}"));
		let field = |col: &str| schema.field_with_name(col).map_err(|_| incompatible(format!("missing column '{col}'")));

		if field(ID_COL)?.data_type() != &DataType::Int64 { return Err(incompatible(format!("'{ID_COL}' must be Int64"))); }
		if field(TEXT_COL)?.data_type() != &DataType::Utf8 { return Err(incompatible(format!("'{TEXT_COL}' must be Utf8"))); }
		let sparse_ok = match field(SPARSE_COL)?.data_type() {
			DataType::List(item) => match item.data_type() {
				DataType::Struct(fields) => fields.iter().map(|f| f.name().as_str()).eq(["index", "weight"]),
				_ => false,
			},
			_ => false,
		};
		if !sparse_ok {
			return Err(incompatible(format!("'{SPARSE_COL}' must be List<Struct<index, weight>>")));
		}
		let embed_dim = match field(DENSE_COL)?.data_type() {
			DataType::FixedSizeList(item, dim) if item.data_type() == &DataType::Float32 && *dim > 0 => *dim as usize,
			other => return Err(incompatible(format!("'{DENSE_COL}' must be FixedSizeList<Float32>, got {other}"))),
		};
		Ok(Self::new(name, embed_dim))
	}
}

/// Collection names: a letter or underscore, then up to 254 letters, digits,
/// underscores or hyphens.
pub fn validate_collection_name(name: &str) -> Result<()> {
	let mut chars = name.chars();
	let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
	let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
	if !valid_first || !valid_rest || name.len() > 255 {
		return Err(Error::InvalidInput(format!("invalid collection name '{name}'")));
	}
	Ok(())
}
