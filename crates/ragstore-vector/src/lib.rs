//! ragstore-vector
//!
//! Collection Store over LanceDB: one table per collection with a fixed
//! `id / dense / sparse / text` schema, batched appends and per-field search.
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use schema::{CollectionSchema, FieldIndex, IndexKind, Metric, MAX_TEXT_BYTES};
pub use table::{CollectionState, CollectionStats, CollectionStore, InsertReport, LoadState};
