//! ragstore-text
//!
//! Lexical side of hybrid retrieval: the tantivy analysis chain and the BM25
//! sparse embedder built on it.
pub mod bm25;
pub mod tantivy_utils;

pub use bm25::{term_index, Bm25Params, Bm25SparseEmbedder, CorpusStats};
