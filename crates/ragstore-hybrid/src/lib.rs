//! ragstore-hybrid
//!
//! Wires the embedders and the collection store together: ingestion,
//! hybrid retrieval with reciprocal-rank fusion, and the service entry points.
pub mod context;
pub mod fusion;
pub mod pipeline;
pub mod retriever;
pub mod service;

pub use context::ServiceContext;
pub use fusion::{reciprocal_rank_fusion, RRF_K};
pub use pipeline::{ingest_chunks, IngestReport};
pub use retriever::retrieve;
pub use service::{IngestResponse, Timings, UPLOAD_MESSAGE};
