use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure taxonomy shared by the store, the ingestion pipeline and the
/// retriever. Every variant carries the collection or record it concerns.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to vector store at '{uri}': {reason}")]
    Connection { uri: String, reason: String },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error(
        "dimension mismatch in collection '{collection}'{}: expected {expected}, got {actual}",
        record_suffix(.record)
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
        record: Option<usize>,
    },

    #[error("embedding failed for chunk {chunk_id} of '{source_document}': {reason}")]
    Embedding {
        chunk_id: usize,
        source_document: String,
        reason: String,
    },

    #[error("embedding failed for query on collection '{collection}': {reason}")]
    QueryEmbedding { collection: String, reason: String },

    #[error("insert into '{collection}' failed at batch {batch_index} after {rows_written} committed rows: {source}")]
    PartialInsert {
        collection: String,
        rows_written: usize,
        batch_index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("{op} on collection '{collection}' failed: {source}")]
    Store {
        op: &'static str,
        collection: String,
        #[source]
        source: BoxError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn store(op: &'static str, collection: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Store { op, collection: collection.into(), source: source.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound(_))
    }

    /// Rows known to be committed when the operation failed.
    pub fn rows_written(&self) -> usize {
        match self {
            Self::PartialInsert { rows_written, .. } => *rows_written,
            _ => 0,
        }
    }
}

fn record_suffix(record: &Option<usize>) -> String {
    record.map(|r| format!(" (record {r})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
