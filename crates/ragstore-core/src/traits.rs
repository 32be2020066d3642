use crate::types::{DenseVector, SparseVector};

/// Produces fixed-dimension semantic embeddings.
pub trait DenseEmbedder: Send + Sync {
    /// Output dimensionality; every vector returned by `embed` has this length.
    fn dim(&self) -> usize;
    /// Stable identifier of the model behind the embedder.
    fn model_id(&self) -> &str;
    fn embed(&self, text: &str) -> anyhow::Result<DenseVector>;
}

/// Produces weighted-term embeddings compared by inner product.
pub trait SparseEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<SparseVector>;

    /// Encoding used for queries. Asymmetric schemes such as BM25 weight
    /// query terms differently from document terms.
    fn embed_query(&self, text: &str) -> anyhow::Result<SparseVector> {
        self.embed(text)
    }
}
