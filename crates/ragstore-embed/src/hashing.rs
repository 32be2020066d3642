use std::hash::Hasher;

use anyhow::{ensure, Result};
use twox_hash::XxHash64;

use ragstore_core::traits::DenseEmbedder;
use ragstore_core::types::DenseVector;

/// Model-free dense embedder: signed feature hashing of lowercase
/// alphanumeric tokens into `dim` buckets, L2-normalised.
pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        ensure!(dim > 0, "hashing embedder dimension must be >= 1");
        Ok(Self { dim, model_id: format!("hashing-{dim}") })
    }
}

impl DenseEmbedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn model_id(&self) -> &str { &self.model_id }

    fn embed(&self, text: &str) -> Result<DenseVector> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            // no tokens, or every bucket cancelled out
            v[0] = 1.0;
            return Ok(v);
        }
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}
