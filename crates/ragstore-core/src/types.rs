//! Domain types shared by the store, the ingestion pipeline and the retriever.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type RecordId = i64;
pub type DenseVector = Vec<f32>;

/// Raw document text handed in by the extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceText {
    pub text: String,
    pub source: String,
}

impl SourceText {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into() }
    }
}

/// A split of a source document that is embedded and stored as one record.
///
/// - `id`: position of the chunk within one ingestion call
/// - `source_document`: identity of the document the chunk came from
/// - `text`: the payload that is embedded and stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: usize,
    pub source_document: String,
    pub text: String,
}

/// Weighted term vector. Entries are kept sorted by term index with
/// duplicates merged and zero weights removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(u32, f32)>,
}

impl SparseVector {
    pub fn new() -> Self { Self::default() }

    /// Build from arbitrary `(term, weight)` pairs. Weights must be finite and
    /// non-negative; repeated terms are summed.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut entries: Vec<(u32, f32)> = Vec::new();
        for (term, weight) in pairs {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidInput(format!("sparse weight for term {term} must be finite and non-negative, got {weight}")));
            }
            entries.push((term, weight));
        }
        entries.sort_by_key(|&(term, _)| term);
        let mut merged: Vec<(u32, f32)> = Vec::with_capacity(entries.len());
        for (term, weight) in entries {
            match merged.last_mut() {
                Some((last, w)) if *last == term => *w += weight,
                _ => merged.push((term, weight)),
            }
        }
        merged.retain(|&(_, w)| w > 0.0);
        Ok(Self { entries: merged })
    }

    pub fn entries(&self) -> &[(u32, f32)] { &self.entries }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn weight(&self, term: u32) -> f32 {
        self.entries
            .binary_search_by_key(&term, |&(t, _)| t)
            .map(|i| self.entries[i].1)
            .unwrap_or(0.0)
    }

    /// Inner product; absent terms count as zero.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f32;
        while i < self.entries.len() && j < other.entries.len() {
            let (ta, wa) = self.entries[i];
            let (tb, wb) = other.entries[j];
            match ta.cmp(&tb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => { acc += wa * wb; i += 1; j += 1; }
            }
        }
        acc
    }
}

/// A record as handed to the store. The primary id is assigned on insert.
#[derive(Debug, Clone)]
pub struct Record {
    pub dense: DenseVector,
    pub sparse: SparseVector,
    pub text: String,
}

/// The vector field a hit came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VectorField {
    Dense,
    Sparse,
}

/// One element of a per-field ranked list. Higher `score` is better:
/// cosine similarity for the dense field, inner product for the sparse field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: RecordId,
    pub text: String,
    pub score: f32,
    pub field: VectorField,
}

/// A deduplicated result after rank fusion. Ranks are 1-indexed positions in
/// the per-field lists the record appeared in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedHit {
    pub id: RecordId,
    pub text: String,
    pub score: f32,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
}

impl FusedHit {
    pub fn best_rank(&self) -> usize {
        match (self.dense_rank, self.sparse_rank) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => usize::MAX,
        }
    }
}

/// Passage handed to the answer-generation step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPassage {
    pub text: String,
    pub score: f32,
}
