//! BM25 sparse encoding.
//!
//! Documents are encoded with the saturated term-frequency part of BM25 and
//! queries with the IDF part, so the inner product of a query vector and a
//! document vector is the document's BM25 score for that query.

use std::collections::HashMap;
use std::hash::Hasher;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tantivy::tokenizer::TextAnalyzer;
use twox_hash::XxHash64;

use ragstore_core::config::SparseConfig;
use ragstore_core::traits::SparseEmbedder;
use ragstore_core::types::SparseVector;

use crate::tantivy_utils::{analyze, build_analyzer};

/// Stable 32-bit term index of an analysed token.
pub fn term_index(token: &str) -> u32 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    hasher.finish() as u32
}

/// Document-frequency statistics of a fitted corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub doc_count: u64,
    pub avg_doc_len: f32,
    pub doc_freq: HashMap<u32, u64>,
}

impl CorpusStats {
    pub fn fit<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let analyzer = build_analyzer();
        let mut stats = CorpusStats::default();
        let mut total_len = 0u64;
        for text in texts {
            let tokens = analyze(&analyzer, text);
            total_len += tokens.len() as u64;
            stats.doc_count += 1;
            let mut seen: Vec<u32> = tokens.iter().map(|t| term_index(t)).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *stats.doc_freq.entry(term).or_insert(0) += 1;
            }
        }
        if stats.doc_count > 0 {
            stats.avg_doc_len = total_len as f32 / stats.doc_count as f32;
        }
        stats
    }

    /// `ln(1 + (N - n + 0.5) / (n + 0.5))`, always positive.
    pub fn idf(&self, term: u32) -> f32 {
        let n = self.doc_freq.get(&term).copied().unwrap_or(0) as f32;
        let total = self.doc_count as f32;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json).with_context(|| format!("cannot write corpus stats to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read corpus stats from {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("malformed corpus stats in {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
    pub avg_doc_len: f32,
}

impl From<&SparseConfig> for Bm25Params {
    fn from(cfg: &SparseConfig) -> Self {
        Self { k1: cfg.k1, b: cfg.b, avg_doc_len: cfg.avg_doc_len }
    }
}

pub struct Bm25SparseEmbedder {
    analyzer: TextAnalyzer,
    params: Bm25Params,
    stats: Option<CorpusStats>,
}

impl Bm25SparseEmbedder {
    pub fn new(params: Bm25Params) -> Self {
        Self { analyzer: build_analyzer(), params, stats: None }
    }

    pub fn with_stats(params: Bm25Params, stats: CorpusStats) -> Self {
        Self { analyzer: build_analyzer(), params, stats: Some(stats) }
    }

    /// Build from config, loading `stats_path` when one is set.
    pub fn from_config(cfg: &SparseConfig) -> Result<Self> {
        let params = Bm25Params::from(cfg);
        match cfg.stats_path.as_deref() {
            Some(path) => {
                let path = ragstore_core::config::expand_path(path);
                let stats = CorpusStats::load(&path)?;
                tracing::info!(path = %path.display(), docs = stats.doc_count, terms = stats.doc_freq.len(), "loaded BM25 corpus stats");
                Ok(Self::with_stats(params, stats))
            }
            None => Ok(Self::new(params)),
        }
    }

    pub fn terms(&self, text: &str) -> Vec<u32> {
        analyze(&self.analyzer, text).iter().map(|t| term_index(t)).collect()
    }

    fn avg_doc_len(&self) -> f32 {
        match &self.stats {
            Some(s) if s.doc_count > 0 && s.avg_doc_len > 0.0 => s.avg_doc_len,
            _ => self.params.avg_doc_len,
        }
    }
}

impl SparseEmbedder for Bm25SparseEmbedder {
    fn embed(&self, text: &str) -> Result<SparseVector> {
        let terms = self.terms(text);
        let doc_len = terms.len() as f32;
        let mut tf: HashMap<u32, f32> = HashMap::new();
        for term in terms {
            *tf.entry(term).or_insert(0.0) += 1.0;
        }
        let Bm25Params { k1, b, .. } = self.params;
        let norm = k1 * (1.0 - b + b * doc_len / self.avg_doc_len());
        let weights = tf.into_iter().map(|(term, f)| (term, f * (k1 + 1.0) / (f + norm)));
        Ok(SparseVector::from_pairs(weights)?)
    }

    fn embed_query(&self, text: &str) -> Result<SparseVector> {
        let mut terms = self.terms(text);
        terms.sort_unstable();
        terms.dedup();
        let weights = terms.into_iter().map(|term| {
            let w = self.stats.as_ref().map(|s| s.idf(term)).unwrap_or(1.0);
            (term, w)
        });
        Ok(SparseVector::from_pairs(weights)?)
    }
}
