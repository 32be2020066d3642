// Reciprocal Rank Fusion (RRF) over the dense and sparse ranked lists

use std::cmp::Ordering;
use std::collections::HashMap;

use ragstore_core::types::{FusedHit, RecordId, SearchHit, VectorField};

/// Smoothing constant from Cormack, Clarke and Buettcher (SIGIR 2009).
pub const RRF_K: f32 = 60.0;

/// RRF_score(d) = sum over lists of 1 / (rrf_k + rank(d)), ranks 1-indexed.
///
/// Only positions matter; the per-field scores are ignored. Results are
/// sorted by fused score descending, then by the better of the two ranks,
/// then by record id, and truncated to `k`.
pub fn reciprocal_rank_fusion(dense: &[SearchHit], sparse: &[SearchHit], rrf_k: f32, k: usize) -> Vec<FusedHit> {
	let mut fused: HashMap<RecordId, FusedHit> = HashMap::new();

	for (list, field) in [(dense, VectorField::Dense), (sparse, VectorField::Sparse)] {
		for (position, hit) in list.iter().enumerate() {
			let rank = position + 1;
			let entry = fused.entry(hit.id).or_insert_with(|| FusedHit {
				id: hit.id,
				text: hit.text.clone(),
				score: 0.0,
				dense_rank: None,
				sparse_rank: None,
			});
			let slot = match field {
				VectorField::Dense => &mut entry.dense_rank,
				VectorField::Sparse => &mut entry.sparse_rank,
			};
			// a record listed twice in one field keeps its first rank
			if slot.is_some() { continue; }
			*slot = Some(rank);
			entry.score += 1.0 / (rrf_k + rank as f32);
		}
	}

	let mut combined: Vec<FusedHit> = fused.into_values().collect();
	combined.sort_by(fused_order);
	combined.truncate(k);
	combined
}

fn fused_order(a: &FusedHit, b: &FusedHit) -> Ordering {
	b.score
		.total_cmp(&a.score)
		.then(a.best_rank().cmp(&b.best_rank()))
		.then(a.id.cmp(&b.id))
}
