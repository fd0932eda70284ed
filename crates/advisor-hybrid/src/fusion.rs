//! Weighted Reciprocal Rank Fusion: `score(c) = Σ w_l / (k + rank_l(c))`.
//!
//! Rank-based, so BM25 and cosine scores never need a common scale.

use std::cmp::Ordering;
use std::collections::HashMap;

use advisor_core::config::RetrievalSettings;
use advisor_core::types::{ChunkId, SearchHit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub sparse_weight: f32,
    pub dense_weight: f32,
    pub rrf_k: f32,
    pub top_k: usize,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for FusionParams {
    fn from(s: &RetrievalSettings) -> Self {
        Self {
            sparse_weight: s.sparse_weight,
            dense_weight: s.dense_weight,
            rrf_k: s.rrf_k,
            top_k: s.top_k,
        }
    }
}

/// 1-based rank of a chunk in one engine's list, with that engine's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedScore {
    pub rank: usize,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: ChunkId,
    pub score: f32,
    pub sparse: Option<RankedScore>,
    pub dense: Option<RankedScore>,
}

/// Fuse the sparse and dense lists. A list with weight 0 contributes no
/// candidates. Ordering: fused score desc, sparse rank, dense rank (absent
/// ranks last), then id.
pub fn fuse(sparse: &[SearchHit], dense: &[SearchHit], params: &FusionParams) -> Vec<FusedHit> {
    let mut by_id: HashMap<&str, FusedHit> = HashMap::new();

    if params.sparse_weight > 0.0 {
        accumulate(&mut by_id, sparse, params.sparse_weight, params.rrf_k, |h, r| {
            h.sparse = Some(r);
        });
    }
    if params.dense_weight > 0.0 {
        accumulate(&mut by_id, dense, params.dense_weight, params.rrf_k, |h, r| h.dense = Some(r));
    }

    let mut fused: Vec<FusedHit> = by_id.into_values().collect();
    fused.sort_by(compare);
    fused.truncate(params.top_k);
    fused
}

fn accumulate<'a>(
    by_id: &mut HashMap<&'a str, FusedHit>,
    hits: &'a [SearchHit],
    weight: f32,
    rrf_k: f32,
    mut mark: impl FnMut(&mut FusedHit, RankedScore),
) {
    let mut seen = std::collections::HashSet::new();
    for hit in hits {
        // an engine should not repeat ids; if it does, the best rank wins
        if !seen.insert(hit.id.as_str()) {
            continue;
        }
        let rank = seen.len();
        let entry = by_id.entry(hit.id.as_str()).or_insert_with(|| FusedHit {
            id: hit.id.clone(),
            score: 0.0,
            sparse: None,
            dense: None,
        });
        entry.score += weight / (rrf_k + rank as f32);
        mark(entry, RankedScore { rank, score: hit.score });
    }
}

fn compare(a: &FusedHit, b: &FusedHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| rank_order(a.sparse, b.sparse))
        .then_with(|| rank_order(a.dense, b.dense))
        .then_with(|| a.id.cmp(&b.id))
}

fn rank_order(a: Option<RankedScore>, b: Option<RankedScore>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.rank.cmp(&y.rank),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
