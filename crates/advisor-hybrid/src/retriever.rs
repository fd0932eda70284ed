use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use advisor_core::config::RetrievalSettings;
use advisor_core::error::RetrievalError;
use advisor_core::traits::Embedder;
use advisor_core::types::DocumentChunk;

use crate::fusion::{fuse, FusionParams, RankedScore};
use crate::snapshot::IndexSnapshot;
use crate::store::RetrievalStore;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalParams {
    pub sparse_k: usize,
    pub dense_k: usize,
    pub fusion: FusionParams,
    pub min_dense_similarity: f32,
    pub timeout: Duration,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for RetrievalParams {
    fn from(s: &RetrievalSettings) -> Self {
        Self {
            sparse_k: s.sparse_k,
            dense_k: s.dense_k,
            fusion: FusionParams::from(s),
            min_dense_similarity: s.min_dense_similarity,
            timeout: Duration::from_secs(s.timeout_secs),
        }
    }
}

/// A retrieved chunk with its fused score and per-engine provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
    pub sparse: Option<RankedScore>,
    pub dense: Option<RankedScore>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub query: String,
    pub hits: Vec<ScoredChunk>,
    low_confidence: bool,
}

impl RetrievalResult {
    pub fn new(query: impl Into<String>, hits: Vec<ScoredChunk>, low_confidence: bool) -> Self {
        let low_confidence = low_confidence || hits.is_empty();
        Self { query: query.into(), hits, low_confidence }
    }

    pub fn empty(query: &str) -> Self {
        Self { query: query.to_string(), hits: Vec::new(), low_confidence: true }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Nothing retrieved, or no lexical overlap and only weak semantic matches.
    pub fn is_low_confidence(&self) -> bool {
        self.low_confidence
    }
}

/// Retrieve from one snapshot. Pure function of its inputs.
pub fn retrieve_from(
    snapshot: &IndexSnapshot,
    embedder: &dyn Embedder,
    query: &str,
    params: &RetrievalParams,
) -> Result<RetrievalResult, RetrievalError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RetrievalError::MalformedQuery("query is empty".to_string()));
    }
    let manifest = snapshot.manifest();
    if manifest.embedder_id != embedder.id() || manifest.dim != embedder.dim() {
        return Err(RetrievalError::EmbedderMismatch {
            index: format!("{} ({}d)", manifest.embedder_id, manifest.dim),
            configured: format!("{} ({}d)", embedder.id(), embedder.dim()),
        });
    }
    if snapshot.is_empty() {
        return Ok(RetrievalResult::empty(query));
    }

    let sparse_hits = if params.fusion.sparse_weight > 0.0 {
        snapshot
            .text()
            .search(query, params.sparse_k)
            .map_err(|e| RetrievalError::Sparse(e.to_string()))?
    } else {
        Vec::new()
    };

    let dense_hits = if params.fusion.dense_weight > 0.0 {
        let q_vec = embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("embedder returned no vector".to_string()))?;
        snapshot
            .vectors()
            .search_vec(&q_vec, params.dense_k)
            .map_err(|e| RetrievalError::Dense(e.to_string()))?
    } else {
        Vec::new()
    };

    let best_dense = dense_hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
    let fused = fuse(&sparse_hits, &dense_hits, &params.fusion);

    let mut hits = Vec::with_capacity(fused.len());
    for f in fused {
        let Some(chunk) = snapshot.chunk(&f.id) else {
            warn!(id = %f.id, "hit not in chunk catalogue");
            continue;
        };
        hits.push(ScoredChunk {
            chunk: chunk.clone(),
            score: f.score,
            sparse: f.sparse,
            dense: f.dense,
        });
    }

    let lexical_match = hits.iter().any(|h| h.sparse.is_some());
    let low_confidence =
        hits.is_empty() || (!lexical_match && best_dense < params.min_dense_similarity);
    debug!(
        sparse = sparse_hits.len(),
        dense = dense_hits.len(),
        fused = hits.len(),
        low_confidence,
        "retrieved"
    );
    Ok(RetrievalResult { query: query.to_string(), hits, low_confidence })
}

/// Retrieves against whatever snapshot the store currently publishes.
#[derive(Clone)]
pub struct HybridRetriever {
    store: Arc<RetrievalStore>,
    params: RetrievalParams,
}

impl HybridRetriever {
    pub fn new(store: Arc<RetrievalStore>, params: RetrievalParams) -> Self {
        Self { store, params }
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    pub fn store(&self) -> &Arc<RetrievalStore> {
        &self.store
    }

    pub fn retrieve_blocking(&self, query: &str) -> Result<RetrievalResult, RetrievalError> {
        let snapshot = self.store.snapshot()?;
        retrieve_from(&snapshot, self.store.embedder().as_ref(), query, &self.params)
    }

    /// Runs on the blocking pool, bounded by the configured timeout.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult, RetrievalError> {
        let this = self.clone();
        let query = query.to_string();
        let task = tokio::task::spawn_blocking(move || this.retrieve_blocking(&query));
        match tokio::time::timeout(self.params.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(RetrievalError::Task(join.to_string())),
            Err(_) => Err(RetrievalError::Timeout(self.params.timeout)),
        }
    }
}
