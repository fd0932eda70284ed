//! One immutable generation of the index set.
//!
//! On disk a generation is a directory `gen-<millis>/` with `sparse/`
//! (tantivy), `vectors/` (LanceDB), `chunks.json` and `manifest.json`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use advisor_core::traits::{TextSearch, VectorSearch};
use advisor_core::types::DocumentChunk;
use advisor_text::{SparseIndexer, SparseSearcher};
use advisor_vector::{DenseIndex, VECTOR_TABLE};

pub const SPARSE_DIR: &str = "sparse";
pub const VECTORS_DIR: &str = "vectors";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: String,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
    pub embedder_id: String,
    pub dim: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

pub struct IndexSnapshot {
    manifest: Manifest,
    chunks: Vec<DocumentChunk>,
    by_id: HashMap<String, usize>,
    sparse: SparseSearcher,
    dense: DenseIndex,
}

impl IndexSnapshot {
    /// Build a snapshot entirely in memory. Used for tests and for callers
    /// that never persist.
    pub fn build_in_memory(
        manifest: Manifest,
        chunks: Vec<DocumentChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        let indexer = SparseIndexer::create_in_ram()?;
        indexer.index(&chunks)?;
        let sparse = indexer.into_searcher()?;
        let ids = chunks.iter().map(|c| c.id.clone()).collect();
        let dense = DenseIndex::from_parts(manifest.dim, ids, embeddings)?;
        Self::assemble(manifest, chunks, sparse, dense)
    }

    pub async fn load(gen_dir: &Path) -> Result<Self> {
        let manifest: Manifest = read_json(&gen_dir.join(MANIFEST_FILE))?;
        let chunks: Vec<DocumentChunk> = read_json(&gen_dir.join(CHUNKS_FILE))?;
        let sparse = SparseSearcher::open(&gen_dir.join(SPARSE_DIR))
            .with_context(|| format!("opening sparse index in {}", gen_dir.display()))?;
        let dense = DenseIndex::load(&gen_dir.join(VECTORS_DIR), VECTOR_TABLE, manifest.dim)
            .await
            .with_context(|| format!("loading vectors in {}", gen_dir.display()))?;
        Self::assemble(manifest, chunks, sparse, dense)
    }

    fn assemble(
        manifest: Manifest,
        chunks: Vec<DocumentChunk>,
        sparse: SparseSearcher,
        dense: DenseIndex,
    ) -> Result<Self> {
        if chunks.len() != manifest.chunk_count || dense.len() != chunks.len() {
            bail!(
                "generation {} is inconsistent: manifest {} chunks, catalogue {}, vectors {}",
                manifest.generation,
                manifest.chunk_count,
                chunks.len(),
                dense.len()
            );
        }
        let by_id = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        Ok(Self { manifest, chunks, by_id, sparse, dense })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn generation(&self) -> &str {
        &self.manifest.generation
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk(&self, id: &str) -> Option<&DocumentChunk> {
        self.by_id.get(id).map(|&i| &self.chunks[i])
    }

    pub fn text(&self) -> &dyn TextSearch {
        &self.sparse
    }

    pub fn vectors(&self) -> &dyn VectorSearch {
        &self.dense
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}
