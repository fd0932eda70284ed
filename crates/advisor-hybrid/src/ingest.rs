//! Ingestion: load, chunk, embed and persist one generation.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use advisor_core::chunking::ChunkingConfig;
use advisor_core::data_processor::{DataProcessor, LoadedFile, SkippedFile};
use advisor_core::error::IngestionError;
use advisor_core::traits::Embedder;
use advisor_core::types::DocumentChunk;
use advisor_text::SparseIndexer;
use advisor_vector::{VectorWriter, VECTOR_TABLE};

use crate::snapshot::{Manifest, CHUNKS_FILE, MANIFEST_FILE, SPARSE_DIR, VECTORS_DIR};

pub const CURRENT_FILE: &str = "CURRENT";
const GENERATION_PREFIX: &str = "gen-";

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub generation: String,
    pub generation_dir: PathBuf,
    pub loaded: Vec<LoadedFile>,
    pub skipped: Vec<SkippedFile>,
    pub chunk_count: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    batch_size: usize,
    show_progress: bool,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkingConfig, batch_size: usize) -> Self {
        Self { embedder, chunking, batch_size: batch_size.max(1), show_progress: false }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Build a complete generation under `persist_dir` without publishing it.
    pub async fn build_generation(
        &self,
        source_dir: &Path,
        persist_dir: &Path,
    ) -> Result<IngestReport, IngestionError> {
        let processor = DataProcessor::new(self.chunking);
        let source = source_dir.to_path_buf();
        let corpus = tokio::task::spawn_blocking(move || processor.process_directory(&source))
            .await
            .map_err(|e| IngestionError::Load {
                path: source_dir.to_path_buf(),
                reason: e.to_string(),
            })??;

        let embedder = Arc::clone(&self.embedder);
        let batch_size = self.batch_size;
        let progress = self.progress_bar(corpus.chunks.len());
        let chunks = corpus.chunks;
        let (chunks, embeddings) = tokio::task::spawn_blocking(move || {
            let embeddings = embed_chunks(embedder.as_ref(), &chunks, batch_size, &progress);
            progress.finish_and_clear();
            embeddings.map(|e| (chunks, e))
        })
        .await
        .map_err(|e| IngestionError::Embedding(e.to_string()))??;

        let (generation, generation_dir) = allocate_generation(persist_dir)?;
        let manifest = Manifest {
            generation: generation.clone(),
            created_at: Utc::now(),
            chunk_count: chunks.len(),
            embedder_id: self.embedder.id().to_string(),
            dim: self.embedder.dim(),
            chunk_size: self.chunking.size(),
            chunk_overlap: self.chunking.overlap(),
        };
        if let Err(e) = write_generation(&generation_dir, &manifest, chunks, &embeddings).await {
            if let Err(cleanup) = fs::remove_dir_all(&generation_dir) {
                warn!(
                    dir = %generation_dir.display(),
                    error = %cleanup,
                    "failed to remove partial generation"
                );
            }
            return Err(e);
        }

        info!(generation = %generation, chunks = manifest.chunk_count, "generation built");
        Ok(IngestReport {
            generation,
            generation_dir,
            loaded: corpus.loaded,
            skipped: corpus.skipped,
            chunk_count: manifest.chunk_count,
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                 {pos}/{len} chunks ({percent}%) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message("embedding");
        pb
    }
}

/// Embed chunk texts in batches, checking every vector's dimension.
pub fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[DocumentChunk],
    batch_size: usize,
    progress: &ProgressBar,
) -> Result<Vec<Vec<f32>>, IngestionError> {
    let mut out = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| IngestionError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(IngestionError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
            return Err(IngestionError::Embedding(format!(
                "embedder returned dimension {} instead of {}",
                bad.len(),
                embedder.dim()
            )));
        }
        out.extend(vectors);
        progress.inc(batch.len() as u64);
    }
    Ok(out)
}

async fn write_generation(
    dir: &Path,
    manifest: &Manifest,
    chunks: Vec<DocumentChunk>,
    embeddings: &[Vec<f32>],
) -> Result<(), IngestionError> {
    let persist = |path: &Path, e: &dyn std::fmt::Display| IngestionError::Persist {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
    let sparse_dir = dir.join(SPARSE_DIR);
    let chunks = {
        let task_dir = sparse_dir.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<DocumentChunk>> {
            SparseIndexer::create_in_dir(&task_dir)?.index(&chunks)?;
            Ok(chunks)
        })
        .await
        .map_err(|e| persist(&sparse_dir, &e))?
        .map_err(|e| persist(&sparse_dir, &e))?
    };

    let vectors_dir = dir.join(VECTORS_DIR);
    let writer = VectorWriter::new(&vectors_dir, VECTOR_TABLE)
        .await
        .map_err(|e| persist(&vectors_dir, &e))?;
    writer
        .write(&ids, embeddings, manifest.dim)
        .await
        .map_err(|e| persist(&vectors_dir, &e))?;

    let chunks_path = dir.join(CHUNKS_FILE);
    let bytes = serde_json::to_vec(&chunks).map_err(|e| persist(&chunks_path, &e))?;
    fs::write(&chunks_path, bytes).map_err(|e| persist(&chunks_path, &e))?;

    // manifest last: a generation without one is incomplete
    let manifest_path = dir.join(MANIFEST_FILE);
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| persist(&manifest_path, &e))?;
    fs::write(&manifest_path, bytes).map_err(|e| persist(&manifest_path, &e))?;
    Ok(())
}

fn allocate_generation(persist_dir: &Path) -> Result<(String, PathBuf), IngestionError> {
    fs::create_dir_all(persist_dir).map_err(|e| IngestionError::Persist {
        path: persist_dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let name = format!("{GENERATION_PREFIX}{millis}");
        let dir = persist_dir.join(&name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((name, dir)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => millis += 1,
            Err(e) => {
                return Err(IngestionError::Persist { path: dir, reason: e.to_string() });
            }
        }
    }
}

/// Generation named by `CURRENT`, if any.
pub fn read_current(persist_dir: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(persist_dir.join(CURRENT_FILE)) {
        Ok(s) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Point `CURRENT` at `generation` via write-then-rename.
pub fn publish(persist_dir: &Path, generation: &str) -> Result<(), IngestionError> {
    let current = persist_dir.join(CURRENT_FILE);
    let tmp = persist_dir.join(format!("{CURRENT_FILE}.tmp"));
    fs::write(&tmp, generation)
        .and_then(|()| fs::rename(&tmp, &current))
        .map_err(|e| IngestionError::Persist { path: current, reason: e.to_string() })
}

/// Remove every generation directory except `keep`. Failures are logged.
pub fn prune(persist_dir: &Path, keep: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(persist_dir) else {
        return Vec::new();
    };
    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(GENERATION_PREFIX) || name == keep || !entry.path().is_dir() {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => removed.push(name),
            Err(e) => warn!(generation = %name, error = %e, "failed to prune generation"),
        }
    }
    removed.sort();
    removed
}
