use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tracing::info;

use advisor_core::config::Settings;
use advisor_core::error::{Error, IngestionError, RetrievalError};
use advisor_core::traits::Embedder;

use crate::ingest::{prune, publish, read_current, IngestReport, Ingestor};
use crate::snapshot::IndexSnapshot;

/// Owner of the published index snapshot.
///
/// Readers take an `Arc` clone and keep using it even while a re-ingestion
/// swaps in a newer generation. Re-ingestion is serialised by `writer`.
pub struct RetrievalStore {
    persist_dir: PathBuf,
    ingestor: Ingestor,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    writer: Mutex<()>,
}

impl RetrievalStore {
    /// An uninitialised store; nothing is read from disk.
    pub fn new(persist_dir: PathBuf, ingestor: Ingestor) -> Self {
        Self {
            persist_dir,
            ingestor,
            current: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// A store configured from `settings` that skips the published index.
    /// Rebuilds use this so a damaged generation cannot block its own repair.
    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self, Error> {
        let chunking = settings.chunking_config()?;
        let ingestor = Ingestor::new(embedder, chunking, settings.embedding.batch_size);
        Ok(Self::new(settings.knowledge_base.persist_path(), ingestor))
    }

    /// Load the generation named by `CURRENT`, or start uninitialised.
    pub async fn open(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self, Error> {
        let store = Self::from_settings(settings, embedder)?;
        store.load_current().await?;
        Ok(store)
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.ingestor = self.ingestor.with_progress(show);
        self
    }

    pub async fn load_current(&self) -> Result<bool, RetrievalError> {
        let generation = read_current(&self.persist_dir).map_err(|e| {
            RetrievalError::Uninitialized(format!(
                "cannot read pointer in {}: {e}",
                self.persist_dir.display()
            ))
        })?;
        let Some(generation) = generation else {
            info!(dir = %self.persist_dir.display(), "no published index yet");
            return Ok(false);
        };
        let dir = self.persist_dir.join(&generation);
        let snapshot = IndexSnapshot::load(&dir)
            .await
            .map_err(|e| RetrievalError::Uninitialized(format!("generation {generation}: {e:#}")))?;
        info!(generation = %generation, chunks = snapshot.len(), "index loaded");
        self.install(snapshot);
        Ok(true)
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        self.ingestor.embedder()
    }

    /// Replace the in-memory snapshot.
    pub fn install(&self, snapshot: IndexSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    pub fn is_initialized(&self) -> bool {
        self.current.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>, RetrievalError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| RetrievalError::Uninitialized("run `advisor ingest` first".to_string()))
    }

    /// Full rebuild from `source_dir`: build, load, publish, swap, prune.
    pub async fn reingest(&self, source_dir: &Path) -> Result<IngestReport, IngestionError> {
        let _guard = self.writer.lock().await;
        let report = self.ingestor.build_generation(source_dir, &self.persist_dir).await?;
        let snapshot = IndexSnapshot::load(&report.generation_dir)
            .await
            .map_err(|e| IngestionError::Persist {
                path: report.generation_dir.clone(),
                reason: format!("{e:#}"),
            })?;
        publish(&self.persist_dir, &report.generation)?;
        self.install(snapshot);
        let removed = prune(&self.persist_dir, &report.generation);
        if !removed.is_empty() {
            info!(removed = ?removed, "pruned old generations");
        }
        info!(
            generation = %report.generation,
            chunks = report.chunk_count,
            skipped = report.skipped.len(),
            "ingestion complete"
        );
        Ok(report)
    }
}
