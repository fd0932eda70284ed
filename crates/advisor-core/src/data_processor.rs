use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunking::{window_spans, ChunkingConfig};
use crate::error::IngestionError;
use crate::loader;
use crate::types::{DocumentChunk, RawDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub name: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Chunks of a whole source folder plus what happened to each file.
#[derive(Debug, Clone, Default)]
pub struct ProcessedCorpus {
    pub chunks: Vec<DocumentChunk>,
    pub loaded: Vec<LoadedFile>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    chunking: ChunkingConfig,
}

impl DataProcessor {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Load and chunk every supported file directly inside `data_dir`.
    ///
    /// Unsupported or unreadable files are skipped with a warning; the call
    /// fails only when the folder is missing or nothing ingestible remains.
    pub fn process_directory(&self, data_dir: &Path) -> Result<ProcessedCorpus, IngestionError> {
        if !data_dir.is_dir() {
            return Err(IngestionError::SourceNotFound(data_dir.to_path_buf()));
        }

        let mut corpus = ProcessedCorpus::default();
        for path in list_files(data_dir) {
            let name = file_name(&path);
            if !loader::is_supported(&path) {
                warn!(file = %name, "skipping unsupported file");
                corpus.skipped.push(SkippedFile {
                    name,
                    reason: "unsupported file type".to_string(),
                });
                continue;
            }

            let docs = match loader::load_file(&path) {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(file = %name, error = %e, "skipping unreadable file");
                    corpus.skipped.push(SkippedFile {
                        name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let chunks = self.chunk_documents(&name, &docs);
            info!(file = %name, chunks = chunks.len(), "loaded");
            corpus.loaded.push(LoadedFile {
                name,
                chunks: chunks.len(),
            });
            corpus.chunks.extend(chunks);
        }

        if corpus.chunks.is_empty() {
            return Err(IngestionError::NoDocuments(data_dir.to_path_buf()));
        }
        Ok(corpus)
    }

    /// Chunk the raw documents of one file. Chunk numbering runs across all
    /// of them so ids stay unique within the file.
    pub fn chunk_documents(&self, file_key: &str, docs: &[RawDocument]) -> Vec<DocumentChunk> {
        let mut out = Vec::new();
        for doc in docs {
            for span in window_spans(&doc.text, &self.chunking) {
                let chunk_index = out.len();
                out.push(DocumentChunk {
                    id: format!("{file_key}:{chunk_index}"),
                    source: doc.source.clone(),
                    page: doc.page,
                    start: span.start,
                    end: span.end,
                    chunk_index,
                    content: doc.text[span.start..span.end].to_string(),
                });
            }
        }
        out
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
