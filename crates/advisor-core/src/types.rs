//! Domain types shared by the loaders, the engines and the retriever.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Text extracted from one source file, or one page/row of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub source: String,
    pub page: Option<u32>,
    pub text: String,
}

/// A chunk of a source document that is independently indexed.
///
/// - `id`: `"<file name>:<n>"`, unique within a generation
/// - `source`: path of the originating file
/// - `page`: 1-based page for paged formats
/// - `start`/`end`: byte offsets into the raw document text; `content` is
///   exactly that slice
/// - `chunk_index`: position among all chunks of the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub source: String,
    pub page: Option<u32>,
    pub start: usize,
    pub end: usize,
    pub chunk_index: usize,
    pub content: String,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Sparse,
    Dense,
}

/// The minimal surface returned by all engines.
///
/// `id` matches `DocumentChunk::id`. `score` is engine-specific but
/// higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}
