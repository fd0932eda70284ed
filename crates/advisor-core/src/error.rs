use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of an ingestion run. All of them abort the run except
/// [`IngestionError::Unsupported`] and [`IngestionError::Load`], which the
/// directory processor downgrades to a logged skip.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("knowledge base folder not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("no ingestible documents found in {}", .0.display())]
    NoDocuments(PathBuf),

    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("invalid chunking configuration: {0}")]
    InvalidChunking(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("failed to persist index at {}: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval index is not initialized: {0}")]
    Uninitialized(String),

    #[error(
        "index was built with embedder '{index}' but '{configured}' is configured; re-run ingestion"
    )]
    EmbedderMismatch { index: String, configured: String },

    #[error("malformed query: {0}")]
    MalformedQuery(String),

    #[error("sparse search failed: {0}")]
    Sparse(String),

    #[error("dense search failed: {0}")]
    Dense(String),

    #[error("query embedding failed: {0}")]
    Embedding(String),

    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),

    #[error("retrieval task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{provider} request failed: {reason}")]
    Provider { provider: &'static str, reason: String },

    #[error("{0} rate limited the request")]
    RateLimited(&'static str),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response from {provider}: {reason}")]
    MalformedResponse { provider: &'static str, reason: String },

    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("unknown LLM provider '{0}' (expected 'anthropic' or 'openai')")]
    UnknownProvider(String),
}

/// Umbrella error for callers that drive the whole pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

pub type Result<T> = std::result::Result<T, Error>;
