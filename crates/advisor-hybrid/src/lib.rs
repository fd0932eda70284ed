//! advisor-hybrid
//!
//! Ingestion into immutable index generations, weighted reciprocal rank
//! fusion of sparse and dense results, and the store that publishes the
//! current generation to concurrent readers.

pub mod fusion;
pub mod ingest;
pub mod retriever;
pub mod snapshot;
pub mod store;

pub use fusion::{fuse, FusedHit, FusionParams, RankedScore};
pub use ingest::{IngestReport, Ingestor};
pub use retriever::{retrieve_from, HybridRetriever, RetrievalParams, RetrievalResult, ScoredChunk};
pub use snapshot::{IndexSnapshot, Manifest};
pub use store::RetrievalStore;
