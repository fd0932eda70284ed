//! advisor-text
//!
//! Tantivy-based sparse (BM25) indexing and search over document chunks.

pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::SparseIndexer;
pub use search::SparseSearcher;
