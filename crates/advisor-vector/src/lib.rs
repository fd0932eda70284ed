//! advisor-vector
//!
//! Dense side of the retrieval index. Chunk embeddings are persisted in a
//! LanceDB table (`chunk_vectors`) and loaded into memory for exact cosine
//! search, which keeps results reproducible for a given snapshot.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::DenseIndex;
pub use writer::VectorWriter;

pub const VECTOR_TABLE: &str = "chunk_vectors";
