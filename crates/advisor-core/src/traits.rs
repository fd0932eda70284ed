use crate::types::SearchHit;

pub trait Embedder: Send + Sync {
    /// Stable identifier recorded in the index manifest.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Lexical search over chunk text.
pub trait TextSearch: Send + Sync {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Nearest-neighbour search over chunk embeddings.
pub trait VectorSearch: Send + Sync {
    fn dim(&self) -> usize;
    fn search_vec(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
}
