//! advisor-embed
//!
//! Sentence embeddings for chunks and queries. [`BertEmbedder`] runs a local
//! sentence-transformers checkpoint through candle; [`HashingEmbedder`] is a
//! deterministic bag-of-words stand-in for tests and offline setups.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use advisor_core::config::EmbeddingSettings;
use advisor_core::traits::Embedder;

pub mod bert;
pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use hashing::HashingEmbedder;
pub use pool::masked_mean_l2;

/// Build the embedder the settings ask for.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_hashing {
        info!(dim = settings.hashing_dim, "using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(settings.hashing_dim)));
    }
    let dir = settings.model_path();
    let model = BertEmbedder::load(&dir, &settings.model, settings.max_len)?;
    Ok(Arc::new(model))
}
