#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use advisor_chat::llm::MockModel;
use advisor_chat::{Advisor, AnswerEngine, GenerationParams, MemoryPolicy};
use advisor_core::config::Settings;
use advisor_core::traits::Embedder;
use advisor_embed::HashingEmbedder;
use advisor_hybrid::{HybridRetriever, RetrievalParams, RetrievalStore};

pub const THREE_SENTENCES: &str =
    "Indexed universal life policies credit interest based on a market index. \
Caps limit the maximum credited rate in strong years. \
A floor protects the cash value from market losses.";

pub struct Fixture {
    pub kb: TempDir,
    pub persist: TempDir,
    pub settings: Settings,
    pub store: Arc<RetrievalStore>,
}

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(256))
}

/// A knowledge base of `files`, ingested into a fresh store.
pub async fn fixture(files: &[(&str, &str)]) -> Fixture {
    let kb = tempfile::tempdir().unwrap();
    let persist = tempfile::tempdir().unwrap();
    for (name, text) in files {
        fs::write(kb.path().join(name), text).unwrap();
    }
    let mut settings = Settings::default();
    settings.knowledge_base.source_dir = kb.path().display().to_string();
    settings.knowledge_base.persist_dir = persist.path().display().to_string();
    settings.embedding.use_hashing = true;
    settings.embedding.hashing_dim = 256;

    let store = Arc::new(RetrievalStore::open(&settings, embedder()).await.unwrap());
    store.reingest(Path::new(&settings.knowledge_base.source_dir)).await.unwrap();
    Fixture { kb, persist, settings, store }
}

pub fn advisor(fx: &Fixture, model: MockModel, llm_timeout: Duration) -> Advisor<MockModel> {
    let params = RetrievalParams::from(&fx.settings.retrieval);
    let retriever = HybridRetriever::new(Arc::clone(&fx.store), params);
    let engine = AnswerEngine::new(model, GenerationParams::from(&fx.settings.llm), llm_timeout);
    Advisor::new(retriever, engine, MemoryPolicy::from(&fx.settings.memory))
}
