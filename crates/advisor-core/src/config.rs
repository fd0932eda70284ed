//! Layered configuration and path helpers.
//!
//! Figment merges, lowest priority first: built-in defaults, `config.toml`,
//! `config.<env>.toml`, the legacy variables (`KB_DIR`, `PERSIST_DIR`,
//! `EMBEDDING_MODEL`, `LLM_PROVIDER`) and `APP_*` variables with `__` between
//! sections (`APP_RETRIEVAL__TOP_K=8`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::{Uncased, UncasedStr},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunking::ChunkingConfig;
use crate::error::ConfigError;

const LEGACY_VARS: [(&str, &str); 4] = [
    ("KB_DIR", "knowledge_base.source_dir"),
    ("PERSIST_DIR", "knowledge_base.persist_dir"),
    ("EMBEDDING_MODEL", "embedding.model"),
    ("LLM_PROVIDER", "llm.provider"),
];

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        let legacy: Vec<&str> = LEGACY_VARS.iter().map(|(var, _)| *var).collect();
        figment = figment
            .merge(Env::raw().only(&legacy).map(legacy_key))
            .merge(Env::prefixed("APP_").split("__"));

        let config = Self {
            figment,
            env_name: env_name.to_string(),
        };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(self.figment.extract_inner(key)?)
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Ok(self.figment.extract()?)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }
}

fn legacy_key(key: &UncasedStr) -> Uncased<'_> {
    LEGACY_VARS
        .iter()
        .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
        .map_or_else(|| Uncased::from(key.as_str()), |(_, path)| Uncased::from(*path))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub knowledge_base: KnowledgeBaseSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub memory: MemorySettings,
    pub routing: RoutingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ChunkingConfig::new(self.chunking.size, self.chunking.overlap)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let r = &self.retrieval;
        if r.top_k == 0 {
            return Err(ConfigError::Invalid("retrieval.top_k must be > 0".into()));
        }
        if r.sparse_weight < 0.0 || r.dense_weight < 0.0 {
            return Err(ConfigError::Invalid(
                "retrieval weights must be non-negative".into(),
            ));
        }
        if r.sparse_weight == 0.0 && r.dense_weight == 0.0 {
            return Err(ConfigError::Invalid(
                "at least one retrieval weight must be positive".into(),
            ));
        }
        if r.rrf_k < 0.0 {
            return Err(ConfigError::Invalid("retrieval.rrf_k must be >= 0".into()));
        }
        if r.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be > 0 seconds".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature {} outside 0.0..=2.0",
                self.llm.temperature
            )));
        }
        if self.embedding.use_hashing && self.embedding.hashing_dim == 0 {
            return Err(ConfigError::Invalid(
                "embedding.hashing_dim must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn chunking_config(&self) -> Result<ChunkingConfig, ConfigError> {
        ChunkingConfig::new(self.chunking.size, self.chunking.overlap)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub source_dir: String,
    pub persist_dir: String,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            source_dir: "knowledge_base".to_string(),
            persist_dir: "index_store".to_string(),
        }
    }
}

impl KnowledgeBaseSettings {
    pub fn source_path(&self) -> PathBuf {
        expand_path(&self.source_dir)
    }

    pub fn persist_path(&self) -> PathBuf {
        expand_path(&self.persist_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 100,
        }
    }
}

/// `model` is a Hugging Face style id; its weights are read from `model_dir`
/// or `models/<last id segment>`. `use_hashing` swaps in the deterministic
/// hashing embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub model_dir: Option<String>,
    pub use_hashing: bool,
    pub hashing_dim: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            use_hashing: false,
            hashing_dim: 384,
            max_len: 256,
            batch_size: 32,
        }
    }
}

impl EmbeddingSettings {
    pub fn model_path(&self) -> PathBuf {
        match &self.model_dir {
            Some(dir) => expand_path(dir),
            None => {
                let name = self.model.rsplit('/').next().unwrap_or(&self.model);
                PathBuf::from("models").join(name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub sparse_k: usize,
    pub dense_k: usize,
    pub sparse_weight: f32,
    pub dense_weight: f32,
    pub rrf_k: f32,
    pub min_dense_similarity: f32,
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            sparse_k: 5,
            dense_k: 5,
            sparse_weight: 0.5,
            dense_weight: 0.5,
            rrf_k: 60.0,
            min_dense_similarity: 0.25,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub anthropic_model: String,
    pub openai_model: String,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            anthropic_model: "claude-3-haiku-20240307".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

/// `max_turns = 0` keeps the whole history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub max_turns: usize,
    pub condense_question: bool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_turns: 20,
            condense_question: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub enabled: bool,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
