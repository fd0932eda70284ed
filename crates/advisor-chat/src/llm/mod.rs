//! Chat-completion providers.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use advisor_core::config::LlmSettings;
use advisor_core::error::GenerationError;

pub mod anthropic;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
mod retry;

pub use anthropic::AnthropicModel;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockModel;
pub use openai::OpenAiModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for GenerationParams {
    fn from(s: &LlmSettings) -> Self {
        Self { temperature: s.temperature, max_tokens: s.max_tokens }
    }
}

pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the assistant text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails, rate limits or answers with
    /// something unparseable.
    fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;

    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(GenerationError::UnknownProvider(other.to_string())),
        }
    }
}

/// Provider chosen at runtime by name.
#[derive(Debug, Clone)]
pub enum AnyModel {
    Anthropic(AnthropicModel),
    OpenAi(OpenAiModel),
}

impl AnyModel {
    /// Build the configured provider. The API key comes from settings, then
    /// `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, GenerationError> {
        let kind: ProviderKind = settings.provider.parse()?;
        let timeout = Duration::from_secs(settings.timeout_secs);
        match kind {
            ProviderKind::Anthropic => {
                let key = api_key(settings, "ANTHROPIC_API_KEY")
                    .ok_or(GenerationError::MissingApiKey("anthropic"))?;
                Ok(Self::Anthropic(AnthropicModel::new(
                    key,
                    settings.anthropic_model.clone(),
                    settings.anthropic_base_url.clone(),
                    timeout,
                )))
            }
            ProviderKind::OpenAi => {
                let key = api_key(settings, "OPENAI_API_KEY")
                    .ok_or(GenerationError::MissingApiKey("openai"))?;
                Ok(Self::OpenAi(OpenAiModel::new(
                    key,
                    settings.openai_model.clone(),
                    settings.openai_base_url.clone(),
                    timeout,
                )))
            }
        }
    }

    pub fn model_id(&self) -> &str {
        match self {
            Self::Anthropic(m) => m.model(),
            Self::OpenAi(m) => m.model(),
        }
    }
}

fn api_key(settings: &LlmSettings, var: &str) -> Option<String> {
    settings
        .api_key
        .clone()
        .or_else(|| std::env::var(var).ok())
        .filter(|k| !k.trim().is_empty())
}

impl ChatModel for AnyModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        match self {
            Self::Anthropic(m) => m.complete(messages, params).await,
            Self::OpenAi(m) => m.complete(messages, params).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Anthropic(m) => m.name(),
            Self::OpenAi(m) => m.name(),
        }
    }
}
