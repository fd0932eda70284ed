use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use advisor_core::error::GenerationError;

use super::retry::{http_error, send_with_retry};
use super::{ChatMessage, ChatModel, ChatRole, GenerationParams};

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for AnthropicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicModel")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AnthropicModel {
    #[must_use]
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, api_key, model, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

/// System messages go into the top-level `system` field.
fn split_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<ApiMessage<'_>>) {
    let mut system = Vec::new();
    let mut chat = Vec::new();
    for msg in messages {
        match msg.role {
            ChatRole::System => system.push(msg.content.as_str()),
            ChatRole::User => chat.push(ApiMessage { role: "user", content: &msg.content }),
            ChatRole::Assistant => {
                chat.push(ApiMessage { role: "assistant", content: &msg.content });
            }
        }
    }
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, chat)
}

fn extract_text(response: ApiResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|b| b.block_type == "text")
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("")
}

impl ChatModel for AnthropicModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let (system, chat) = split_messages(messages);
        let body = RequestBody {
            model: &self.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
            messages: chat,
        };
        let url = format!("{}/v1/messages", self.base_url);

        let response = send_with_retry(PROVIDER, || {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
        })
        .await?;

        let parsed: ApiResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                GenerationError::MalformedResponse { provider: PROVIDER, reason: e.to_string() }
            } else {
                http_error(PROVIDER, &e)
            }
        })?;
        let text = extract_text(parsed);
        tracing::debug!(model = %self.model, chars = text.len(), "anthropic completion");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
