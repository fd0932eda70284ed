use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use advisor_core::error::GenerationError;

use super::retry::{http_error, send_with_retry};
use super::{ChatMessage, ChatModel, GenerationParams};

const PROVIDER: &str = "openai";

/// OpenAI Chat Completions API.
#[derive(Clone)]
pub struct OpenAiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiModel {
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
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_text(response: ApiResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or(GenerationError::MalformedResponse {
            provider: PROVIDER,
            reason: "no choices".to_string(),
        })
}

impl ChatModel for OpenAiModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let body = RequestBody {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let response = send_with_retry(PROVIDER, || {
            self.client.post(&url).bearer_auth(&self.api_key).json(&body).send()
        })
        .await?;

        let parsed: ApiResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                GenerationError::MalformedResponse { provider: PROVIDER, reason: e.to_string() }
            } else {
                http_error(PROVIDER, &e)
            }
        })?;
        let text = extract_text(parsed)?;
        tracing::debug!(model = %self.model, chars = text.len(), "openai completion");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = RequestBody {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.3,
            max_tokens: 5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
    }

    #[test]
    fn first_choice_is_the_answer() {
        let raw = r#"{"choices":[{"message":{
            "role":"assistant","content":"Roth IRAs grow tax-free."}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "Roth IRAs grow tax-free.");
    }

    #[test]
    fn no_choices_is_malformed() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_text(parsed), Err(GenerationError::MalformedResponse { .. })));
    }
}
