use std::time::Duration;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use advisor_chat::llm::{AnthropicModel, OpenAiModel};
use advisor_chat::{ChatMessage, ChatModel, GenerationParams};
use advisor_core::error::GenerationError;

fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a financial planning assistant."),
        ChatMessage::user("Is term life cheaper than whole life?"),
    ]
}

fn anthropic(server: &MockServer) -> AnthropicModel {
    AnthropicModel::new(
        "test-key".into(),
        "claude-3-haiku-20240307".into(),
        server.uri(),
        Duration::from_secs(5),
    )
}

fn openai(server: &MockServer) -> OpenAiModel {
    OpenAiModel::new("sk-test".into(), "gpt-4o-mini".into(), server.uri(), Duration::from_secs(5))
}

#[tokio::test]
async fn anthropic_sends_messages_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-3-haiku-20240307",
            "system": "You are a financial planning assistant.",
            "messages": [{"role": "user", "content": "Is term life cheaper than whole life?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Yes, term life usually costs less [1]."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = anthropic(&server)
        .complete(&conversation(), &GenerationParams::default())
        .await
        .unwrap();
    assert_eq!(text, "Yes, term life usually costs less [1].");
}

#[tokio::test]
async fn retries_once_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Consider a Roth IRA."}}]
        })))
        .mount(&server)
        .await;

    let text = openai(&server)
        .complete(&conversation(), &GenerationParams::default())
        .await
        .unwrap();
    assert_eq!(text, "Consider a Roth IRA.");
}

#[tokio::test]
async fn persistent_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = anthropic(&server)
        .complete(&conversation(), &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::RateLimited("anthropic")));
}

#[tokio::test]
async fn server_error_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = openai(&server)
        .complete(&conversation(), &GenerationParams::default())
        .await
        .unwrap_err();
    match err {
        GenerationError::Provider { provider, reason } => {
            assert_eq!(provider, "openai");
            assert!(reason.contains("500"));
            assert!(reason.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = anthropic(&server)
        .complete(&conversation(), &GenerationParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::MalformedResponse { provider: "anthropic", .. }));
}
