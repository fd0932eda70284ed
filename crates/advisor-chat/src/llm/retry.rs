use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

use advisor_core::error::GenerationError;

const BASE_BACKOFF_SECS: u64 = 1;
const MAX_RETRIES: u32 = 1;

/// `Retry-After` in seconds if present, exponential backoff otherwise.
pub(crate) fn retry_delay(response: &Response, attempt: u32) -> Duration {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map_or_else(|| backoff(attempt), Duration::from_secs)
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(BASE_BACKOFF_SECS << attempt)
}

/// Send a request, retrying once on 429. Non-success statuses become
/// `GenerationError::Provider` with the response body.
pub(crate) async fn send_with_retry<F, Fut>(
    provider: &'static str,
    mut send: F,
) -> Result<Response, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    for attempt in 0..=MAX_RETRIES {
        let response = send().await.map_err(|e| http_error(provider, &e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            if attempt == MAX_RETRIES {
                break;
            }
            let delay = retry_delay(&response, attempt);
            tracing::warn!(provider, delay_secs = delay.as_secs(), "rate limited, retrying");
            tokio::time::sleep(delay).await;
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(provider, %status, "request failed");
            return Err(GenerationError::Provider {
                provider,
                reason: format!("status {status}: {}", truncate(&body, 300)),
            });
        }
        return Ok(response);
    }
    Err(GenerationError::RateLimited(provider))
}

pub(crate) fn http_error(provider: &'static str, e: &reqwest::Error) -> GenerationError {
    GenerationError::Provider { provider, reason: e.to_string() }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
