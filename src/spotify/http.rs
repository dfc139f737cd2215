use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    error::{Error, Result},
    warning,
};

/// Longest `Retry-After` we are willing to sit out.
const MAX_RETRY_AFTER_SECS: u64 = 120;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Sends an idempotent request, retrying 429 and gateway errors a bounded number
/// of times. `build` is called once per attempt.
pub(crate) async fn send_with_retry<F>(build: F, policy: RetryPolicy) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let response = build().send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(&response);
            match wait {
                Some(secs) if secs > MAX_RETRY_AFTER_SECS => {
                    warning!(
                        "Spotify asks to retry after {} seconds. Giving up for now.",
                        secs
                    );
                    return Err(Error::RateLimited { retry_after: wait });
                }
                _ if attempt >= attempts => {
                    return Err(Error::RateLimited { retry_after: wait });
                }
                Some(secs) => sleep(Duration::from_secs(secs).max(policy.delay)).await,
                None => sleep(policy.delay * attempt).await,
            }
        } else if is_transient(status) && attempt < attempts {
            sleep(policy.delay * attempt).await;
        } else {
            return Err(provider_error(response).await);
        }

        attempt += 1;
    }
}

/// Sends a mutation exactly once.
pub(crate) async fn send_once(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            retry_after: retry_after(&response),
        });
    }
    Err(provider_error(response).await)
}

/// Turns a non-success response into [`Error::Provider`], pulling the message
/// from either the Web API (`{"error": {"message"}}`) or the accounts service
/// (`{"error", "error_description"}`) body shape.
pub(crate) async fn provider_error(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Error::Provider {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        }),
    }
}

fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    if let Some(msg) = json["error"]["message"].as_str() {
        return Some(msg.to_string());
    }
    match (json["error"].as_str(), json["error_description"].as_str()) {
        (Some(code), Some(desc)) => Some(format!("{} ({})", desc, code)),
        (Some(code), None) => Some(code.to_string()),
        _ => None,
    }
}
