use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::config::LlmConfig;

static SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static regex is valid"));

/// Retry budget for HTTP 429 responses from one endpoint.
///
/// Without a provider hint the wait before retry `n` (zero-based) is
/// `2^(n+1) * base`: 2s, 4s, 8s for a one second base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self { max_retries, base }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.backoff_base_ms),
        )
    }

    /// Default wait before retry number `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_add(1));
        self.base.saturating_mul(factor)
    }

    /// Wait before retry number `attempt`, preferring the provider's hint.
    /// A hint is never allowed below the first default backoff.
    pub fn delay_for(&self, attempt: u32, provider_hint: Option<Duration>) -> Duration {
        match provider_hint {
            Some(hint) => hint.max(self.backoff(0)),
            None => self.backoff(attempt),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Retry delay suggested by a 429 response.
///
/// Checks the body for a Google style `RetryInfo` detail
/// (`{"error":{"details":[{"@type":"...RetryInfo","retryDelay":"7s"}]}}`),
/// then the `Retry-After` header in whole seconds.
pub fn provider_retry_delay(headers: &HeaderMap, body: &str) -> Option<Duration> {
    retry_info_delay(body).or_else(|| {
        headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    })
}

fn retry_info_delay(body: &str) -> Option<Duration> {
    let json: Value = serde_json::from_str(body).ok()?;
    let details = json.get("error")?.get("details")?.as_array()?;
    let retry_info = details.iter().find(|detail| {
        detail
            .get("@type")
            .and_then(Value::as_str)
            .is_some_and(|kind| kind.contains("RetryInfo"))
    })?;
    let delay = retry_info.get("retryDelay")?.as_str()?;
    let seconds = SECONDS_RE.find(delay)?.as_str().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

/// Result of sending a request under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome {
    /// Any response other than 429.
    Response(Response),
    /// Still rate limited once the retry budget was spent.
    RateLimited { retry_after: Option<Duration> },
}

/// Send the request built by `make_request`, retrying on 429.
///
/// `on_retry(attempt, delay)` runs before each wait. Transport errors are
/// returned immediately; they are not retried here.
pub async fn send_with_retry<F, R>(
    policy: &RetryPolicy,
    mut make_request: F,
    mut on_retry: R,
) -> reqwest::Result<RetryOutcome>
where
    F: FnMut() -> RequestBuilder,
    R: FnMut(u32, Duration),
{
    let mut attempt = 0;
    loop {
        let response = make_request().send().await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(RetryOutcome::Response(response));
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let hint = provider_retry_delay(&headers, &body);

        if attempt >= policy.max_retries {
            return Ok(RetryOutcome::RateLimited { retry_after: hint });
        }

        let delay = policy.delay_for(attempt, hint);
        on_retry(attempt, delay);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
