//! The fetch-with-retry executor.
//!
//! One call = up to `max_retries + 1` attempts against a single URL, with
//! exponential backoff between them. 429 responses honor `Retry-After`
//! (seconds) when the upstream supplies it and follow the configured
//! exponential curve otherwise; every other retryable condition uses a
//! gentler fixed-factor curve. 404 terminates immediately.

use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;
use crate::fetch::transport::{BaseTransport, RawResponse, TransportError};

/// Retry/backoff configuration for one upstream.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 4000,
            backoff_factor: 2.0,
        }
    }
}

/// Factor for retryable conditions other than 429.
const TRANSIENT_FACTOR: f64 = 1.5;

impl RetryPolicy {
    /// Delay before the retry that follows attempt `attempt` of a 429
    /// without `Retry-After`: `base * factor^attempt`.
    pub fn rate_limit_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            (self.backoff_base_ms as f64 * self.backoff_factor.powi(attempt as i32)).round()
                as u64,
        )
    }

    /// Delay before the retry that follows attempt `attempt` of a 5xx /
    /// unexpected status / network fault: `base * 1.5^attempt`.
    pub fn transient_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            (self.backoff_base_ms as f64 * TRANSIENT_FACTOR.powi(attempt as i32)).round() as u64,
        )
    }
}

/// One request the executor can drive.
pub enum FetchRequest<'a> {
    Get { url: &'a str },
    PostJson { url: &'a str, body: &'a serde_json::Value },
}

impl FetchRequest<'_> {
    fn url(&self) -> &str {
        match self {
            FetchRequest::Get { url } => url,
            FetchRequest::PostJson { url, .. } => url,
        }
    }

    async fn issue(
        &self,
        transport: &dyn BaseTransport,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        match self {
            FetchRequest::Get { url } => transport.get(url, timeout).await,
            FetchRequest::PostJson { url, body } => transport.post_json(url, body, timeout).await,
        }
    }
}

/// Lives for one `execute` call; tracked for the retry log lines.
struct RetryState {
    attempt: u32,
    last_status: Option<u16>,
    computed_delay: Duration,
}

/// Issue a request with the policy's retry/backoff behavior.
///
/// Returns the successful response, or the terminal error that ended the
/// attempt sequence. Never retries a 404.
pub async fn execute(
    transport: &dyn BaseTransport,
    request: &FetchRequest<'_>,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<RawResponse, FetchError> {
    let mut state = RetryState {
        attempt: 0,
        last_status: None,
        computed_delay: Duration::ZERO,
    };

    loop {
        let attempt = state.attempt;
        let outcome = request.issue(transport, timeout).await;

        match outcome {
            Ok(response) if response.is_success() => return Ok(response),

            Ok(response) if response.status == 404 => return Err(FetchError::NotFound),

            Ok(response) if response.status == 429 => {
                if attempt == policy.max_retries {
                    return Err(FetchError::RateLimited {
                        attempts: attempt + 1,
                    });
                }
                // Upstream-provided Retry-After (seconds) wins over our curve.
                state.computed_delay = match response.retry_after {
                    Some(secs) if secs > 0 => Duration::from_secs(secs),
                    _ => policy.rate_limit_backoff(attempt),
                };
                state.last_status = Some(429);
            }

            Ok(response) => {
                if attempt == policy.max_retries {
                    return Err(FetchError::Upstream {
                        status: response.status,
                    });
                }
                state.computed_delay = policy.transient_backoff(attempt);
                state.last_status = Some(response.status);
            }

            Err(err) => {
                if attempt == policy.max_retries {
                    return Err(FetchError::Network(err.to_string()));
                }
                state.computed_delay = policy.transient_backoff(attempt);
                state.last_status = None;
            }
        }

        warn!(
            url = request.url(),
            status = ?state.last_status,
            attempt = attempt + 1,
            max_attempts = policy.max_retries + 1,
            wait_ms = state.computed_delay.as_millis() as u64,
            "Retrying after upstream failure"
        );
        tokio::time::sleep(state.computed_delay).await;
        state.attempt += 1;
    }
}
