//! HTTP GET with bounded retries and exponential backoff.
//!
//! The fetcher owns no state besides an injected `reqwest::Client` (which
//! pools connections) and an immutable [`RetryPolicy`]. It is cheap to clone
//! and safe to share between jobs.
//!
//! ```text
//! attempt 0 ──► 2xx ──► bytes
//!     │
//!     ├─► retryable status / connect / dropped connection / timeout
//!     │       └─► sleep(base * multiplier^n + jitter) ──► attempt n+1
//!     │
//!     └─► any other status ──► FetchError::Status (no retry)
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::error::{FetchError, FetchResult};

/// Status codes retried by default.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Upper bound on a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Retry policy shared read-only by every fetch.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    #[builder(default = 3)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    pub base_delay: Duration,
    #[builder(default = 2.0)]
    pub multiplier: f64,
    /// Upper bound of the uniform jitter added to each delay.
    #[builder(default = Duration::from_millis(250))]
    pub jitter: Duration,
    #[builder(default = DEFAULT_RETRYABLE_STATUSES.into_iter().collect())]
    pub retryable_statuses: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Backoff before retry number `retry` (zero-based), without jitter.
    ///
    /// Non-decreasing in `retry` for any multiplier >= 1.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(0.0).powi(retry.min(i32::MAX as u32) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= MAX_DELAY.as_secs_f64() {
            return MAX_DELAY;
        }
        Duration::from_secs_f64(secs)
    }

    /// Backoff plus uniform jitter in `0..=jitter`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let jitter_ns = self.jitter.as_nanos().min(u64::MAX as u128) as u64;
        let jitter = if jitter_ns == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(fastrand::u64(0..=jitter_ns))
        };
        self.backoff(retry) + jitter
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Retrying HTTP GET client.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: reqwest::Client,
    policy: Arc<RetryPolicy>,
    timeout: Duration,
}

impl RetryingFetcher {
    /// Create a fetcher around an existing client.
    pub fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy: Arc::new(policy),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout used by [`fetch`](Self::fetch).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with the default timeout.
    pub async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        self.fetch_with_timeout(url, self.timeout).await
    }

    /// GET `url` with an explicit per-request timeout.
    pub async fn fetch_with_timeout(&self, url: &str, timeout: Duration) -> FetchResult<Bytes> {
        self.get(url, &[], timeout).await
    }

    /// GET `url` with query parameters.
    pub async fn fetch_query(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> FetchResult<Bytes> {
        self.get(url, query, self.timeout).await
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        timeout: Duration,
    ) -> FetchResult<Bytes> {
        let attempts = self.policy.attempts();
        let mut last = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.policy.delay_for(attempt - 1);
                warn!(
                    url = %url,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    reason = %last,
                    "Retrying fetch"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .get(url)
                .query(query)
                .timeout(timeout)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if is_transient(&e) => {
                    last = e.to_string();
                    continue;
                }
                Err(e) => return Err(FetchError::Transport(e)),
            };

            let status = response.status();
            if !status.is_success() {
                let code = status.as_u16();
                if !self.policy.is_retryable(code) {
                    debug!(url = %url, status = code, "Non-retryable response");
                    return Err(FetchError::Status {
                        status: code,
                        url: url.to_string(),
                    });
                }
                last = format!("HTTP {}", code);
                continue;
            }

            match response.bytes().await {
                Ok(body) => {
                    debug!(url = %url, attempt = attempt + 1, size = body.len(), "Fetched");
                    return Ok(body);
                }
                Err(e) if is_transient(&e) => last = e.to_string(),
                Err(e) => return Err(FetchError::Transport(e)),
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last,
        })
    }
}

/// Timeouts, failed connects, connections dropped mid-request (such as a
/// pooled socket the server already closed), and body reads cut short.
/// Builder, redirect and decode errors are not retried.
fn is_transient(error: &reqwest::Error) -> bool {
    if error.is_builder() || error.is_redirect() || error.is_decode() {
        return false;
    }
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}
