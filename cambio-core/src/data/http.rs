//! Resilient blocking HTTP client.
//!
//! Wraps a pooled `reqwest::blocking::Client` with a bounded retry policy:
//! connection failures, timeouts, and a configurable set of HTTP statuses are
//! retried with exponential backoff. A final retryable-status response is
//! handed back to the caller instead of being turned into an error, so the
//! caller decides what a 503 means.

use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Identifying `User-Agent` sent by the default client.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; cambio/",
    env!("CARGO_PKG_VERSION"),
    "; exchange-rate collector)"
);

/// Statuses retried by [`RetryPolicy::default`].
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Statuses whose `Retry-After` header overrides the computed backoff.
pub const RETRY_AFTER_STATUSES: [u16; 3] = [413, 429, 503];

/// Retry and backoff settings for [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub backoff_base: Duration,
    /// Response statuses that trigger a retry.
    pub retryable_statuses: Vec<u16>,
    /// Upper bound on any single delay, including `Retry-After` hints.
    /// Hints are only read on [`RETRY_AFTER_STATUSES`].
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(300),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries (direct client).
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    /// Delay before retry number `retry` (1-based): `backoff_base * 2^(retry-1)`,
    /// capped at `max_backoff`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Reusable HTTP client with automatic retries on transient failures.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

/// Build a client carrying `user_agent` on every request and retrying per `policy`.
pub fn create_client(policy: RetryPolicy, user_agent: &str) -> Result<HttpClient, reqwest::Error> {
    let client = Client::builder().user_agent(user_agent).build()?;
    Ok(HttpClient { client, policy })
}

impl HttpClient {
    /// Client with the default policy and identifying header.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        create_client(RetryPolicy::default(), DEFAULT_USER_AGENT)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` with a per-attempt `timeout`, retrying per the policy.
    ///
    /// Returns `Err` only for transport failures (after retries, or at once
    /// for non-transient ones). Any response, including a final retryable
    /// status, is returned as `Ok`.
    pub fn get(&self, url: &str, timeout: Duration) -> Result<Response, reqwest::Error> {
        let mut attempt = 0u32;
        loop {
            let can_retry = attempt < self.policy.max_retries;
            let delay = match self.client.get(url).timeout(timeout).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if !can_retry || !self.policy.is_retryable_status(status) {
                        debug!(%url, %status, attempt, "response received");
                        return Ok(resp);
                    }
                    let delay = retry_after(&resp)
                        .map(|hint| hint.min(self.policy.max_backoff))
                        .unwrap_or_else(|| self.policy.delay_for(attempt + 1));
                    warn!(%url, %status, attempt, ?delay, "retryable status, backing off");
                    delay
                }
                Err(e) => {
                    if !can_retry || !is_transient(&e) {
                        return Err(e);
                    }
                    let delay = self.policy.delay_for(attempt + 1);
                    warn!(%url, error = %e, attempt, ?delay, "transient failure, backing off");
                    delay
                }
            };
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Numeric `Retry-After` header, in seconds, on statuses that carry one.
fn retry_after(resp: &Response) -> Option<Duration> {
    if !RETRY_AFTER_STATUSES.contains(&resp.status().as_u16()) {
        return None;
    }
    resp.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
