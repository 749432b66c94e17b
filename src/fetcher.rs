//! HTTP fetching with rate limiting, jitter and exponential backoff.
//!
//! The module uses a trait-based design so the crawler can run against any
//! page source:
//! - [`Transport`]: Core trait performing one GET attempt
//! - [`HttpTransport`]: `reqwest` implementation with a fixed timeout and user agent
//! - [`Fetcher`]: Decorator that adds politeness and retry logic to any `Transport`
//!
//! # Retry Strategy
//!
//! - Every attempt first takes one token from the shared [`RateLimiter`]
//! - A random jitter in `[0, initial_delay)` desynchronizes concurrent lanes
//! - Up to `retries` attempts in total
//! - Backoff after failed attempt `k` (zero-based): `initial_delay * 5^k * 20`

use crate::limiter::RateLimiter;
use rand::{Rng, rng};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Browser-like user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Failure of a single GET attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network failure, timeout, or body decoding problem.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered with a non-2xx status.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },
}

/// Failure of a fetch after every retry was used up.
#[derive(Debug, Error)]
#[error("fetching {url} failed after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub url: String,
    pub attempts: usize,
    #[source]
    pub cause: TransportError,
}

/// One GET attempt against a page source.
pub trait Transport: Send + Sync {
    /// Fetch `url` and return the response body.
    fn get(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client that applies `timeout` and `user_agent` to every request.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Politeness and retry policy applied by [`Fetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts per URL.
    pub retries: usize,
    /// Upper bound of the pre-attempt jitter and base of the backoff.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Backoff slept after failed attempt `attempt` (zero-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let factor = 5u32.saturating_pow(attempt as u32).saturating_mul(20);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Retrying, rate-limited wrapper around a [`Transport`].
#[derive(Debug)]
pub struct Fetcher<T> {
    transport: T,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            policy,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `url`, retrying failed attempts with exponential backoff.
    ///
    /// Every attempt takes one token from the shared limiter and waits a
    /// random jitter of up to `initial_delay` first.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute page URL
    ///
    /// # Returns
    ///
    /// The response body of the first successful attempt.
    ///
    /// # Errors
    ///
    /// A [`FetchError`] carrying the last [`TransportError`] once all
    /// `retries` attempts have failed.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let max_attempts = self.policy.retries.max(1);
        let mut attempt = 0usize;

        loop {
            self.limiter.acquire(1).await;
            sleep(self.jitter()).await;

            match self.transport.get(url).await {
                Ok(body) => {
                    debug!(
                        attempt,
                        bytes = body.len(),
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        "Fetched page"
                    );
                    return Ok(body);
                }
                Err(cause) => {
                    if attempt + 1 >= max_attempts {
                        error!(
                            attempts = attempt + 1,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %cause,
                            "fetch() exhausted retries"
                        );
                        return Err(FetchError {
                            url: url.to_string(),
                            attempts: attempt + 1,
                            cause,
                        });
                    }

                    let delay = self.policy.backoff(attempt);
                    warn!(
                        attempt,
                        max = max_attempts,
                        ?delay,
                        error = %cause,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn jitter(&self) -> Duration {
        let upper = self.policy.initial_delay.as_millis() as u64;
        if upper == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..upper))
    }
}
