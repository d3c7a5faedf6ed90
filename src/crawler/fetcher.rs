//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by both pipelines:
//! - Building the shared HTTP client with the configured user agent and timeout
//! - GET requests with bounded retry and a fixed wait between attempts
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Return the response |
//! | Any other status | Retry after `wait`, up to `attempts` total |
//! | Timeout / connection error | Retry after `wait`, up to `attempts` total |
//! | Attempts exhausted | `FetchError` carrying the last failure |
//!
//! There is no exponential backoff: request volume is low and strictly sequential.

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::FetchError;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// How many times a request is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,

    /// Constant wait between attempts
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, wait: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            wait,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

impl From<&FetcherConfig> for RetryPolicy {
    fn from(config: &FetcherConfig) -> Self {
        Self::new(config.retries, config.retry_wait())
    }
}

/// A successful (2xx) response, fully read
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body
    pub body: String,
}

impl RawResponse {
    /// Returns a header value as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decodes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Builds the HTTP client shared by every crawl
///
/// The client is cheap to clone and is never mutated after construction, so one
/// instance can serve any number of concurrent crawls.
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::Config;
/// use catalog_harvest::crawler::build_http_client;
///
/// let config = Config::default();
/// let client = build_http_client(&config.fetcher, &config.user_agent).unwrap();
/// ```
pub fn build_http_client(
    fetcher: &FetcherConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = fetcher.timeout();

    Client::builder()
        .user_agent(user_agent.value.as_str())
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET with bounded retry
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

/// Why a single attempt failed
enum AttemptError {
    Transport(reqwest::Error),
    Status(StatusCode),
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher, and its client, from configuration
    pub fn from_config(
        fetcher: &FetcherConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(fetcher, user_agent)?;
        Ok(Self::new(client, RetryPolicy::from(fetcher)))
    }

    /// Returns a fetcher sharing this client with a different retry policy
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self::new(self.client.clone(), policy)
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches a URL, retrying transport errors and non-2xx statuses
    ///
    /// # Returns
    ///
    /// * `Ok(RawResponse)` - A 2xx response, body read
    /// * `Err(FetchError)` - Every attempt failed; carries the last failure
    pub async fn fetch(&self, url: &str) -> Result<RawResponse, FetchError> {
        let attempts = self.policy.attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.attempt(url).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if attempt >= attempts {
                tracing::error!("Giving up on {} after {} attempts", url, attempts);
                return Err(match error {
                    AttemptError::Transport(source) => FetchError::Transport {
                        url: url.to_string(),
                        attempts,
                        source,
                    },
                    AttemptError::Status(status) => FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                        attempts,
                    },
                });
            }

            match &error {
                AttemptError::Transport(e) => tracing::warn!(
                    "Attempt {}/{} for {} failed: {}",
                    attempt,
                    attempts,
                    url,
                    e
                ),
                AttemptError::Status(status) => tracing::warn!(
                    "Attempt {}/{} for {} returned HTTP {}",
                    attempt,
                    attempts,
                    url,
                    status.as_u16()
                ),
            }

            tokio::time::sleep(self.policy.wait).await;
        }
    }

    async fn attempt(&self, url: &str) -> Result<RawResponse, AttemptError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(AttemptError::Transport)?;

        Ok(RawResponse {
            url: final_url,
            status: status.as_u16(),
            headers,
            body,
        })
    }
}
