//! HTTP client for page fetching with retry and rate limiting
//!
//! Every request waits on a process-wide rate limiter. Network errors and the
//! configured retry statuses are retried with exponential backoff; any other
//! status is handed back to the caller as-is.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::crawling::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::infrastructure::config::HttpConfig;

/// Upper bound for a server-provided `Retry-After`
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// When and how long to wait before retrying a GET
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64((self.backoff_factor * 2f64.powi(exponent)).max(0.0))
    }
}

/// Rate-limited HTTP client for respectful crawling
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid Accept-Language")?,
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second).context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn send(&self, url: &Url) -> reqwest::Result<Response> {
        self.rate_limiter.until_ready().await;
        self.client.get(url.clone()).send().await
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut retries = 0;
        loop {
            debug!("Fetching URL: {} (attempt {})", url, retries + 1);

            let response = match self.send(&parsed).await {
                Ok(response) => response,
                Err(e) if retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.backoff(retries);
                    warn!(
                        "Request to {} failed, retry {}/{} in {:?}: {}",
                        url, retries, self.retry.max_retries, delay, e
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
            };

            let status = response.status().as_u16();
            if self.retry.is_retryable_status(status) && retries < self.retry.max_retries {
                retries += 1;
                let delay = retry_after(&response).map_or_else(
                    || self.retry.backoff(retries),
                    |hint| hint.max(self.retry.backoff(retries)),
                );
                warn!(
                    "Status {} from {}, retry {}/{} in {:?}",
                    status, url, retries, self.retry.max_retries, delay
                );
                sleep(delay).await;
                continue;
            }

            let final_url = response.url().to_string();
            let body = response.text().await.map_err(|e| FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            debug!("Fetched {} ({}, {} bytes)", final_url, status, body.len());
            return Ok(FetchedPage {
                url: final_url,
                status,
                body,
            });
        }
    }
}
