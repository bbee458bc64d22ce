//! Page fetch seam
//!
//! The pipeline only sees `fetch(url) -> (status, body)`. Retries, rate limiting
//! and connection handling live behind this trait.

use async_trait::async_trait;
use thiserror::Error;

/// A page that came back from the server, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_error_status(&self) -> bool {
        self.status >= 400
    }
}

/// Transport failure: no usable response was obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Body { url, .. } | Self::InvalidUrl { url, .. } => url,
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page. HTTP error statuses are returned as pages, not errors.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}
