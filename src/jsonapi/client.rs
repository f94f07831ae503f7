//! Page transport
//!
//! [`PageSource`] is the seam between pagination logic and the network.
//! [`HttpPageSource`] is the reqwest implementation with an optional request
//! timeout. [`RetryingPageSource`] wraps any source with a retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::types::JsonApiDocument;
use crate::config::HttpConfig;
use crate::error::{ExportError, Result};

const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch and parse one page of a collection
    async fn fetch_page(&self, url: &str) -> Result<JsonApiDocument>;
}

/// Bounded retry for transient transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based); grows linearly
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.delay
            .saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX))
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
        }
    }
}

pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ExportError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &str) -> Result<JsonApiDocument> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, JSONAPI_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| ExportError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::transport(
                url,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ExportError::transport(url, e))?;

        serde_json::from_str(&text).map_err(|e| {
            ExportError::Decode(format!(
                "failed to parse page {}: {}. First 500 chars: {}",
                url,
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }
}

/// Retries transport failures of the wrapped source.
///
/// Decode errors are returned immediately; a malformed page does not get
/// better on a second request.
pub struct RetryingPageSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: PageSource> RetryingPageSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: PageSource> PageSource for RetryingPageSource<S> {
    async fn fetch_page(&self, url: &str) -> Result<JsonApiDocument> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch_page(url).await {
                Ok(doc) => return Ok(doc),
                Err(e @ ExportError::Transport { .. }) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(
                        url,
                        error = %e,
                        "Page fetch failed, retrying (attempt {} of {})",
                        attempt + 1,
                        self.policy.max_retries + 1
                    );
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                }
                Err(e) => {
                    debug!(url, attempts = attempt + 1, "Page fetch failed");
                    return Err(e);
                }
            }
        }
    }
}
