//! reqwest-backed page fetcher

use super::{FetchError, PageFetcher};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// Default User-Agent; several platforms reject non-browser agents
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// HTTP fetcher with fixed timeouts and browser-like headers
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher
    ///
    /// # Arguments
    /// * `timeout` - Total per-request timeout
    /// * `connect_timeout` - Connection establishment timeout
    /// * `user_agent` - User-Agent header value
    ///
    /// # Errors
    /// Returns `FetchError::Network` if the HTTP client cannot be built
    pub fn new(
        timeout: Duration,
        connect_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        let agent = header::HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| header::HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(header::USER_AGENT, agent);
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("ko-KR,ko;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Access the underlying client (shared with the search API)
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching page");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(url.to_string())
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}
