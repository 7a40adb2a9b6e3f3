//! Page fetching
//!
//! [`PageFetcher`] is the HTTP-fetch seam: production uses [`HttpFetcher`],
//! tests plug in an in-memory implementation. [`FetchGuard`] wraps any
//! fetcher with per-endpoint circuit breakers and minimum-interval limits.

mod guard;
mod http;

pub use guard::{CircuitBreakers, Endpoint, FetchGuard, MinIntervalLimiter};
pub use http::{HttpFetcher, DEFAULT_USER_AGENT};

use thiserror::Error;

/// Fetch failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status other than quota signals
    #[error("HTTP status {0}")]
    Status(u16),

    /// 429/403: the endpoint is refusing us for the rest of the run
    #[error("Quota exceeded (HTTP {0})")]
    QuotaExceeded(u16),

    /// Circuit breaker already open for the endpoint
    #[error("Circuit open: {0}")]
    CircuitOpen(String),

    /// Response body could not be read
    #[error("Body error: {0}")]
    Body(String),
}

impl FetchError {
    /// Status codes treated as quota exhaustion
    pub fn from_status(code: u16) -> Self {
        match code {
            429 | 403 => FetchError::QuotaExceeded(code),
            _ => FetchError::Status(code),
        }
    }
}

/// GET-by-URL capability
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a URL and return its body text
    ///
    /// # Errors
    /// Returns `FetchError` on timeout, transport failure or non-success
    /// status. 429 and 403 map to [`FetchError::QuotaExceeded`].
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[cfg(test)]
pub mod mock {
    //! In-memory fetcher for unit tests

    use super::{FetchError, PageFetcher};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves canned bodies keyed by URL and counts calls
    #[derive(Default)]
    pub struct MockFetcher {
        pages: Mutex<HashMap<String, Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(self, url: &str, body: &str) -> Self {
            self.pages.lock().unwrap().insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn with_error(self, url: &str, err: FetchError) -> Self {
            self.pages.lock().unwrap().insert(url.to_string(), Err(err));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchError::Status(404)))
        }
    }
}
