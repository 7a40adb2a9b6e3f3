//! Circuit breakers and per-endpoint rate limiting
//!
//! Shared across all workers of a run. A breaker, once tripped, stays open
//! until the process exits.

use super::{FetchError, PageFetcher};
use crate::types::SourceId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

/// Something that can be rate limited and circuit-broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Source(SourceId),
    Search,
}

impl Endpoint {
    /// Every endpoint known to the classifier
    pub fn all() -> impl Iterator<Item = Endpoint> {
        SourceId::ALL
            .into_iter()
            .map(Endpoint::Source)
            .chain(std::iter::once(Endpoint::Search))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source(id) => f.write_str(id.as_str()),
            Endpoint::Search => f.write_str("search"),
        }
    }
}

// ============================================================================
// Circuit breakers
// ============================================================================

/// One latch per endpoint
///
/// The map is built once and never resized, so lookups need no lock.
#[derive(Debug)]
pub struct CircuitBreakers {
    flags: HashMap<Endpoint, AtomicBool>,
}

impl Default for CircuitBreakers {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakers {
    pub fn new() -> Self {
        Self {
            flags: Endpoint::all().map(|e| (e, AtomicBool::new(false))).collect(),
        }
    }

    pub fn is_open(&self, endpoint: Endpoint) -> bool {
        self.flags
            .get(&endpoint)
            .map(|flag| flag.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Open the breaker; logs once per endpoint
    pub fn trip(&self, endpoint: Endpoint, reason: &str) {
        if let Some(flag) = self.flags.get(&endpoint) {
            if !flag.swap(true, Ordering::AcqRel) {
                error!(
                    endpoint = %endpoint,
                    reason = %reason,
                    "Circuit breaker tripped: endpoint disabled for the rest of the run"
                );
            }
        }
    }

    /// Endpoints currently open
    pub fn open_endpoints(&self) -> Vec<Endpoint> {
        Endpoint::all().filter(|e| self.is_open(*e)).collect()
    }
}

// ============================================================================
// Rate limiting
// ============================================================================

/// Minimum spacing between consecutive requests
///
/// Plain interval enforcement, not a token bucket.
#[derive(Debug, Clone)]
pub struct MinIntervalLimiter {
    interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl MinIntervalLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Sleep until the interval since the previous request has elapsed
    pub async fn wait(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < self.interval {
                let sleep_duration = self.interval - elapsed;
                debug!(
                    sleep_ms = sleep_duration.as_millis() as u64,
                    "Rate limiting: sleeping before request"
                );
                sleep(sleep_duration).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

// ============================================================================
// Guarded fetcher
// ============================================================================

/// Fetcher wrapper enforcing breakers and rate limits per endpoint
pub struct FetchGuard {
    fetcher: Arc<dyn PageFetcher>,
    breakers: Arc<CircuitBreakers>,
    limiters: HashMap<Endpoint, MinIntervalLimiter>,
}

impl FetchGuard {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        breakers: Arc<CircuitBreakers>,
        min_interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            breakers,
            limiters: Endpoint::all()
                .map(|e| (e, MinIntervalLimiter::new(min_interval)))
                .collect(),
        }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakers> {
        &self.breakers
    }

    pub fn is_open(&self, endpoint: Endpoint) -> bool {
        self.breakers.is_open(endpoint)
    }

    /// Fetch `url` on behalf of `endpoint`
    ///
    /// # Errors
    /// - `CircuitOpen` without any network call when the breaker is open
    /// - `QuotaExceeded` trips the breaker before being returned
    /// - any other fetch error unchanged
    pub async fn fetch(&self, endpoint: Endpoint, url: &str) -> Result<String, FetchError> {
        if self.breakers.is_open(endpoint) {
            return Err(FetchError::CircuitOpen(endpoint.to_string()));
        }

        if let Some(limiter) = self.limiters.get(&endpoint) {
            limiter.wait().await;
        }

        match self.fetcher.fetch(url).await {
            Err(FetchError::QuotaExceeded(code)) => {
                self.breakers.trip(endpoint, &format!("HTTP {} from {}", code, url));
                Err(FetchError::QuotaExceeded(code))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;

    #[test]
    fn test_breakers_start_closed() {
        let breakers = CircuitBreakers::new();
        assert!(Endpoint::all().all(|e| !breakers.is_open(e)));
        assert!(breakers.open_endpoints().is_empty());
    }

    #[test]
    fn test_trip_is_sticky_and_isolated() {
        let breakers = CircuitBreakers::new();
        breakers.trip(Endpoint::Source(SourceId::Munpia), "HTTP 429");
        breakers.trip(Endpoint::Source(SourceId::Munpia), "HTTP 429");

        assert!(breakers.is_open(Endpoint::Source(SourceId::Munpia)));
        assert!(!breakers.is_open(Endpoint::Source(SourceId::Ridibooks)));
        assert!(!breakers.is_open(Endpoint::Search));
        assert_eq!(breakers.open_endpoints(), vec![Endpoint::Source(SourceId::Munpia)]);
    }

    #[tokio::test]
    async fn test_quota_trips_breaker_and_short_circuits() {
        // Arrange
        let fetcher = Arc::new(
            MockFetcher::new().with_error("https://novel.munpia.com/1", FetchError::QuotaExceeded(429)),
        );
        let guard = FetchGuard::new(fetcher.clone(), Arc::new(CircuitBreakers::new()), Duration::ZERO);
        let endpoint = Endpoint::Source(SourceId::Munpia);

        // Act
        let first = guard.fetch(endpoint, "https://novel.munpia.com/1").await;
        let second = guard.fetch(endpoint, "https://novel.munpia.com/2").await;

        // Assert
        assert_eq!(first, Err(FetchError::QuotaExceeded(429)));
        assert!(matches!(second, Err(FetchError::CircuitOpen(_))));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_min_interval_spacing() {
        let limiter = MinIntervalLimiter::new(Duration::from_millis(50));
        let start = Instant::now();

        limiter.wait().await;
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
