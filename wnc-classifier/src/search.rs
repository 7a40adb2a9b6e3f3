//! Search-link provider
//!
//! Runs a query against the portal and returns result links, then buckets
//! those links by platform so each [`SourceExtractor`](crate::types::SourceExtractor)
//! only sees its own pages.
//!
//! Two modes:
//! - **API** (credentials configured): portal web-search JSON API, quota
//!   enforced with `governor`. An empty API answer falls back to web mode.
//! - **Web**: scrape anchors from the portal's HTML result page.

use crate::fetch::{Endpoint, FetchError, FetchGuard};
use crate::types::SourceId;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info};

const SEARCH_API_URL: &str = "https://openapi.naver.com/v1/search/webkr.json";
const SEARCH_WEB_URL: &str = "https://search.naver.com/search.naver";

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Query → result links
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return result links, best first
    ///
    /// # Errors
    /// Returns `FetchError` when the portal cannot be reached or refuses
    /// the request (`QuotaExceeded` trips the search breaker).
    async fn search(&self, query: &str) -> Result<Vec<String>, FetchError>;
}

/// Portal API credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    link: String,
}

struct ApiMode {
    client: Client,
    credentials: SearchCredentials,
    results: u32,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

/// Portal search with API and web modes
pub struct PortalSearch {
    guard: Arc<FetchGuard>,
    api: Option<ApiMode>,
}

impl PortalSearch {
    /// Web-scrape mode only
    pub fn web(guard: Arc<FetchGuard>) -> Self {
        Self { guard, api: None }
    }

    /// API mode, falling back to web mode on empty answers
    ///
    /// # Arguments
    /// * `client` - HTTP client used for API calls
    /// * `requests_per_second` - API quota; zero is treated as one
    /// * `results` - Results requested per query
    pub fn with_api(
        guard: Arc<FetchGuard>,
        client: Client,
        credentials: SearchCredentials,
        requests_per_second: u32,
        results: u32,
    ) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));
        Self {
            guard,
            api: Some(ApiMode {
                client,
                credentials,
                results: results.clamp(1, 100),
                rate_limiter,
            }),
        }
    }

    pub fn uses_api(&self) -> bool {
        self.api.is_some()
    }

    async fn search_api(&self, api: &ApiMode, query: &str) -> Result<Vec<String>, FetchError> {
        if self.guard.is_open(Endpoint::Search) {
            return Err(FetchError::CircuitOpen(Endpoint::Search.to_string()));
        }

        api.rate_limiter.until_ready().await;

        let display = api.results.to_string();
        let response = api
            .client
            .get(SEARCH_API_URL)
            .header("X-Naver-Client-Id", &api.credentials.client_id)
            .header("X-Naver-Client-Secret", &api.credentials.client_secret)
            .query(&[("query", query), ("display", &display), ("start", "1"), ("sort", "sim")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(SEARCH_API_URL.to_string())
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = FetchError::from_status(status.as_u16());
            if let FetchError::QuotaExceeded(code) = err {
                self.guard
                    .breakers()
                    .trip(Endpoint::Search, &format!("search API HTTP {}", code));
            }
            return Err(err);
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Body(format!("search API response: {}", e)))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| item.link)
            .filter(|link| !link.is_empty())
            .collect())
    }

    async fn search_web(&self, query: &str) -> Result<Vec<String>, FetchError> {
        let url = Url::parse_with_params(SEARCH_WEB_URL, &[("query", query)])
            .map_err(|e| FetchError::Network(format!("search URL: {}", e)))?;
        let html = self.guard.fetch(Endpoint::Search, url.as_str()).await?;
        Ok(extract_links(&html))
    }
}

#[async_trait]
impl SearchProvider for PortalSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, FetchError> {
        if let Some(api) = &self.api {
            let links = self.search_api(api, query).await?;
            debug!(query = %query, results = links.len(), "Search API answered");
            if !links.is_empty() {
                return Ok(links);
            }
            info!(query = %query, "Search API returned nothing, falling back to web search");
        }
        self.search_web(query).await
    }
}

/// Every anchor `href` on a result page, in document order
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Platform buckets
// ============================================================================

/// Platform a link belongs to, by URL signature
pub fn classify_link(url: &str) -> Option<SourceId> {
    if url.contains("ridibooks.com/books/") {
        Some(SourceId::Ridibooks)
    } else if url.contains("munpia.com/novel/") || url.contains("novel.munpia.com") {
        Some(SourceId::Munpia)
    } else if url.contains("novelpia.com/novel/") {
        Some(SourceId::Novelpia)
    } else if url.contains("joara.com") && url.contains("/book/") {
        Some(SourceId::Joara)
    } else if url.contains("series.naver.com") {
        // Series search pages are not detail pages
        (!url.contains("/search/")).then_some(SourceId::NaverSeries)
    } else if url.contains("page.kakao.com/content/") {
        Some(SourceId::KakaoPage)
    } else if url.contains("novelnet.co.kr") || url.contains("novel.naver.com") || url.contains("ssn.so") {
        Some(SourceId::Novelnet)
    } else if url.contains("webtoonguide.com") {
        Some(SourceId::Webtoonguide)
    } else if url.contains("mrblue.com") {
        Some(SourceId::Mrblue)
    } else if url.contains("yes24.com/product/goods/") {
        Some(SourceId::Yes24)
    } else if url.contains("kyobobook.co.kr") && url.contains("/detail/") {
        Some(SourceId::Kyobo)
    } else if url.contains("aladin.co.kr") {
        Some(SourceId::Aladin)
    } else {
        None
    }
}

/// Result links grouped by platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformLinks {
    buckets: BTreeMap<SourceId, Vec<String>>,
}

impl PlatformLinks {
    /// Bucket links by platform, dropping duplicates that differ only in
    /// their query string
    pub fn bucket<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buckets: BTreeMap<SourceId, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<(SourceId, String)> = HashSet::new();

        for url in urls {
            let url = url.as_ref();
            let Some(source) = classify_link(url) else {
                continue;
            };
            let base = url.split('?').next().unwrap_or(url).to_string();
            if seen.insert((source, base)) {
                buckets.entry(source).or_default().push(url.to_string());
            }
        }

        Self { buckets }
    }

    pub fn links(&self, source: SourceId) -> &[String] {
        self.buckets.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, source: SourceId) -> bool {
        !self.links(source).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Total links across platforms
    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// `source(count)` pairs for logging, in priority order
    pub fn summary(&self) -> String {
        self.buckets
            .iter()
            .map(|(source, links)| format!("{}({})", source, links.len()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_link_signatures() {
        assert_eq!(classify_link("https://ridibooks.com/books/123"), Some(SourceId::Ridibooks));
        assert_eq!(classify_link("https://novel.munpia.com/12345"), Some(SourceId::Munpia));
        assert_eq!(
            classify_link("https://www.joara.com/book/1234"),
            Some(SourceId::Joara)
        );
        assert_eq!(classify_link("https://www.joara.com/"), None);
        assert_eq!(
            classify_link("https://series.naver.com/search/search.series?t=all"),
            None
        );
        assert_eq!(
            classify_link("https://product.kyobobook.co.kr/detail/S000001"),
            Some(SourceId::Kyobo)
        );
        assert_eq!(classify_link("https://example.com"), None);
    }

    #[test]
    fn test_bucket_dedups_by_base_url() {
        let links = PlatformLinks::bucket([
            "https://series.naver.com/novel/detail.series?productNo=1",
            "https://series.naver.com/novel/detail.series?productNo=1&x=2",
            "https://ridibooks.com/books/999",
            "https://ridibooks.com/books/999?ref=search",
            "https://ridibooks.com/books/1000",
        ]);

        // Query strings are ignored, so both series links share one base
        assert_eq!(links.links(SourceId::NaverSeries).len(), 1);
        assert_eq!(links.links(SourceId::Ridibooks).len(), 2);
        assert!(!links.has(SourceId::Munpia));
        assert_eq!(links.total(), 3);
        assert_eq!(links.summary(), "ridibooks(2), naver_series(1)");
    }

    #[test]
    fn test_extract_links_from_html() {
        let html = r#"<html><body>
            <a href="https://ridibooks.com/books/1">리디</a>
            <a>no href</a>
            <a href="/relative">rel</a>
        </body></html>"#;
        assert_eq!(
            extract_links(html),
            vec!["https://ridibooks.com/books/1".to_string(), "/relative".to_string()]
        );
    }
}
