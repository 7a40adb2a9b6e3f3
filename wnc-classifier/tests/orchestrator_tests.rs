//! Orchestrator integration tests
//!
//! Full classification runs against in-memory search results and pages:
//! real extractors, arbiter, breakers and cache, no network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wnc_classifier::authors::AuthorRegistry;
use wnc_classifier::fetch::{CircuitBreakers, Endpoint, FetchError, FetchGuard, PageFetcher};
use wnc_classifier::matcher::TitleMatcher;
use wnc_classifier::orchestrator::{SkipReason, TraceEvent};
use wnc_classifier::search::SearchProvider;
use wnc_classifier::sources::{default_extractors, ExtractorContext, SourceArbiter};
use wnc_classifier::vocabulary::GenreVocabulary;
use wnc_classifier::{Classifier, Provenance, SourceId};
use wnc_common::ConfidenceTier;

// ============================================================================
// Test doubles
// ============================================================================

/// Pages keyed by URL; unknown URLs answer 404
#[derive(Default)]
struct Pages {
    pages: Mutex<HashMap<String, Result<String, FetchError>>>,
    calls: AtomicUsize,
}

impl Pages {
    fn page(self, url: &str, body: &str) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), Ok(body.to_string()));
        self
    }

    fn error(self, url: &str, err: FetchError) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), Err(err));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for Pages {
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

/// Search answering every query that contains a known title
#[derive(Default)]
struct Search {
    results: Vec<(String, Vec<String>)>,
    calls: AtomicUsize,
}

impl Search {
    fn results(mut self, title: &str, urls: &[&str]) -> Self {
        self.results
            .push((title.to_string(), urls.iter().map(|u| u.to_string()).collect()));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for Search {
    async fn search(&self, query: &str) -> Result<Vec<String>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .iter()
            .find(|(title, _)| query.contains(title.as_str()))
            .map(|(_, urls)| urls.clone())
            .unwrap_or_default())
    }
}

struct Harness {
    classifier: Classifier,
    pages: Arc<Pages>,
    search: Arc<Search>,
    breakers: Arc<CircuitBreakers>,
}

fn harness(pages: Pages, search: Search) -> Harness {
    let pages = Arc::new(pages);
    let search = Arc::new(search);
    let breakers = Arc::new(CircuitBreakers::new());
    let vocabulary = Arc::new(GenreVocabulary::builtin());
    let guard = Arc::new(FetchGuard::new(pages.clone(), breakers.clone(), Duration::ZERO));
    let ctx = ExtractorContext {
        guard,
        matcher: Arc::new(TitleMatcher::default()),
        vocabulary: vocabulary.clone(),
        max_pages: 3,
    };
    let arbiter = SourceArbiter::new(default_extractors(&ctx), breakers.clone(), vocabulary);

    let classifier = Classifier::builder()
        .authors(AuthorRegistry::empty())
        .sources(search.clone(), arbiter)
        .build();

    Harness {
        classifier,
        pages,
        search,
        breakers,
    }
}

const RIDI_URL: &str = "https://ridibooks.com/books/100";
const MUNPIA_URL: &str = "https://novel.munpia.com/200";

fn ridibooks_page(title: &str, genre: &str) -> String {
    format!(
        r#"<html><head><title>{} - {} 웹소설 - 리디</title></head>
        <body><div class="breadcrumb"><a>웹소설</a><a>{} 소설</a></div></body></html>"#,
        title, genre, genre
    )
}

fn munpia_page(title: &str, genre: &str) -> String {
    format!(
        r#"<html><head><title>{} - 웹소설 문피아</title></head>
        <body><p class="meta-path">홈 > 웹소설 > {}</p></body></html>"#,
        title, genre
    )
}

// ============================================================================
// Source resolution
// ============================================================================

#[tokio::test]
async fn test_source_match_resolves_high() {
    // Arrange
    let h = harness(
        Pages::default().page(RIDI_URL, &ridibooks_page("천마신교", "무협")),
        Search::default().results("천마신교", &[RIDI_URL]),
    );

    // Act
    let outcome = h.classifier.classify("천마신교 1-300 (완).txt").await;

    // Assert
    assert_eq!(outcome.result.genre, "무협");
    assert_eq!(outcome.result.confidence, ConfidenceTier::High);
    assert_eq!(outcome.result.source, Provenance::Source(SourceId::Ridibooks));
    assert!(outcome
        .trace
        .any(|e| matches!(e, TraceEvent::SourceMatched { source: SourceId::Ridibooks, .. })));
}

#[tokio::test]
async fn test_failing_source_does_not_block_later_sources() {
    let h = harness(
        Pages::default()
            .error(RIDI_URL, FetchError::Network("connection reset".into()))
            .page(MUNPIA_URL, &munpia_page("천마신교", "무협")),
        Search::default().results("천마신교", &[RIDI_URL, MUNPIA_URL]),
    );

    let outcome = h.classifier.classify("천마신교 1-300.txt").await;

    assert_eq!(outcome.result.genre, "무협");
    assert_eq!(outcome.result.source, Provenance::Source(SourceId::Munpia));
    assert!(outcome
        .trace
        .any(|e| matches!(e, TraceEvent::SourceTried { source: SourceId::Ridibooks, .. })));
}

#[tokio::test]
async fn test_mismatched_page_falls_through_to_fallbacks() {
    let h = harness(
        Pages::default().page(RIDI_URL, &ridibooks_page("전혀 다른 작품", "로판")),
        Search::default().results("천재 투수", &[RIDI_URL]),
    );

    let outcome = h.classifier.classify("천재 투수의 메이저리그 1-200.txt").await;

    assert_eq!(outcome.result.genre, "스포츠");
    assert_eq!(outcome.result.source, Provenance::TitleKeyword);
    assert_eq!(outcome.result.confidence, ConfidenceTier::Medium);
}

// ============================================================================
// Cache idempotence
// ============================================================================

#[tokio::test]
async fn test_second_lookup_is_served_from_cache_without_fetches() {
    let h = harness(
        Pages::default().page(RIDI_URL, &ridibooks_page("천마신교", "무협")),
        Search::default().results("천마신교", &[RIDI_URL]),
    );

    let first = h.classifier.classify("천마신교 1-300.txt").await;
    let fetches = h.pages.calls();
    let searches = h.search.calls();

    let second = h.classifier.classify("천마신교 301-600.txt").await;

    assert_eq!(first.result, second.result);
    assert_eq!(h.pages.calls(), fetches);
    assert_eq!(h.search.calls(), searches);
    assert!(second.trace.any(|e| matches!(e, TraceEvent::CacheHit { .. })));
}

#[tokio::test]
async fn test_tag_shortcut_skips_network() {
    let h = harness(Pages::default(), Search::default());

    let outcome = h.classifier.classify("[현판] 재벌집 막내아들 1-326.txt").await;

    assert_eq!(outcome.result.genre, "현판");
    assert_eq!(outcome.result.source, Provenance::Tag);
    assert_eq!(h.search.calls(), 0);
    assert_eq!(h.pages.calls(), 0);
}

// ============================================================================
// Circuit breakers
// ============================================================================

#[tokio::test]
async fn test_quota_on_one_item_disables_source_for_later_items() {
    // Arrange
    let second_munpia = "https://novel.munpia.com/300";
    let h = harness(
        Pages::default()
            .error(MUNPIA_URL, FetchError::QuotaExceeded(429))
            .page(second_munpia, &munpia_page("붉은 달", "무협")),
        Search::default()
            .results("검은 성", &[MUNPIA_URL])
            .results("붉은 달", &[second_munpia]),
    );

    // Act
    let first = h.classifier.classify("검은 성 1-10.txt").await;
    let fetches_after_first = h.pages.calls();
    let second = h.classifier.classify("붉은 달 1-10.txt").await;

    // Assert
    assert!(h.breakers.is_open(Endpoint::Source(SourceId::Munpia)));
    assert!(first
        .trace
        .any(|e| matches!(e, TraceEvent::SourceFailed { source: SourceId::Munpia, .. })));
    assert!(second.trace.any(|e| matches!(
        e,
        TraceEvent::SourceSkipped {
            source: SourceId::Munpia,
            reason: SkipReason::CircuitOpen
        }
    )));
    assert_eq!(h.pages.calls(), fetches_after_first);
    assert_ne!(second.result.source, Provenance::Source(SourceId::Munpia));
}

#[tokio::test]
async fn test_nothing_found_is_unclassified_low() {
    let h = harness(Pages::default(), Search::default());

    let outcome = h.classifier.classify("검은 성 1-10.txt").await;

    assert!(outcome.result.is_unclassified());
    assert_eq!(outcome.result.confidence, ConfidenceTier::Low);
    assert!(outcome.trace.any(|e| matches!(e, TraceEvent::Unclassified)));
}
