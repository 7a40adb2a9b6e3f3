//! Shared page-extraction machinery
//!
//! Platforms differ in where the page title lives, which boilerplate wraps
//! it and where the genre label sits. [`PageRules`] captures those
//! differences; [`PlatformExtractor`] runs the common loop for any rules:
//!
//! 1. Fetch up to the page limit of candidate URLs (single-page failures are skipped)
//! 2. Confirm identity against the cleaned page title
//! 3. Read the first genre signal the rules find on a confirmed page

use crate::fetch::{Endpoint, FetchError, FetchGuard};
use crate::matcher::TitleMatcher;
use crate::types::{ExtractionError, SourceExtractor, SourceId, SourceQuery, SourceResult};
use crate::vocabulary::GenreVocabulary;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid selector"));
static OG_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));
static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[content]").expect("valid selector"));
static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});
static ANY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("*").expect("valid selector"));

/// Genre signal read from one page
#[derive(Debug, Clone, PartialEq)]
pub struct GenreSignal {
    /// Canonical genre
    pub genre: String,
    /// Label exactly as the page showed it
    pub raw: String,
    pub confidence: f32,
}

/// Per-page inputs available to [`PageRules::genre_signal`]
pub struct PageContext<'a> {
    pub vocabulary: &'a GenreVocabulary,
    pub url: &'a str,
    /// Confidence baseline of the source
    pub confidence: f32,
}

impl PageContext<'_> {
    /// Signal for a label, mapped through the vocabulary
    pub fn label(&self, raw: &str, confidence: f32) -> Option<GenreSignal> {
        let raw = raw.trim();
        self.vocabulary.map_known(raw).map(|genre| GenreSignal {
            genre,
            raw: raw.to_string(),
            confidence,
        })
    }

    /// Signal only when `raw` is exactly a vocabulary key
    pub fn exact_label(&self, raw: &str, confidence: f32) -> Option<GenreSignal> {
        let raw = raw.trim();
        self.vocabulary.map_exact(raw).map(|genre| GenreSignal {
            genre,
            raw: raw.to_string(),
            confidence,
        })
    }

    /// Signal for the longest vocabulary key found in `text`
    pub fn scan(&self, text: &str, confidence: f32) -> Option<GenreSignal> {
        self.vocabulary.scan_text(text).map(|(key, genre)| GenreSignal {
            genre,
            raw: key.to_string(),
            confidence,
        })
    }
}

/// Platform page conventions
pub trait PageRules: Send + Sync {
    fn source(&self) -> SourceId;

    /// Rewrite a candidate URL before fetching
    fn canonical_url(&self, url: &str) -> String {
        url.to_string()
    }

    /// Title shown on the page, before cleanup
    fn page_title(&self, doc: &Html) -> Option<String> {
        og_title(doc).or_else(|| document_title(doc))
    }

    /// Strip platform boilerplate from the page title
    fn clean_title(&self, title: &str) -> String {
        title.trim().to_string()
    }

    /// Login or age-verification page instead of a work page
    fn is_gated(&self, _doc: &Html) -> bool {
        false
    }

    /// Whether the cleaned page title names the queried work
    fn confirms(&self, matcher: &TitleMatcher, page_title: &str, query: &SourceQuery) -> bool {
        matcher.is_match(&query.title, page_title, query.author())
    }

    /// Genre signal on a confirmed page, in the platform's signal order
    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal>;

    /// Read every candidate page and let [`PageRules::choose`] pick
    fn collects_all_pages(&self) -> bool {
        false
    }

    /// Pick among results from several pages
    fn choose(&self, candidates: Vec<SourceResult>) -> Option<SourceResult> {
        candidates.into_iter().next()
    }
}

/// Services shared by every platform extractor
#[derive(Clone)]
pub struct ExtractorContext {
    pub guard: Arc<FetchGuard>,
    pub matcher: Arc<TitleMatcher>,
    pub vocabulary: Arc<GenreVocabulary>,
    /// Candidate pages fetched per lookup
    pub max_pages: usize,
}

enum PageVerdict {
    Gated,
    NoTitle,
    Mismatch(String),
    NoSignal,
    Signal(GenreSignal),
}

/// [`SourceExtractor`] driven by a set of [`PageRules`]
pub struct PlatformExtractor<R> {
    rules: R,
    ctx: ExtractorContext,
}

impl<R: PageRules> PlatformExtractor<R> {
    pub fn new(rules: R, ctx: ExtractorContext) -> Self {
        Self { rules, ctx }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Judge one fetched page (synchronous: `Html` is not `Send`)
    fn inspect(&self, body: &str, url: &str, query: &SourceQuery) -> PageVerdict {
        let doc = Html::parse_document(body);

        if self.rules.is_gated(&doc) {
            return PageVerdict::Gated;
        }

        let Some(raw_title) = self.rules.page_title(&doc) else {
            return PageVerdict::NoTitle;
        };
        let cleaned = self.rules.clean_title(&raw_title);
        if cleaned.is_empty() {
            return PageVerdict::NoTitle;
        }
        if !self.rules.confirms(&self.ctx.matcher, &cleaned, query) {
            return PageVerdict::Mismatch(cleaned);
        }

        let page_ctx = PageContext {
            vocabulary: &self.ctx.vocabulary,
            url,
            confidence: self.rules.source().base_confidence(),
        };
        match self.rules.genre_signal(&doc, &page_ctx) {
            Some(signal) => PageVerdict::Signal(signal),
            None => PageVerdict::NoSignal,
        }
    }
}

#[async_trait]
impl<R: PageRules> SourceExtractor for PlatformExtractor<R> {
    fn source(&self) -> SourceId {
        self.rules.source()
    }

    async fn extract_genre(
        &self,
        urls: &[String],
        query: &SourceQuery,
    ) -> Result<Option<SourceResult>, ExtractionError> {
        let source = self.rules.source();
        let endpoint = Endpoint::Source(source);
        let limit = source.page_limit(self.ctx.max_pages);

        let mut seen = HashSet::new();
        let pages: Vec<String> = urls
            .iter()
            .map(|u| self.rules.canonical_url(u))
            .filter(|u| seen.insert(u.clone()))
            .take(limit)
            .collect();

        let mut candidates = Vec::new();
        for (idx, url) in pages.iter().enumerate() {
            debug!(source = %source, page = idx + 1, of = pages.len(), url = %url, "Checking page");

            let body = match self.ctx.guard.fetch(endpoint, url).await {
                Ok(body) => body,
                Err(err @ (FetchError::QuotaExceeded(_) | FetchError::CircuitOpen(_))) => {
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(source = %source, url = %url, error = %err, "Page fetch failed, skipping");
                    continue;
                }
            };

            match self.inspect(&body, url, query) {
                PageVerdict::Signal(signal) => {
                    debug!(
                        source = %source,
                        raw = %signal.raw,
                        genre = %signal.genre,
                        "Genre signal found"
                    );
                    let result = SourceResult::new(
                        signal.genre,
                        signal.confidence,
                        source,
                        signal.raw,
                        url.clone(),
                    );
                    if !self.rules.collects_all_pages() {
                        return Ok(Some(result));
                    }
                    candidates.push(result);
                }
                PageVerdict::Mismatch(title) => {
                    debug!(source = %source, page_title = %title, "Title mismatch");
                }
                PageVerdict::Gated => debug!(source = %source, url = %url, "Gated page, skipping"),
                PageVerdict::NoTitle => debug!(source = %source, url = %url, "No page title"),
                PageVerdict::NoSignal => debug!(source = %source, url = %url, "No genre signal"),
            }
        }

        Ok(self.rules.choose(candidates))
    }
}

// ============================================================================
// HTML helpers
// ============================================================================

/// Stripped text of an element, pieces joined without separators
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

/// Raw text of an element, pieces separated by spaces
pub fn element_text_spaced(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// `<title>` text
pub fn document_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// `og:title` meta content
pub fn og_title(doc: &Html) -> Option<String> {
    doc.select(&OG_TITLE_SELECTOR)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Contents of meta tags whose `name` or `property` is one of `keys`
pub fn meta_contents(doc: &Html, keys: &[&str]) -> Vec<String> {
    doc.select(&META_SELECTOR)
        .filter(|m| {
            let el = m.value();
            let name = el.attr("name").or_else(|| el.attr("property")).unwrap_or("");
            keys.contains(&name)
        })
        .filter_map(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Document text without script and style contents
pub fn page_text(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
            .map(|name| matches!(name.as_str(), "script" | "style" | "noscript"))
            .unwrap_or(false);
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

/// `genre` values from JSON-LD blocks, in document order
///
/// `book_only` restricts to objects whose `@type` is `Book`. A `genre`
/// holding a list yields each entry.
pub fn json_ld_genres(doc: &Html, book_only: bool) -> Vec<String> {
    let mut genres = Vec::new();
    for script in doc.select(&JSON_LD_SELECTOR) {
        let raw: String = script.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            debug!("Skipping malformed JSON-LD block");
            continue;
        };
        let objects = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        for object in objects {
            if book_only && object.get("@type").and_then(|t| t.as_str()) != Some("Book") {
                continue;
            }
            match object.get("genre") {
                Some(serde_json::Value::String(g)) => genres.push(g.clone()),
                Some(serde_json::Value::Array(list)) => genres.extend(
                    list.iter().filter_map(|g| g.as_str()).map(str::to_string),
                ),
                _ => {}
            }
        }
    }
    genres
}

/// Elements named one of `tags` whose class contains one of `needles`
/// (case-insensitive)
pub fn elements_with_class<'a>(doc: &'a Html, tags: &[&str], needles: &[&str]) -> Vec<ElementRef<'a>> {
    doc.select(&ANY_SELECTOR)
        .filter(|el| tags.contains(&el.value().name()))
        .filter(|el| {
            el.value()
                .attr("class")
                .map(|class| {
                    let class = class.to_lowercase();
                    needles.iter().any(|n| class.contains(&n.to_lowercase()))
                })
                .unwrap_or(false)
        })
        .collect()
}

/// Remove every match of each pattern, in order
pub fn strip_all(text: &str, patterns: &[regex::Regex]) -> String {
    let mut out = text.to_string();
    for re in patterns {
        out = re.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;
    use crate::fetch::CircuitBreakers;
    use std::time::Duration;

    struct Plain;

    impl PageRules for Plain {
        fn source(&self) -> SourceId {
            SourceId::Mrblue
        }

        fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
            ctx.scan(&page_text(doc), 0.75)
        }
    }

    fn context(fetcher: Arc<MockFetcher>) -> ExtractorContext {
        ExtractorContext {
            guard: Arc::new(FetchGuard::new(
                fetcher,
                Arc::new(CircuitBreakers::new()),
                Duration::ZERO,
            )),
            matcher: Arc::new(TitleMatcher::default()),
            vocabulary: Arc::new(GenreVocabulary::builtin()),
            max_pages: 3,
        }
    }

    const MATCHING_PAGE: &str =
        "<html><head><title>전지적 독자 시점</title></head><body>장르 현대판타지</body></html>";

    #[test]
    fn test_helpers() {
        let doc = Html::parse_document(
            r#"<html><head>
                <title> 제목 </title>
                <meta property="og:title" content="OG 제목">
                <meta name="keywords" content="현대판타지, 회귀">
                <script type="application/ld+json">{"@type": "Book", "genre": ["소설", "판타지"]}</script>
                <style>.genre { color: red }</style>
            </head><body><div class="Genre-Box">무협</div></body></html>"#,
        );

        assert_eq!(document_title(&doc).as_deref(), Some("제목"));
        assert_eq!(og_title(&doc).as_deref(), Some("OG 제목"));
        assert_eq!(meta_contents(&doc, &["keywords"]), vec!["현대판타지, 회귀".to_string()]);
        assert_eq!(json_ld_genres(&doc, true), vec!["소설".to_string(), "판타지".to_string()]);
        assert!(!page_text(&doc).contains("color"));
        assert_eq!(elements_with_class(&doc, &["div"], &["genre"]).len(), 1);
    }

    #[tokio::test]
    async fn test_skips_failed_page_and_matches_next() {
        // Arrange
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_error("https://a.test/1", FetchError::Timeout("https://a.test/1".into()))
                .with_page("https://a.test/2", MATCHING_PAGE),
        );
        let extractor = PlatformExtractor::new(Plain, context(fetcher.clone()));
        let urls = vec!["https://a.test/1".to_string(), "https://a.test/2".to_string()];
        let query = SourceQuery::new("전지적 독자 시점", None);

        // Act
        let result = extractor.extract_genre(&urls, &query).await.unwrap();

        // Assert
        let result = result.expect("second page should match");
        assert_eq!(result.genre, "현판");
        assert_eq!(result.url, "https://a.test/2");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_mismatched_title_yields_none() {
        let fetcher = Arc::new(MockFetcher::new().with_page("https://a.test/1", MATCHING_PAGE));
        let extractor = PlatformExtractor::new(Plain, context(fetcher));
        let query = SourceQuery::new("마왕", None);

        let result = extractor
            .extract_genre(&["https://a.test/1".to_string()], &query)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_quota_aborts_source() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_error("https://a.test/1", FetchError::QuotaExceeded(429))
                .with_page("https://a.test/2", MATCHING_PAGE),
        );
        let extractor = PlatformExtractor::new(Plain, context(fetcher.clone()));
        let urls = vec!["https://a.test/1".to_string(), "https://a.test/2".to_string()];

        let err = extractor
            .extract_genre(&urls, &SourceQuery::new("전지적 독자 시점", None))
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::QuotaExceeded(_)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_page_limit_and_dedup() {
        let fetcher = Arc::new(MockFetcher::new());
        let extractor = PlatformExtractor::new(Plain, context(fetcher.clone()));
        let urls: Vec<String> = ["1", "1", "2", "3", "4"]
            .iter()
            .map(|n| format!("https://a.test/{}", n))
            .collect();

        let result = extractor
            .extract_genre(&urls, &SourceQuery::new("아무 제목이나 길게", None))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(fetcher.calls(), 3);
    }
}
