//! 조아라
//!
//! Work pages are rendered client-side and many sit behind login or adult
//! verification. Only the server-rendered shell is read; gated pages are
//! skipped, and at most two candidates are tried.

use super::page::{document_title, element_text, page_text, GenreSignal, PageContext, PageRules};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static GENRE_SPAN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.items span").expect("valid selector"));

const BASE_URL: &str = "https://www.joara.com";

/// Page-title fragments of login and verification walls
const GATE_MARKERS: &[&str] = &["로그인", "인증", "성인", "19세", "본인확인", "adult", "login"];

const TEXT_SCAN_CONFIDENCE: f32 = 0.80;

pub struct Joara;

impl PageRules for Joara {
    fn source(&self) -> SourceId {
        SourceId::Joara
    }

    fn canonical_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", BASE_URL, url)
        } else {
            format!("{}/{}", BASE_URL, url)
        }
    }

    fn is_gated(&self, doc: &Html) -> bool {
        let title = document_title(doc).unwrap_or_default().to_lowercase();
        GATE_MARKERS.iter().any(|m| title.contains(m))
    }

    fn page_title(&self, doc: &Html) -> Option<String> {
        document_title(doc)
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        doc.select(&GENRE_SPAN_SELECTOR)
            .next()
            .and_then(|span| ctx.exact_label(&element_text(span), ctx.confidence))
            .or_else(|| ctx.scan(&page_text(doc), TEXT_SCAN_CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            Joara.canonical_url("/book/1234"),
            "https://www.joara.com/book/1234"
        );
        assert_eq!(
            Joara.canonical_url("https://www.joara.com/book/1"),
            "https://www.joara.com/book/1"
        );
    }

    #[test]
    fn test_gated_page() {
        let doc = Html::parse_document("<title>조아라 - 로그인</title>");
        assert!(Joara.is_gated(&doc));
        let doc = Html::parse_document("<title>Adult Verification</title>");
        assert!(Joara.is_gated(&doc));
        let doc = Html::parse_document("<title>검을 든 사서</title>");
        assert!(!Joara.is_gated(&doc));
    }

    #[test]
    fn test_items_span() {
        let html = r#"<div class="items"><span>무협</span><span>연재</span></div>"#;
        let signal = fixtures::signal(&Joara, html).unwrap();
        assert_eq!(signal.genre, "무협");
        assert_eq!(signal.confidence, 0.85);
    }
}
