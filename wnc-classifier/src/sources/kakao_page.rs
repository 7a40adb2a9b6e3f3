//! 카카오페이지

use super::page::{document_title, element_text, page_text, GenreSignal, PageContext, PageRules};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TITLE_SUFFIX_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\s*-\s*(?:웹소설|웹툰|책)\s*\|?\s*카카오페이지.*$",
        r"\s+\d+화\s*\|?\s*카카오페이지.*$",
        r"\s*\|\s*카카오페이지.*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static GENRE_SPAN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.break-all.align-middle").expect("valid selector"));

const TEXT_SCAN_CONFIDENCE: f32 = 0.85;

pub struct KakaoPage;

impl PageRules for KakaoPage {
    fn source(&self) -> SourceId {
        SourceId::KakaoPage
    }

    fn page_title(&self, doc: &Html) -> Option<String> {
        document_title(doc)
    }

    fn clean_title(&self, title: &str) -> String {
        super::page::strip_all(title, &TITLE_SUFFIX_RES)
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        doc.select(&GENRE_SPAN_SELECTOR)
            .find_map(|span| ctx.exact_label(&element_text(span), ctx.confidence))
            .or_else(|| ctx.scan(&page_text(doc), TEXT_SCAN_CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    #[test]
    fn test_clean_title() {
        let html = "<title>나 혼자만 레벨업 - 웹소설 | 카카오페이지</title>";
        assert_eq!(fixtures::title(&KakaoPage, html).as_deref(), Some("나 혼자만 레벨업"));

        let html = "<title>달빛조각사 12화 | 카카오페이지</title>";
        assert_eq!(fixtures::title(&KakaoPage, html).as_deref(), Some("달빛조각사"));
    }

    #[test]
    fn test_genre_span() {
        let html = r#"<div>
            <span class="break-all align-middle">웹소설</span>
            <span class="break-all align-middle">현판</span>
        </div>"#;
        let signal = fixtures::signal(&KakaoPage, html).unwrap();
        assert_eq!(signal.genre, "현판");
        assert_eq!(signal.confidence, 0.90);
    }

    #[test]
    fn test_text_fallback() {
        let html = "<html><body><p>무협 연재중</p></body></html>";
        let signal = fixtures::signal(&KakaoPage, html).unwrap();
        assert_eq!(signal.genre, "무협");
        assert_eq!(signal.confidence, TEXT_SCAN_CONFIDENCE);
    }
}
