//! 미스터블루

use super::page::{
    element_text, elements_with_class, meta_contents, page_text, GenreSignal, PageContext,
    PageRules,
};
use crate::types::SourceId;
use scraper::Html;

const TEXT_SCAN_CONFIDENCE: f32 = 0.75;

pub struct Mrblue;

impl Mrblue {
    fn from_meta(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        meta_contents(doc, &["keywords", "description", "og:description"])
            .iter()
            .find_map(|content| ctx.scan(content, ctx.confidence))
    }

    fn from_badges(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let texts: Vec<String> =
            elements_with_class(doc, &["span", "div", "a", "li"], &["genre", "tag", "badge"])
                .into_iter()
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();
        texts
            .iter()
            .find_map(|t| ctx.exact_label(t, ctx.confidence))
            .or_else(|| texts.iter().find_map(|t| ctx.scan(t, ctx.confidence)))
    }

    fn from_breadcrumb(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        elements_with_class(doc, &["div", "ul", "nav"], &["category", "breadcrumb"])
            .into_iter()
            .find_map(|el| ctx.scan(&element_text(el), ctx.confidence))
    }
}

impl PageRules for Mrblue {
    fn source(&self) -> SourceId {
        SourceId::Mrblue
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        Self::from_meta(doc, ctx)
            .or_else(|| Self::from_badges(doc, ctx))
            .or_else(|| Self::from_breadcrumb(doc, ctx))
            .or_else(|| ctx.scan(&page_text(doc), TEXT_SCAN_CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    #[test]
    fn test_meta_description() {
        let html = r#"<meta property="og:description" content="[무협] 천하제일 검객의 귀환">"#;
        let signal = fixtures::signal(&Mrblue, html).unwrap();
        assert_eq!(signal.genre, "무협");
        assert_eq!(signal.confidence, 0.85);
    }

    #[test]
    fn test_badge_exact_before_contained() {
        let html = r#"<ul>
            <li class="tag">판타지 베스트</li>
            <li class="tag">로판</li>
        </ul>"#;
        let signal = fixtures::signal(&Mrblue, html).unwrap();
        assert_eq!(signal.genre, "로판");
    }

    #[test]
    fn test_text_scan_confidence() {
        let html = "<html><body><p>스포츠 장르 신작</p></body></html>";
        let signal = fixtures::signal(&Mrblue, html).unwrap();
        assert_eq!(signal.genre, "스포츠");
        assert_eq!(signal.confidence, TEXT_SCAN_CONFIDENCE);
    }
}
