//! 리디북스
//!
//! Most taxonomy-specific source. Every candidate page is read and the most
//! specific genre across pages wins, since one work often has several
//! editions filed under different categories.

use super::page::{
    element_text, elements_with_class, json_ld_genres, meta_contents, page_text, GenreSignal,
    PageContext, PageRules,
};
use crate::types::{SourceId, SourceResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use wnc_common::genre;

static TITLE_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*-\s*(?:판타지|로맨스|로판|무협|BL|현대판타지|퓨전판타지|게임판타지|정통판타지|선협|역사|SF|스포츠|겜판|퓨판|현판)?\s*(?:웹소설|e북|전자책|소설)?\s*-?\s*리디.*$",
    )
    .expect("valid regex")
});
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));
static HREF_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Link texts that name a genre outright
const GENRE_LINK_TEXTS: &[&str] = &["퓨전 판타지", "현대 판타지", "게임 판타지", "로맨스 판타지", "무협", "판타지"];

/// Body-text labels, checked in order
const TEXT_LABELS: &[&str] = &[
    "퓨전판타지", "퓨전 판타지", "현대판타지", "게임판타지", "로맨스판타지", "판타지", "무협", "로맨스",
];

/// Preference when pages disagree
const PAGE_PREFERENCE: &[&str] = &[
    genre::HISTORY,
    genre::SPORTS,
    genre::MARTIAL_ARTS,
    genre::XIANXIA,
    genre::ROMANCE_FANTASY,
    genre::GAME_FANTASY,
    genre::MODERN_FANTASY,
    genre::FUSION_FANTASY,
    genre::SCI_FI,
    genre::FANTASY,
];

const TEXT_SCAN_CONFIDENCE: f32 = 0.90;

pub struct Ridibooks;

impl Ridibooks {
    fn from_json_ld(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        json_ld_genres(doc, false)
            .iter()
            .find_map(|g| ctx.label(g, ctx.confidence))
    }

    fn from_breadcrumb(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        elements_with_class(doc, &["nav", "ol", "ul", "div"], &["breadcrumb", "category"])
            .into_iter()
            .find_map(|crumb| {
                let last = crumb.select(&LINK_SELECTOR).last()?;
                let text = element_text(last);
                let cleaned = text
                    .replace(" 웹소설", "")
                    .replace(" 소설", "")
                    .replace(" 장르", "");
                ctx.label(&cleaned, ctx.confidence).map(|signal| GenreSignal { raw: text, ..signal })
            })
    }

    fn from_meta(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        meta_contents(doc, &["keywords"]).iter().find_map(|content| {
            let raw: String = content.chars().take(30).collect();
            ctx.scan(content, ctx.confidence)
                .map(|signal| GenreSignal { raw, ..signal })
        })
    }

    fn from_links(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let texts: Vec<String> = doc.select(&HREF_SELECTOR).map(element_text).collect();
        GENRE_LINK_TEXTS
            .iter()
            .filter(|label| texts.iter().any(|t| t == *label))
            .find_map(|label| ctx.label(label, ctx.confidence))
    }

    fn from_text(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let text = page_text(doc);
        TEXT_LABELS
            .iter()
            .filter(|label| text.contains(*label))
            .find_map(|label| ctx.label(label, TEXT_SCAN_CONFIDENCE))
    }
}

impl PageRules for Ridibooks {
    fn source(&self) -> SourceId {
        SourceId::Ridibooks
    }

    fn page_title(&self, doc: &Html) -> Option<String> {
        super::page::document_title(doc)
    }

    fn clean_title(&self, title: &str) -> String {
        TITLE_SUFFIX_RE.replace(title, "").trim().to_string()
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        Self::from_json_ld(doc, ctx)
            .or_else(|| Self::from_breadcrumb(doc, ctx))
            .or_else(|| Self::from_meta(doc, ctx))
            .or_else(|| Self::from_links(doc, ctx))
            .or_else(|| Self::from_text(doc, ctx))
    }

    fn collects_all_pages(&self) -> bool {
        true
    }

    fn choose(&self, candidates: Vec<SourceResult>) -> Option<SourceResult> {
        if candidates.len() > 1 {
            let found: Vec<&str> = candidates.iter().map(|c| c.genre.as_str()).collect();
            debug!(genres = ?found, "Several genres across pages, picking by preference");
        }
        let preferred = PAGE_PREFERENCE
            .iter()
            .find_map(|g| candidates.iter().position(|c| c.genre == *g));
        match preferred {
            Some(idx) => candidates.into_iter().nth(idx),
            None => candidates.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    #[test]
    fn test_clean_title() {
        let html = "<title>마왕 조동칠 - 판타지 웹소설 - 리디</title>";
        assert_eq!(fixtures::title(&Ridibooks, html).as_deref(), Some("마왕 조동칠"));

        let html = "<title>후회의 산미 - 로판 웹소설 - 리디</title>";
        assert_eq!(fixtures::title(&Ridibooks, html).as_deref(), Some("후회의 산미"));
    }

    #[test]
    fn test_json_ld_first() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"genre": "현대 판타지"}</script>
            </head><body><div class="breadcrumb"><a>홈</a><a>무협 소설</a></div></body></html>"#;
        let signal = fixtures::signal(&Ridibooks, html).unwrap();
        assert_eq!(signal.genre, "현판");
        assert_eq!(signal.confidence, 0.95);
    }

    #[test]
    fn test_breadcrumb_last_link() {
        let html = r#"<div class="header-breadcrumb"><a>웹소설</a><a>무협 소설</a></div>"#;
        let signal = fixtures::signal(&Ridibooks, html).unwrap();
        assert_eq!(signal.genre, "무협");
        assert_eq!(signal.raw, "무협 소설");
    }

    #[test]
    fn test_body_text_fallback_confidence() {
        let html = "<html><body><p>이 작품은 게임판타지 장르입니다</p></body></html>";
        let signal = fixtures::signal(&Ridibooks, html).unwrap();
        assert_eq!(signal.genre, "겜판");
        assert_eq!(signal.confidence, TEXT_SCAN_CONFIDENCE);
    }

    #[test]
    fn test_choose_prefers_history_over_fantasy() {
        let candidates = vec![
            SourceResult::new("판타지", 0.95, SourceId::Ridibooks, "판타지", "u1"),
            SourceResult::new("역사", 0.95, SourceId::Ridibooks, "대체역사", "u2"),
        ];
        let chosen = Ridibooks.choose(candidates).unwrap();
        assert_eq!(chosen.genre, "역사");
        assert_eq!(chosen.url, "u2");
    }
}
