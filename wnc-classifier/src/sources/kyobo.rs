//! 교보문고
//!
//! Category trail reads "국내도서 > 소설 > 판타지소설"; the deepest
//! recognisable part wins. Catch-all categories ("일반", "기타") lower
//! confidence.

use super::page::{element_text, elements_with_class, GenreSignal, PageContext, PageRules};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use wnc_common::genre;

static TITLE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\s+\d+\s*\([^)]+\)\s*$",
        r"\s+\d+권?\s*$",
        r"\s*\([^)]*(?:완결|완|부)\s*[^)]*\)\s*$",
        r"[!?]+$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static SITE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*-\s*교보문고.*$").expect("valid regex"));

/// Bookstore category names → canonical genre
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("판타지소설", genre::FANTASY),
    ("무협소설", genre::MARTIAL_ARTS),
    ("로맨스소설", genre::ROMANCE_FANTASY),
    ("역사소설", genre::HISTORY),
    ("SF소설", genre::SCI_FI),
    ("추리소설", genre::GENERAL_NOVEL),
    ("미스터리소설", genre::GENERAL_NOVEL),
];

/// Categories too broad to trust at full confidence
const CATCH_ALL_MARKERS: &[&str] = &["일반", "기타"];
const CATCH_ALL_CONFIDENCE: f32 = 0.60;

pub struct Kyobo;

impl PageRules for Kyobo {
    fn source(&self) -> SourceId {
        SourceId::Kyobo
    }

    fn clean_title(&self, title: &str) -> String {
        let without_site = SITE_SUFFIX_RE.replace(title, "");
        let head = without_site.split('|').next().unwrap_or("").trim();
        super::page::strip_all(head, &TITLE_RES)
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let area = elements_with_class(doc, &["div", "ul"], &["category", "breadcrumb"])
            .into_iter()
            .next()?;
        let text = super::page::element_text_spaced(area);

        let parts: Vec<String> = text
            .split('>')
            .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|p| !p.is_empty())
            .collect();
        for part in parts.iter().rev() {
            let specific = CATEGORY_LABELS
                .iter()
                .find(|(label, _)| part.contains(label))
                .filter(|(_, g)| ctx.vocabulary.is_valid(g));
            if let Some((_, g)) = specific {
                return Some(GenreSignal {
                    genre: g.to_string(),
                    raw: part.clone(),
                    confidence: ctx.confidence,
                });
            }
        }

        let confidence = if CATCH_ALL_MARKERS.iter().any(|m| text.contains(m)) {
            CATCH_ALL_CONFIDENCE
        } else {
            ctx.confidence
        };
        ctx.scan(&element_text(area), confidence)
    }
}
