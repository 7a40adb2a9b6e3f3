//! 소설넷
//!
//! Meta keywords and the product category both list several labels at
//! once; a fixed priority picks the one that says the most.

use super::page::{
    element_text, elements_with_class, meta_contents, page_text, GenreSignal, PageContext,
    PageRules,
};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static CATEGORY_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.product-category a").expect("valid selector"));

/// Label priority when a page lists several genres
const LABEL_PRIORITY: &[&str] = &[
    "스포츠", "무협", "선협", "현판", "현대판타지", "현대 판타지", "겜판", "게임판타지",
    "게임 판타지", "로판", "로맨스판타지", "로맨스 판타지", "로맨스", "퓨판", "퓨전판타지",
    "퓨전 판타지", "역사", "대체역사", "시대물", "SF", "판타지",
];

const TEXT_SCAN_CONFIDENCE: f32 = 0.80;

/// First label in priority order present among `labels`
///
/// A priority entry matches a label when it equals the label itself or the
/// genre the label maps to.
fn by_priority(labels: &[(String, String)]) -> Option<&(String, String)> {
    LABEL_PRIORITY.iter().find_map(|p| {
        labels
            .iter()
            .find(|(raw, mapped)| raw.as_str() == *p || mapped.as_str() == *p)
    })
}

pub struct Novelnet;

impl Novelnet {
    fn from_keywords(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let content = meta_contents(doc, &["keywords"]).into_iter().next()?;
        let mut found: Vec<(String, String)> = Vec::new();
        let mut rest = content.clone();
        while let Some((key, genre)) = ctx.vocabulary.scan_text(&rest) {
            found.push((key.to_string(), genre));
            rest = rest.replace(key, " ");
        }

        let (raw, genre) = match found.len() {
            0 => return None,
            1 => found.remove(0),
            _ => by_priority(&found).cloned().unwrap_or_else(|| found.remove(0)),
        };
        Some(GenreSignal {
            genre,
            raw,
            confidence: ctx.confidence,
        })
    }

    fn from_category_links(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let labels: Vec<(String, String)> = doc
            .select(&CATEGORY_LINK_SELECTOR)
            .filter_map(|link| {
                let text = element_text(link);
                ctx.vocabulary.map_exact(&text).map(|genre| (text, genre))
            })
            .collect();
        let (raw, genre) = by_priority(&labels).or_else(|| labels.first())?.clone();
        Some(GenreSignal {
            genre,
            raw,
            confidence: ctx.confidence,
        })
    }

    fn from_genre_elements(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        elements_with_class(doc, &["div", "span", "a"], &["genre", "category"])
            .into_iter()
            .find_map(|el| ctx.scan(&element_text(el), ctx.confidence))
    }
}

impl PageRules for Novelnet {
    fn source(&self) -> SourceId {
        SourceId::Novelnet
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        Self::from_keywords(doc, ctx)
            .or_else(|| Self::from_category_links(doc, ctx))
            .or_else(|| Self::from_genre_elements(doc, ctx))
            .or_else(|| ctx.scan(&page_text(doc), TEXT_SCAN_CONFIDENCE))
    }
}
