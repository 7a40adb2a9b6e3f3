//! 예스24
//!
//! Page titles read "제목 | 저자 - 예스24". Short titles collide with
//! unrelated books, so they also need the author to agree.

use super::page::{
    document_title, element_text, json_ld_genres, GenreSignal, PageContext, PageRules,
};
use crate::matcher::{author_in_text, normalize_title, TitleMatcher};
use crate::types::{SourceId, SourceQuery};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static SITE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*-\s*예스24.*$").expect("valid regex"));
static CATEGORY_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="CategoryNumber"]"#).expect("valid selector"));

/// Split "제목 | 저자" into title and author
fn split_author(page_title: &str) -> (&str, Option<&str>) {
    let mut parts = page_title.splitn(2, '|');
    let title = parts.next().unwrap_or("").trim();
    let author = parts.next().map(str::trim).filter(|a| !a.is_empty());
    (title, author)
}

pub struct Yes24;

impl PageRules for Yes24 {
    fn source(&self) -> SourceId {
        SourceId::Yes24
    }

    fn page_title(&self, doc: &Html) -> Option<String> {
        document_title(doc)
    }

    /// Keeps the author part; [`Yes24::confirms`] needs it
    fn clean_title(&self, title: &str) -> String {
        SITE_SUFFIX_RE.replace(title, "").trim().to_string()
    }

    fn confirms(&self, matcher: &TitleMatcher, page_title: &str, query: &SourceQuery) -> bool {
        let (title, page_author) = split_author(page_title);
        if !matcher.is_match(&query.title, title, None) {
            return false;
        }

        let short = normalize_title(&query.title).chars().count()
            <= matcher.thresholds().short_title_chars;
        match (short, query.author(), page_author) {
            (true, Some(author), Some(on_page)) => author_in_text(author, on_page),
            _ => true,
        }
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let from_json_ld = json_ld_genres(doc, true)
            .iter()
            .rev()
            .find_map(|g| ctx.scan(g, ctx.confidence));
        if from_json_ld.is_some() {
            return from_json_ld;
        }

        let categories: Vec<String> = doc.select(&CATEGORY_LINK_SELECTOR).map(element_text).collect();
        categories
            .iter()
            .rev()
            .find_map(|c| ctx.scan(c, ctx.confidence))
    }
}
