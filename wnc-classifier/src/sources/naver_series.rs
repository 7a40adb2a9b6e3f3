//! 네이버시리즈
//!
//! E-book pages carry a category link; web-novel pages only expose
//! hashtags in the meta description. The series "판타지" and "현대판타지"
//! buckets are broad, so those results are refined downstream.

use super::page::{
    document_title, element_text, og_title, page_text, GenreSignal, PageContext, PageRules,
};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use wnc_common::genre;

static CLEAN_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\s*[\[(【<].*?[\])】>]\s*", " "),
        (r"(?i)\s*[-|]\s*(?:웹소설\s*홈\s*:\s*)?네이버\s*시리즈.*$", ""),
        (r"(?i)\s*[-|]\s*네이버시리즈.*$", ""),
        (r"^(?:개정판|합본|특별판|완전판|무삭제판|리마스터판)\s*\|\s*", ""),
        (r"\s*\|\s*(?:개정판|합본|특별판|완전판|무삭제판|리마스터판)$", ""),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(p).expect("valid regex"), *r))
    .collect()
});
static SITE_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^네이버\s*시리즈\s*$").expect("valid regex"));
static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([가-힣a-zA-Z]+)").expect("valid regex"));
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3").expect("valid selector"));
static EBOOK_CATEGORY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"a[href*="/ebook/categoryProductList.series"]"#).expect("valid selector")
});
static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[content]").expect("valid selector"));
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// Headings that belong to site chrome
const CHROME_WORDS: &[&str] = &[
    "navigation", "nav", "bar", "menu", "header", "footer", "local", "global", "series",
];

/// E-book category label → canonical genre
const EBOOK_CATEGORIES: &[(&str, &str)] = &[
    ("소설", genre::GENERAL_NOVEL),
    ("판타지", genre::FANTASY),
    ("로맨스", genre::ROMANCE_FANTASY),
    ("무협", genre::MARTIAL_ARTS),
    ("BL", genre::ROMANCE_FANTASY),
    ("라이트노벨", genre::FANTASY),
    ("추리/미스터리", genre::GENERAL_NOVEL),
    ("SF", genre::SCI_FI),
    ("역사", genre::HISTORY),
    ("스릴러", genre::GENERAL_NOVEL),
    ("공포", genre::GENERAL_NOVEL),
    ("시/에세이", genre::GENERAL_NOVEL),
    ("인문", genre::GENERAL_NOVEL),
    ("자기계발", genre::GENERAL_NOVEL),
];

/// Meta content worth scanning must mention one of these
const META_HINTS: &[&str] = &["판타지", "무협", "로맨스", "BL"];

/// Characters of body text after the title that are scanned
const TEXT_WINDOW: usize = 1000;

fn mentions_site(text: &str) -> bool {
    text.contains("네이버") || text.contains("시리즈") || text.to_lowercase().contains("naver")
}

pub struct NaverSeries;

impl NaverSeries {
    fn from_ebook_category(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        if !ctx.url.contains("/ebook/") {
            return None;
        }
        doc.select(&EBOOK_CATEGORY_SELECTOR).find_map(|link| {
            let text = element_text(link);
            EBOOK_CATEGORIES
                .iter()
                .find(|(label, _)| *label == text)
                .filter(|(_, g)| ctx.vocabulary.is_valid(g))
                .map(|(_, g)| GenreSignal {
                    genre: g.to_string(),
                    raw: text.clone(),
                    confidence: ctx.confidence,
                })
        })
    }

    fn from_meta(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        doc.select(&META_SELECTOR).find_map(|meta| {
            let content = meta.value().attr("content").unwrap_or("");
            let name = meta.value().attr("name").unwrap_or("");

            if name == "description" && content.contains('#') {
                let hashtag = HASHTAG_RE
                    .captures_iter(content)
                    .find_map(|caps| ctx.exact_label(&caps[1], ctx.confidence));
                if hashtag.is_some() {
                    return hashtag;
                }
            }

            if META_HINTS.iter().any(|h| content.contains(h)) {
                return ctx.scan(content, ctx.confidence);
            }
            None
        })
    }

    /// Scan the text right after the title; sidebars mention every genre
    fn from_text(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let body_text = doc
            .select(&BODY_SELECTOR)
            .next()
            .map(|b| b.text().collect::<String>())
            .unwrap_or_else(|| page_text(doc));

        let start = document_title(doc)
            .and_then(|t| body_text.find(&t))
            .unwrap_or(0);
        let window: String = body_text[start..].chars().take(TEXT_WINDOW).collect();
        ctx.scan(&window, ctx.confidence)
    }
}

impl PageRules for NaverSeries {
    fn source(&self) -> SourceId {
        SourceId::NaverSeries
    }

    fn page_title(&self, doc: &Html) -> Option<String> {
        if let Some(og) = og_title(doc).filter(|t| !t.contains("네이버") && !t.contains("시리즈")) {
            return Some(og);
        }

        let heading = doc.select(&HEADING_SELECTOR).map(element_text).find(|text| {
            let lower = text.to_lowercase();
            let chrome = CHROME_WORDS.iter().any(|w| lower.contains(w));
            let acronym = text.chars().count() <= 10
                && text.chars().any(|c| c.is_uppercase())
                && !text.chars().any(|c| c.is_lowercase());
            !chrome && !acronym && text.chars().count() >= 2 && !mentions_site(text)
        });
        heading.or_else(|| document_title(doc))
    }

    fn clean_title(&self, title: &str) -> String {
        let mut cleaned = title.to_string();
        for (re, replacement) in CLEAN_RES.iter() {
            cleaned = re.replace_all(&cleaned, *replacement).into_owned();
        }
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if SITE_ONLY_RE.is_match(&cleaned) || cleaned.to_lowercase() == "네이버시리즈" {
            return String::new();
        }
        cleaned
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        Self::from_ebook_category(doc, ctx)
            .or_else(|| Self::from_meta(doc, ctx))
            .or_else(|| Self::from_text(doc, ctx))
    }
}
