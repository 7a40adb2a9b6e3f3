//! 웹툰가이드
//!
//! Aggregator with generated class names. The genre block is a styled div
//! holding a bold heading and small tag divs.

use super::page::{element_text, elements_with_class, GenreSignal, PageContext, PageRules};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TITLE_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\[웹소설/소설\]\s*", ""),
        (r"<([^>]+)>", "$1"),
        (r"\[단행본\]\s*", ""),
        (r"\[세트\]\s*", ""),
        (r"\s*(?:세트|단행본)\s*$", ""),
        (r"\s*-\s*웹툰의 모든 것!.*$", ""),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(p).expect("valid regex"), *r))
    .collect()
});
static BOLD_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("b").expect("valid selector"));
static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("valid selector"));

/// Generated class fragments of the genre block
const GENRE_BLOCK_CLASSES: &[&str] = &["sc-gEvEer", "sc-jlZhew", "brirUa"];
/// Generated class fragments of the tag divs inside it
const GENRE_TAG_CLASSES: &[&str] = &["sc-cwHptR", "gKqaMv"];

/// Tag divs longer than this are descriptions, not labels
const MAX_TAG_CHARS: usize = 30;

/// Keywords looked for in the genre block, most specific first
const GENRE_KEYWORDS: &[&str] = &[
    "로맨스 판타지", "로맨스판타지", "퓨전 판타지", "퓨전판타지", "현대 판타지", "현대판타지",
    "현판", "게임 판타지", "게임판타지", "겜판", "무협 판타지", "무협판타지", "무협", "로맨스",
    "로판", "BL", "역사", "액션", "스릴러", "미스터리", "공포", "코미디", "판타지",
];

pub struct Webtoonguide;

impl Webtoonguide {
    fn genre_texts(doc: &Html) -> Vec<String> {
        let Some(block) = elements_with_class(doc, &["div"], GENRE_BLOCK_CLASSES).into_iter().next()
        else {
            return Vec::new();
        };

        let mut texts: Vec<String> = block.select(&BOLD_SELECTOR).map(element_text).collect();
        texts.extend(
            block
                .select(&DIV_SELECTOR)
                .filter(|div| {
                    div.value()
                        .attr("class")
                        .map(|c| {
                            let c = c.to_lowercase();
                            GENRE_TAG_CLASSES.iter().any(|n| c.contains(&n.to_lowercase()))
                        })
                        .unwrap_or(false)
                })
                .map(element_text)
                .filter(|t| !t.is_empty() && t.chars().count() < MAX_TAG_CHARS),
        );
        texts
    }
}

impl PageRules for Webtoonguide {
    fn source(&self) -> SourceId {
        SourceId::Webtoonguide
    }

    fn clean_title(&self, title: &str) -> String {
        let mut cleaned = title.to_string();
        for (re, replacement) in TITLE_RES.iter() {
            cleaned = re.replace_all(&cleaned, *replacement).into_owned();
        }
        cleaned.trim().to_string()
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let texts = Self::genre_texts(doc);
        if texts.is_empty() {
            return None;
        }
        let joined = texts.join(" ").to_lowercase();

        GENRE_KEYWORDS
            .iter()
            .filter(|k| joined.contains(&k.to_lowercase()))
            .find_map(|k| ctx.label(k, ctx.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    #[test]
    fn test_clean_title() {
        let html = r#"<meta property="og:title" content="[웹소설/소설] <전지적 독자 시점> - 웹툰의 모든 것!">"#;
        assert_eq!(fixtures::title(&Webtoonguide, html).as_deref(), Some("전지적 독자 시점"));

        let html = "<title>[단행본] 달빛조각사 세트</title>";
        assert_eq!(fixtures::title(&Webtoonguide, html).as_deref(), Some("달빛조각사"));
    }

    #[test]
    fn test_genre_block() {
        let html = r#"<div class="sc-gEvEer x1">
            <b>장르</b>
            <div class="sc-cwHptR">액션</div>
            <div class="sc-cwHptR">현대 판타지</div>
        </div>"#;
        let signal = fixtures::signal(&Webtoonguide, html).unwrap();
        assert_eq!(signal.genre, "현판");
        assert_eq!(signal.confidence, 0.75);
    }

    #[test]
    fn test_no_genre_block() {
        let html = "<html><body><p>판타지</p></body></html>";
        assert!(fixtures::signal(&Webtoonguide, html).is_none());
    }
}
