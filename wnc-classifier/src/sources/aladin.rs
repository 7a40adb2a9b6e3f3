//! 알라딘

use super::page::{element_text, GenreSignal, PageContext, PageRules};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static TITLE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\s*-\s*알라딘.*$",
        r"\s+\d+-\d+\s*(?:완결|세트|권)?.*$",
        r"\s*/[^|]+$",
        r"\s+\(.*?\)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static CATEGORY_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="CID="]"#).expect("valid selector"));

pub struct Aladin;

impl PageRules for Aladin {
    fn source(&self) -> SourceId {
        SourceId::Aladin
    }

    fn clean_title(&self, title: &str) -> String {
        let stripped = super::page::strip_all(title, &TITLE_RES);
        stripped.split('|').next().unwrap_or("").trim().to_string()
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let path: Vec<String> = doc
            .select(&CATEGORY_LINK_SELECTOR)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();

        path.iter()
            .rev()
            .find_map(|c| ctx.scan(c, ctx.confidence))
            .or_else(|| ctx.scan(&path.join(" > "), ctx.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    #[test]
    fn test_clean_title() {
        let html = "<title>달빛조각사 1-58 완결 세트 - 알라딘</title>";
        assert_eq!(fixtures::title(&Aladin, html).as_deref(), Some("달빛조각사"));

        let html = "<title>전지적 독자 시점 (특별판) - 알라딘</title>";
        assert_eq!(fixtures::title(&Aladin, html).as_deref(), Some("전지적 독자 시점"));
    }

    #[test]
    fn test_deepest_category_link() {
        let html = r#"<div>
            <a href="/shop/wbrowse.aspx?CID=1">국내도서</a>
            <a href="/shop/wbrowse.aspx?CID=50993">소설/시/희곡</a>
            <a href="/shop/wbrowse.aspx?CID=50927">대체역사</a>
        </div>"#;
        let signal = fixtures::signal(&Aladin, html).unwrap();
        assert_eq!(signal.genre, "역사");
        assert_eq!(signal.confidence, 0.85);
    }
}
