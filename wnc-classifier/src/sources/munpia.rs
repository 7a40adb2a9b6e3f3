//! 문피아
//!
//! Genre lives in the `p.meta-path` breadcrumb ("홈 > 웹소설 > 판타지, 퓨전").
//! Works filed under several genres are resolved to the most telling one.

use super::page::{document_title, element_text, page_text, GenreSignal, PageContext, PageRules};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static MOBILE_DETAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"m\.munpia\.com/novel/detail/(\d+)").expect("valid regex"));
static EDITION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\s*\[.*?\]\s*",
        r"^(?:개정판|합본|특별판|완전판|무삭제판|리마스터판)\s*[-|]\s*",
        r"\s*[-|]\s*(?:개정판|합본|특별판|완전판|무삭제판|리마스터판)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static H2_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2.title").expect("valid selector"));
static META_PATH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.meta-path").expect("valid selector"));
static STRONG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("strong").expect("valid selector"));

const HISTORY_LABELS: &[&str] = &["대체역사", "대체 역사", "역사"];
const FANTASY_LABELS: &[&str] = &["판타지", "현대판타지", "퓨전판타지", "퓨전", "현판"];
const MILITARY_LABELS: &[&str] = &["전쟁·밀리터리", "전쟁 밀리터리", "밀리터리", "전쟁"];

const TEXT_SCAN_CONFIDENCE: f32 = 0.85;

/// Pick the label that best describes a multi-genre work
fn resolve_multiple(labels: &[String]) -> Option<String> {
    let has = |label: &str| labels.iter().any(|l| l == label);

    if let Some(m) = MILITARY_LABELS.iter().find(|m| has(m)) {
        return Some(m.to_string());
    }
    if FANTASY_LABELS.iter().any(|f| has(f)) {
        if let Some(h) = HISTORY_LABELS.iter().find(|h| has(h)) {
            return Some(h.to_string());
        }
    }
    if has("현대판타지") && has("스포츠") {
        return Some("스포츠".to_string());
    }
    if has("현대판타지") && has("퓨전") {
        return Some("현대판타지".to_string());
    }
    if has("판타지") && has("퓨전") {
        return Some("퓨전판타지".to_string());
    }
    if has("판타지") && has("게임") {
        return Some("게임판타지".to_string());
    }
    labels.iter().max_by_key(|l| l.chars().count()).cloned()
}

pub struct Munpia;

impl Munpia {
    fn from_meta_path(doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let path = doc.select(&META_PATH_SELECTOR).next()?;
        let path_text = element_text(path);
        let parts: Vec<&str> = path_text.split('>').map(str::trim).collect();

        let genre_text = if parts.len() >= 3 {
            parts.last().map(|s| s.to_string())?
        } else {
            element_text(path.select(&STRONG_SELECTOR).next()?)
        };

        let found: Vec<String> = genre_text
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();
        let mappable: Vec<String> = found
            .iter()
            .filter(|g| ctx.vocabulary.map_exact(g).is_some())
            .cloned()
            .collect();
        let labels = if mappable.is_empty() { found } else { mappable };

        match labels.len() {
            0 => None,
            1 => ctx.exact_label(&labels[0], ctx.confidence),
            _ => {
                let primary = resolve_multiple(&labels)?;
                ctx.label(&primary, ctx.confidence)
            }
        }
    }
}

impl PageRules for Munpia {
    fn source(&self) -> SourceId {
        SourceId::Munpia
    }

    fn canonical_url(&self, url: &str) -> String {
        if MOBILE_DETAIL_RE.is_match(url) {
            MOBILE_DETAIL_RE.replace(url, "novel.munpia.com/$1").into_owned()
        } else {
            url.replace("m.munpia.com", "novel.munpia.com")
        }
    }

    fn page_title(&self, doc: &Html) -> Option<String> {
        if let Some(h2) = doc.select(&H2_TITLE_SELECTOR).next() {
            return Some(element_text(h2));
        }
        if let Some(og) = super::page::og_title(doc) {
            return Some(og);
        }
        document_title(doc).map(|t| {
            t.replace(" - 웹소설 문피아", "")
                .replace(" - 문피아", "")
                .trim()
                .to_string()
        })
    }

    fn clean_title(&self, title: &str) -> String {
        super::page::strip_all(title, &EDITION_RES)
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        Self::from_meta_path(doc, ctx).or_else(|| ctx.scan(&page_text(doc), TEXT_SCAN_CONFIDENCE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::page::fixtures;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mobile_url_rewrite() {
        assert_eq!(
            Munpia.canonical_url("https://m.munpia.com/novel/detail/289952"),
            "https://novel.munpia.com/289952"
        );
        assert_eq!(
            Munpia.canonical_url("https://m.munpia.com/other"),
            "https://novel.munpia.com/other"
        );
        assert_eq!(Munpia.canonical_url("https://novel.munpia.com/1"), "https://novel.munpia.com/1");
    }

    #[test]
    fn test_resolve_multiple() {
        assert_eq!(resolve_multiple(&labels(&["판타지", "전쟁 밀리터리"])).unwrap(), "전쟁 밀리터리");
        assert_eq!(resolve_multiple(&labels(&["판타지", "대체역사"])).unwrap(), "대체역사");
        assert_eq!(resolve_multiple(&labels(&["현대판타지", "스포츠"])).unwrap(), "스포츠");
        assert_eq!(resolve_multiple(&labels(&["현대판타지", "퓨전"])).unwrap(), "현대판타지");
        assert_eq!(resolve_multiple(&labels(&["판타지", "퓨전"])).unwrap(), "퓨전판타지");
        assert_eq!(resolve_multiple(&labels(&["판타지", "게임"])).unwrap(), "게임판타지");
        assert_eq!(resolve_multiple(&labels(&["무협", "로맨스"])).unwrap(), "로맨스");
    }

    #[test]
    fn test_meta_path_multi_genre() {
        let html = r#"<p class="meta-path">홈 > 웹소설 > 판타지, 퓨전</p>"#;
        let signal = fixtures::signal(&Munpia, html).unwrap();
        assert_eq!(signal.genre, "퓨판");
        assert_eq!(signal.confidence, 0.92);
    }

    #[test]
    fn test_meta_path_strong_fallback() {
        let html = r#"<p class="meta-path">작품 <strong>무협</strong></p>"#;
        let signal = fixtures::signal(&Munpia, html).unwrap();
        assert_eq!(signal.genre, "무협");
    }

    #[test]
    fn test_title_sources() {
        let html = r#"<html><head><title>오파츠 - 수천 년은 이른 물건 - 웹소설 문피아</title></head></html>"#;
        assert_eq!(
            fixtures::title(&Munpia, html).as_deref(),
            Some("오파츠 - 수천 년은 이른 물건")
        );

        let html = r#"<h2 class="title">[독점] 개정판 | 화산귀환</h2>"#;
        assert_eq!(fixtures::title(&Munpia, html).as_deref(), Some("화산귀환"));
    }
}
