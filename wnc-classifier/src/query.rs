//! Query Strategy Builder
//!
//! Turns a parsed title into an ordered list of search queries. The caller
//! runs them in order and stops at the first one that yields evidence.

use crate::parser::ParsedTitle;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Generic keyword that disambiguates short titles on a web portal
const DISAMBIGUATOR: &str = "소설";

/// Short titles: one word, or at most this many non-space characters
const SHORT_TITLE_CHARS: usize = 6;

/// Spacing variants are only tried for titles at least this long
const SPACING_MIN_CHARS: usize = 5;

/// Words a ` - 이름` suffix must not be
const NOT_AUTHOR_WORDS: &[&str] = &["외전", "전기", "서", "편", "기", "록", "상권", "하권", "중권"];

/// Parenthesized words that are metadata, never subtitles
const METADATA_WORDS: &[&str] = &[
    "완결", "완", "단행본", "연재중", "개정판", "합본", "특별판", "19금", "15금", "19N", "19n",
];

static METADATA_PAREN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[(\[](?:RM|완결?|단행본|연재중|개정판|합본|특별판|19[금Nn]|15금)[)\]]\s*")
        .expect("valid regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static MULTI_AUTHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+[-/]\s+([가-힣]{2,5}(?:\s*[,&]\s*[가-힣]{2,5})+)\s*(?:\(완\))?$")
        .expect("valid regex")
});
static SINGLE_AUTHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+[-/]\s+([가-힣]{2,5})\s*(?:\(완\))?$").expect("valid regex")
});
static AUTHOR_JOIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([,&])\s*").expect("valid regex"));
static PART_SUBTITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+(\d+부)\s+(.+)$").expect("valid regex"));
static ATTACHED_PAREN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣a-zA-Z0-9]+)\(([가-힣a-zA-Z0-9\s]+)\)\s*$").expect("valid regex")
});
static SPACED_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\(([가-힣a-zA-Z0-9\s]+)\)\s*$").expect("valid regex"));
static EPISODE_RES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\s+\d+[-~]\d+\s*화").expect("valid regex"),
        Regex::new(r"\s+\d+[-~]\d+\s*\(완\)").expect("valid regex"),
        Regex::new(r"\s+\d+화(?:\s|$)").expect("valid regex"),
    ]
});
static HANGUL_LATIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([가-힣])([A-Za-z])").expect("valid regex"));
static LATIN_HANGUL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])([가-힣])").expect("valid regex"));
static DIGIT_HANGUL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)([가-힣])").expect("valid regex"));
static HANGUL_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([가-힣])(\d)").expect("valid regex"));

/// One search query with its rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub text: String,
    /// Human-readable reason the query exists
    pub description: String,
    /// Strictly increasing along the list
    pub priority: u8,
}

/// Title fields relevant to searching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TitleInfo {
    pub main_title: String,
    pub subtitle: Option<String>,
    /// One author, or several joined by `, `
    pub author: Option<String>,
}

impl TitleInfo {
    /// Split author, subtitle and episode noise off a title
    pub fn parse(title: &str) -> Self {
        let mut title = title.to_string();
        let mut author = None;

        // 1. Author suffix
        if let Some(caps) = MULTI_AUTHOR_RE.captures(&title) {
            let names = AUTHOR_JOIN_RE.replace_all(&caps[1], "$1 ").trim().to_string();
            let start = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
            author = Some(names);
            title = title[..start].trim().to_string();
        } else if let Some(caps) = SINGLE_AUTHOR_RE.captures(&title) {
            let name = caps[1].to_string();
            if !NOT_AUTHOR_WORDS.contains(&name.as_str()) {
                let start = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
                author = Some(name);
                title = title[..start].trim().to_string();
            }
        }

        // 2. Subtitle
        let mut subtitle = None;
        if let Some(caps) = PART_SUBTITLE_RE.captures(&title) {
            subtitle = Some(format!("{} {}", &caps[2], caps[3].trim()));
            title = caps[1].trim().to_string();
        } else if let Some(caps) = ATTACHED_PAREN_RE.captures(&title) {
            let inner = caps[2].trim().to_string();
            if !METADATA_WORDS.contains(&inner.as_str()) {
                let whole = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
                title = format!("{}{}", &title[..whole], &caps[1]);
                subtitle = Some(inner);
            }
        } else if let Some(m) = SPACED_PAREN_RE.find(&title) {
            // Spaced groups are side information, dropped either way
            title = title[..m.start()].trim().to_string();
        }

        // 3. Episode ranges
        for re in EPISODE_RES.iter() {
            title = re.replace_all(&title, " ").into_owned();
        }

        // 4. Metadata parentheses, whitespace
        let title = METADATA_PAREN_RE.replace_all(&title, " ");
        let main_title = WHITESPACE_RE.replace_all(&title, " ").trim().to_string();

        Self {
            main_title,
            subtitle,
            author,
        }
    }
}

/// Query plan for one work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub info: TitleInfo,
    pub queries: Vec<SearchQuery>,
}

impl QueryPlan {
    /// Title to confirm identity against on source pages
    pub fn match_title(&self) -> &str {
        &self.info.main_title
    }

    pub fn author(&self) -> Option<&str> {
        self.info.author.as_deref()
    }
}

/// Clean a title before query building
///
/// Drops metadata parentheses, turns `ㆍ`, `·` and `~` into spaces and
/// collapses whitespace.
pub fn normalize_query_title(title: &str) -> String {
    let title = METADATA_PAREN_RE.replace_all(title, " ");
    let title = title.replace(['ㆍ', '·', '~'], " ");
    WHITESPACE_RE.replace_all(&title, " ").trim().to_string()
}

/// One word, or at most six characters ignoring spaces
pub fn is_short_title(title: &str) -> bool {
    let words = title.split_whitespace().count();
    let chars = title.chars().filter(|c| !c.is_whitespace()).count();
    words == 1 || chars <= SHORT_TITLE_CHARS
}

/// Insert spaces at Hangul↔Latin and Hangul↔digit boundaries
///
/// Titles that already contain a space, or are shorter than five
/// characters, come back unchanged.
pub fn add_spacing(title: &str) -> String {
    if title.contains(' ') || title.chars().count() < SPACING_MIN_CHARS {
        return title.to_string();
    }
    let spaced = HANGUL_LATIN_RE.replace_all(title, "$1 $2");
    let spaced = LATIN_HANGUL_RE.replace_all(&spaced, "$1 $2");
    let spaced = DIGIT_HANGUL_RE.replace_all(&spaced, "$1 $2");
    HANGUL_DIGIT_RE.replace_all(&spaced, "$1 $2").into_owned()
}

/// Build the ordered query list for a parsed title
pub fn build_queries(parsed: &ParsedTitle) -> QueryPlan {
    let mut info = TitleInfo::parse(&normalize_query_title(&parsed.title));
    if info.main_title.is_empty() {
        info.main_title = parsed.title.trim().to_string();
    }
    if let Some(author) = parsed.author.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        info.author = Some(author.to_string());
    }

    let title = info.main_title.clone();
    let is_short = is_short_title(&title);
    let decorated = format!("{} {}", DISAMBIGUATOR, title);
    let mut candidates: Vec<(String, String)> = Vec::new();

    if let Some(author) = &info.author {
        candidates.push((format!("{} {}", title, author), "title + author".to_string()));
    }

    if is_short && info.author.is_none() {
        candidates.push((decorated.clone(), "short title, decorated".to_string()));
        candidates.push((title.clone(), "short title, plain".to_string()));
    } else if is_short {
        candidates.push((title.clone(), "short title, plain".to_string()));
        candidates.push((decorated.clone(), "short title, decorated".to_string()));
    } else {
        candidates.push((title.clone(), "long title, plain".to_string()));
        candidates.push((decorated.clone(), "long title, decorated".to_string()));
    }

    if let Some(subtitle) = &info.subtitle {
        candidates.push((subtitle.clone(), "subtitle".to_string()));
        if let Some(author) = &info.author {
            candidates.push((format!("{} {}", subtitle, author), "subtitle + author".to_string()));
        }
    }

    let spaced = add_spacing(&title);
    if spaced != title {
        if let Some(author) = &info.author {
            candidates.push((format!("{} {}", spaced, author), "spacing variant + author".to_string()));
        }
        candidates.push((spaced, "spacing variant".to_string()));
    }

    let queries = candidates
        .into_iter()
        .filter(|(text, _)| !text.trim().is_empty())
        .enumerate()
        .map(|(i, (text, description))| SearchQuery {
            text,
            description,
            priority: (i + 1) as u8,
        })
        .collect();

    QueryPlan { info, queries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(title: &str, author: Option<&str>) -> ParsedTitle {
        ParsedTitle {
            title: title.to_string(),
            author: author.map(str::to_string),
            ..Default::default()
        }
    }

    fn texts(plan: &QueryPlan) -> Vec<&str> {
        plan.queries.iter().map(|q| q.text.as_str()).collect()
    }

    #[test]
    fn test_long_title_without_author() {
        let plan = build_queries(&parsed("나 혼자 소드 마스터", None));
        assert_eq!(texts(&plan), vec!["나 혼자 소드 마스터", "소설 나 혼자 소드 마스터"]);
    }

    #[test]
    fn test_short_title_decorated_first() {
        let plan = build_queries(&parsed("마왕", None));
        assert_eq!(texts(&plan), vec!["소설 마왕", "마왕"]);
    }

    #[test]
    fn test_author_query_first() {
        let plan = build_queries(&parsed("화산귀환", Some("비가")));
        assert_eq!(texts(&plan)[0], "화산귀환 비가");
        assert_eq!(texts(&plan)[1], "화산귀환");
        assert_eq!(plan.author(), Some("비가"));
    }

    #[test]
    fn test_priorities_strictly_increasing() {
        let plan = build_queries(&parsed("초능력 연대기 1부 더 맨이터 - 홍길동", None));
        assert_eq!(plan.info.main_title, "초능력 연대기");
        assert_eq!(plan.info.subtitle.as_deref(), Some("1부 더 맨이터"));
        assert_eq!(plan.info.author.as_deref(), Some("홍길동"));
        assert!(plan.queries.windows(2).all(|w| w[0].priority < w[1].priority));
        assert!(texts(&plan).contains(&"1부 더 맨이터 홍길동"));
    }

    #[test]
    fn test_attached_subtitle() {
        let info = TitleInfo::parse("초능력연대기(맨이터)");
        assert_eq!(info.main_title, "초능력연대기");
        assert_eq!(info.subtitle.as_deref(), Some("맨이터"));

        let info = TitleInfo::parse("초능력 연대기 (맨이터)");
        assert_eq!(info.main_title, "초능력 연대기");
        assert!(info.subtitle.is_none());
    }

    #[test]
    fn test_multi_author_and_excluded_word() {
        let info = TitleInfo::parse("군림천하 - 용대운,사마달");
        assert_eq!(info.author.as_deref(), Some("용대운, 사마달"));

        let info = TitleInfo::parse("검의 길 - 외전");
        assert!(info.author.is_none());
    }

    #[test]
    fn test_spacing_variant() {
        assert_eq!(add_spacing("던전SSS급헌터"), "던전 SSS 급헌터");
        assert_eq!(add_spacing("마왕 귀환"), "마왕 귀환");
        assert_eq!(add_spacing("마왕"), "마왕");

        let plan = build_queries(&parsed("회귀한100층주인", None));
        assert!(texts(&plan).contains(&"회귀한 100 층주인"));
    }

    #[test]
    fn test_normalize_query_title() {
        assert_eq!(normalize_query_title("검ㆍ마 (완결)  ~ 귀환"), "검 마 귀환");
        assert!(is_short_title("마왕은 싫어"));
        assert!(!is_short_title("나 혼자 소드 마스터"));
    }
}
