//! Fuzzy Title Matcher
//!
//! Confirms that a candidate page is about the queried work. Short titles
//! collide easily ("마왕" vs "마왕은 돌아왔다"), so they need an exact match
//! or an author confirmation; long titles tolerate platform boilerplate.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Korean postpositions, longest first
const POSTPOSITIONS: &[&str] = &[
    "으로", "에서", "에게", "한테", "부터", "까지", "은", "는", "이", "가", "을", "를", "의", "에", "와",
    "과", "로", "도", "만",
];

/// Two-character author-name tails too generic to identify anyone
const GENERIC_NAME_TAILS: &[&str] = &["작가", "선생", "님", "씨"];

/// Identity-confirmation thresholds
///
/// Tuned against real title collisions; keep them configurable rather than
/// hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    /// Minimum similarity for long titles
    pub similarity: f64,
    /// Minimum similarity when the author is confirmed on the page
    pub author_similarity: f64,
    /// Maximum length-difference ratio for containment matches
    pub max_length_ratio: f64,
    /// Maximum length-difference ratio for author-confirmed containment
    pub author_length_ratio: f64,
    /// Normalized length at or below which a title counts as short
    pub short_title_chars: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            similarity: 0.85,
            author_similarity: 0.75,
            max_length_ratio: 0.30,
            author_length_ratio: 0.50,
            short_title_chars: 6,
        }
    }
}

/// How a match was confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Titles differ by one postposition
    Postposition,
    /// Normalized forms are equal
    Exact,
    /// Short title contained in the page and the author appears there too
    ShortWithAuthor,
    /// Containment within the length-ratio bound
    Contains,
    /// Containment within the relaxed bound, author confirmed
    PartialWithAuthor,
    /// Edit-distance similarity above threshold
    Similar,
}

/// Title identity matcher
#[derive(Debug, Clone, Default)]
pub struct TitleMatcher {
    thresholds: MatchThresholds,
}

impl TitleMatcher {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Whether `candidate` (a page title) names the queried work
    pub fn is_match(&self, query: &str, candidate: &str, author: Option<&str>) -> bool {
        self.match_title(query, candidate, author).is_some()
    }

    /// Match with the kind of evidence that confirmed it
    pub fn match_title(&self, query: &str, candidate: &str, author: Option<&str>) -> Option<MatchKind> {
        let author = author.map(str::trim).filter(|a| !a.is_empty());

        if differs_by_postposition(query, candidate) {
            return Some(MatchKind::Postposition);
        }

        let norm_query = normalize_title(query);
        let norm_page = normalize_title(candidate);
        if norm_query.is_empty() || norm_page.is_empty() {
            return None;
        }
        if norm_query == norm_page {
            return Some(MatchKind::Exact);
        }

        let author_confirmed = author.map(|a| author_in_text(a, &norm_page)).unwrap_or(false);
        let query_len = norm_query.chars().count();

        if query_len <= self.thresholds.short_title_chars {
            if author_confirmed && norm_page.contains(&norm_query) {
                return Some(MatchKind::ShortWithAuthor);
            }
            return None;
        }

        let ratio = length_diff_ratio(&norm_query, &norm_page);
        if norm_page.contains(&norm_query) || norm_query.contains(&norm_page) {
            if ratio <= self.thresholds.max_length_ratio {
                return Some(MatchKind::Contains);
            }
            if author_confirmed
                && norm_page.contains(&norm_query)
                && ratio <= self.thresholds.author_length_ratio
            {
                return Some(MatchKind::PartialWithAuthor);
            }
        }

        let threshold = if author_confirmed {
            self.thresholds.author_similarity
        } else {
            self.thresholds.similarity
        };
        if strsim::normalized_levenshtein(&norm_query, &norm_page) >= threshold {
            return Some(MatchKind::Similar);
        }

        None
    }
}

/// Similarity of two titles on their normalized forms (1.0 = identical)
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize_title(a), normalize_title(b));
    if a.is_empty() || b.is_empty() {
        return if a == b && !a.is_empty() { 1.0 } else { 0.0 };
    }
    strsim::normalized_levenshtein(&a, &b)
}

fn length_diff_ratio(a: &str, b: &str) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    la.abs_diff(lb) as f64 / la.max(lb).max(1) as f64
}

// ============================================================================
// Postposition tolerance
// ============================================================================

static PAGE_SUFFIX_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\s*[-:]\s*(?:판타지|로맨스|무협|BL|GL).*$",
        r"(?i)\s*[-:]\s*(?:웹소설|e북|전자책|소설).*$",
        r"(?i)\s*[-:]\s*(?:리디|조아라|문피아|노벨피아|카카오페이지|네이버).*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

fn is_syllable(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

/// Titles equal once a single postposition is removed from the longer one
fn differs_by_postposition(a: &str, b: &str) -> bool {
    let strip = |text: &str| -> String {
        let mut cleaned = text.to_string();
        for re in PAGE_SUFFIX_RES.iter() {
            cleaned = re.replace(&cleaned, "").into_owned();
        }
        cleaned.split_whitespace().collect()
    };
    let (a, b) = (strip(a), strip(b));
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let (la, lb) = (a.chars().count(), b.chars().count());
    let diff = la.abs_diff(lb);
    if diff == 0 {
        return a == b;
    }
    if diff > 2 {
        return false;
    }

    let (longer, shorter) = if la > lb { (&a, &b) } else { (&b, &a) };

    POSTPOSITIONS.iter().any(|josa| {
        let Some(pos) = longer.find(josa) else {
            return false;
        };
        if longer.replacen(josa, "", 1) != *shorter {
            return false;
        }
        let before = longer[..pos].chars().last();
        let after = longer[pos + josa.len()..].chars().next();
        matches!(before, Some(c) if is_syllable(c)) && after.map(is_syllable).unwrap_or(true)
    })
}

// ============================================================================
// Normalization
// ============================================================================

/// Ordered (pattern, replacement) rewrite rules
static NORMALIZE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    const EDITION: &str = "단행본|완결|연재중|개정판|합본|개정|특별판|19N|19금|15금";
    let rules: Vec<(String, &'static str)> = vec![
        // search keyword added by the query builder
        (r"^소설\s+".into(), ""),
        // author suffix
        (r"\s+[-/|]\s+[가-힣]{2,5}(?:,[가-힣]{2,5})*\s*$".into(), ""),
        // volume markers
        (r"\s+제?\d+권\s*$".into(), ""),
        (r"\s+\d+\s*$".into(), ""),
        (r"\s+\(?\s*[상중하]\s*\)?\s*$".into(), ""),
        (r"\s+\[?\s*\d+\s*\]?\s*$".into(), ""),
        (r"\s+\(?\s*\d+\s*\)?\s*$".into(), ""),
        (r"\s+[상중하]/[상중하]\s*$".into(), ""),
        (r"([가-힣])제?\d+권$".into(), "${1}"),
        (r"([가-힣])\d+$".into(), "${1}"),
        (r"([가-힣])\(?\s*[상중하]\s*\)?$".into(), "${1}"),
        (r"([가-힣])\[?\s*\d+\s*\]?$".into(), "${1}"),
        // platform boilerplate
        (r"\s*[-:]\s*조아라\s*:.*$".into(), ""),
        (r"\s*[-:]\s*네이버(?:\s*시리즈)?.*$".into(), ""),
        (r"\s*[-:]\s*(?:문피아|노벨피아|카카오페이지|리디북스).*$".into(), ""),
        // edition and rating tags at either end
        (format!(r"(?i)^\s*[\[(](?:{})[\])]\s*", EDITION), ""),
        (format!(r"(?i)\s*[\[(](?:{}|완|19|15)[\])]\s*$", EDITION), ""),
        // edition words anywhere
        (r"\s*[\(\[]?\s*(?:외전|증보판|개정판|합본|특별판|완전판|무삭제판|리마스터판)\s*[\)\]]?\s*".into(), " "),
        (r"(?i)\s*-\s*(?:BL|GL)\s*(?:소설|웹소설|e북|전자책)?\s*".into(), " "),
        (r"(?i)\s*(?:BL|GL)\s*(?:소설|웹소설|e북|전자책)\s*".into(), " "),
        (r"\s*(?:e북|웹소설|전자책)\s*".into(), " "),
        // leading bracket label
        (r"^\s*\[[^\]]+\]\s*".into(), ""),
        // parenthesised hanja or romanization
        (r"[(\[{【][^)\]}】]+[)\]}】]".into(), ""),
        (r"\s*\([^)]+\)\s*$".into(), ""),
        // version marks
        (r"(?i)\b(ver|v)\s+(\d+(?:\.\d+)?)".into(), "${1}${2}"),
    ];
    rules
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(&pattern).expect("valid regex"), replacement))
        .collect()
});

/// Trailing Latin words after Hangul (`유그드라실 unlimited`)
static TRAILING_LATIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣])\s+([a-zA-Z]+(?:\s+[a-zA-Z]+)*)(\s|[-:;,.]|$)").expect("valid regex")
});

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").expect("valid regex"));

fn fold_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '【' => '[',
            '】' => ']',
            'ː' => ':',
            '˙' => '.',
            '‧' => '·',
            // full-width ASCII block
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

/// Normalize a title for identity comparison
///
/// Folds width variants, drops platform boilerplate, author/volume/edition
/// noise and punctuation, removes whitespace and lower-cases.
pub fn normalize_title(text: &str) -> String {
    let mut text = fold_width(text.trim());

    for (re, replacement) in NORMALIZE_RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }

    text = TRAILING_LATIN_RE
        .replace_all(&text, |caps: &Captures<'_>| {
            let words = &caps[2];
            let is_version = words.starts_with("Ver") || words.starts_with("ver") || words == "V";
            if is_version {
                caps[0].to_string()
            } else {
                format!("{} ", &caps[1])
            }
        })
        .into_owned();

    NON_WORD_RE.replace_all(&text, "").to_lowercase()
}

// ============================================================================
// Author variants
// ============================================================================

/// Name variants used to find an author in page text
///
/// Pen names often carry a prefix ("요도김남재"), so the trailing three and
/// two characters are tried as well.
pub fn author_variants(author: &str) -> Vec<String> {
    let clean: String = author.split_whitespace().collect();
    let chars: Vec<char> = clean.chars().collect();
    let len = chars.len();
    let tail = |n: usize| chars[len - n..].iter().collect::<String>();

    let mut variants = Vec::new();
    if clean.is_empty() {
        return variants;
    }
    variants.push(clean.clone());

    if len >= 4 {
        variants.push(tail(3));
        let last_two = tail(2);
        if !GENERIC_NAME_TAILS.contains(&last_two.as_str()) {
            variants.push(last_two);
        }
    } else if len == 3 {
        variants.push(tail(2));
    }
    variants
}

/// Whether any variant of any listed author appears in `text`
pub fn author_in_text(authors: &str, text: &str) -> bool {
    let haystack = text.to_lowercase();
    authors
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .flat_map(author_variants)
        .any(|variant| haystack.contains(&variant.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_identity() {
        assert_eq!(similarity("전지적 독자 시점", "전지적 독자 시점"), 1.0);
        assert_eq!(similarity("", "전지적"), 0.0);
    }

    #[test]
    fn test_postposition_difference_matches() {
        let matcher = TitleMatcher::default();
        assert_eq!(
            matcher.match_title("신세계의 사령술사", "신세계 사령술사", None),
            Some(MatchKind::Postposition)
        );
        assert!(matcher.is_match("신세계의 사령술사", "신세계 사령술사 - 판타지 웹소설 - 리디", None));
    }

    #[test]
    fn test_short_title_requires_exact() {
        let matcher = TitleMatcher::default();
        assert!(!matcher.is_match("마왕", "마왕은 돌아왔다", None));
        assert!(matcher.is_match("마왕", "마왕 - 문피아", None));
    }

    #[test]
    fn test_short_title_with_author() {
        let matcher = TitleMatcher::default();
        assert_eq!(
            matcher.match_title("대제국", "대제국 조선 김정률", Some("김정률")),
            Some(MatchKind::ShortWithAuthor)
        );
        assert!(!matcher.is_match("대제국", "대제국 조선", Some("김정률")));
    }

    #[test]
    fn test_long_title_length_ratio_guard() {
        let matcher = TitleMatcher::default();
        assert!(matcher.is_match("전지적 독자 시점", "전지적 독자 시점 1권", None));
        assert!(!matcher.is_match("마왕은 싫어요", "사냥꾼은마왕은싫어요라고말했다", None));
    }

    #[test]
    fn test_normalize_strips_boilerplate() {
        assert_eq!(normalize_title("［무협］ 화산귀환 - 문피아"), "화산귀환");
        assert_eq!(normalize_title("용마(龍馬) 성주록(城主錄)"), "용마성주록");
        assert_eq!(normalize_title("마법교육기관 유그드라실 unlimited"), "마법교육기관유그드라실");
        assert_eq!(normalize_title("소설 달빛조각사 12권"), "달빛조각사");
    }

    #[test]
    fn test_author_variants() {
        assert_eq!(author_variants("요도 김남재"), vec!["요도김남재", "김남재", "남재"]);
        assert_eq!(author_variants("싱숑"), vec!["싱숑"]);
        assert_eq!(author_variants("비가"), vec!["비가"]);
        assert_eq!(author_variants("산경"), vec!["산경"]);
        assert_eq!(author_variants("박촌장"), vec!["박촌장", "촌장"]);
        assert!(author_in_text("싱숑, 슬리피-C", "전지적독자시점싱숑"));
    }
}
