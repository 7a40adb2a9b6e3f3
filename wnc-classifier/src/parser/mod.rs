//! Title Anchor Parser
//!
//! Turns a raw archive filename into a [`ParsedTitle`].
//!
//! # Strategy
//! The title is located first ("title anchor") and only the remainder of the
//! string is searched for range, volume, completion and side-story markers.
//! Numbers that are part of the title itself ("100층의 올마스터") therefore
//! never leak into the range fields.
//!
//! # Pipeline
//! 1. Split a short alphanumeric file extension
//! 2. Recompose obfuscated jamo
//! 3. Detect a `제목 - 작가` suffix, strip noise tokens, keep the genre tag
//! 4. Anchor the title (earliest-match among candidate patterns)
//! 5. Parse the residual string (see [`residual`])

mod jamo;
mod residual;

pub use jamo::compose_jamo;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Structured record extracted from a raw filename
///
/// `title` is never empty for non-empty input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    /// Work title (the anchor)
    pub title: String,
    /// Author name, when the filename carried one
    pub author: Option<String>,
    /// Part information, e.g. `2부` or `1-2부`
    pub volume_info: Option<String>,
    /// Episode range, normalized `start-end` with start ≤ end
    pub range_info: Option<String>,
    /// Completion marker present
    pub is_completed: bool,
    /// Side-story entries in canonical form, e.g. `["외전 1-79", "에필"]`
    pub side_story: Vec<String>,
    /// File extension including the dot
    pub file_extension: Option<String>,
    /// Plain text of a bracketed genre tag found in the filename
    pub embedded_genre_tag: Option<String>,
}

impl ParsedTitle {
    /// Degraded record: the raw input as title, every other field empty
    pub fn fallback(raw: &str) -> Self {
        Self {
            title: raw.to_string(),
            ..Default::default()
        }
    }

    /// Standardized display name
    ///
    /// Format: `[장르] 제목 부정보 범위 (완) + 외전.확장자`
    pub fn display_name(&self, genre: Option<&str>) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(genre) = genre.filter(|g| !g.is_empty()) {
            parts.push(format!("[{}]", genre));
        }
        parts.push(self.title.clone());
        if let Some(volume) = &self.volume_info {
            parts.push(volume.clone());
        }
        if let Some(range) = &self.range_info {
            parts.push(range.clone());
        }
        if self.is_completed {
            parts.push("(완)".to_string());
        }
        if !self.side_story.is_empty() {
            parts.push(format!("+ {}", self.side_story.join(", ")));
        }

        let mut name = parts.join(" ");
        if let Some(ext) = &self.file_extension {
            name.push_str(ext);
        }
        name
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// `제목 - 작가` at the end of the name
static AUTHOR_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[-–—]\s+([^-–—]+)$").expect("valid regex"));

/// Author, site and translator markers
static NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"@\S+|ⓒ\S+|©\S+",
        r"|(?:저자|작가|글)\s*:\s*\S+",
        r"|\s+(?i:by)\s+\S+\s*$",
        r"|(?:www\.)?[A-Za-z0-9-]+\.(?:com|net|co\.kr|kr|cafe)\b",
        r"|네이버\s*카페|다음\s*카페",
        r"|(?:번역|역자)\s*:\s*\S+",
        r"|[\[(]\s*(?i:ai)?번역\s*[\])]",
    ))
    .expect("valid regex")
});

/// Bracketed genre and edition tags
static GENRE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[\[(]\s*(",
        r"현대판타지|퓨전판타지|게임판타지|로맨스판타지|정통판타지|대체역사",
        r"|판타지|무협|현판|퓨판|로판|겜판|SF|역사|선협|언정|공포|스포츠|소설|로맨스",
        r"|단행본|연재중|개정판|합본|특별판|미분류",
        r")\s*[\])]",
    ))
    .expect("valid regex")
});

/// Tags that are stripped but never kept as a genre
const NON_GENRE_TAGS: &[&str] = &["단행본", "연재중", "개정판", "합본", "특별판", "미분류"];

static ADULT_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[(]\s*(?i:19N|19금|15금|성인)\s*[\])]").expect("valid regex"));

static PLATFORM_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*(?:임아소|네이버시리즈|카카오페이지|문피아|조아라|리디북스|노벨피아)\s*\]")
        .expect("valid regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Number glued to a preceding syllable: `종족초월1-345完`
static GLUED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"([가-힣])(",
        r"\d+\s*[-~]\s*\d+",
        r"|\d+\s*完",
        r"|\d+\s*완결?(?:\s|$|[\(\[+,.])",
        r"|\d+\s*[화권부편회장](?:\s|$|[\(\[+,])",
        r")",
    ))
    .expect("valid regex")
});

/// `+ 외전` style suffix, split off before anchoring
static PLUS_SIDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\+\s*(?:외전|에필|번외|특별편|番外|外)").expect("valid regex"));

static UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\d+\s*[화권부편회장](?:\s|$)").expect("valid regex"));

static RANGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\d+\s*[-~]\s*\d+").expect("valid regex"));

static SINGLE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+\d+\s*(?:完|완결?|[\(\[]\s*(?:완결?|完)\s*[\)\]]|$)").expect("valid regex")
});

static PAREN_COMPLETION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.?\s*[\(\[]\s*(?:완결?|完)\s*[\)\]]").expect("valid regex"));

/// Completion markers in any form
pub(crate) static COMPLETION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[\(\[]\s*(?:완결?|完|(?i:complete|end|fin))\s*[\)\]]",
        r"|(?:^|\s)完(?:\s|$|\+)",
        r"|본편\s*및\s*외전\s*完",
        r"|본편\s*완결",
    ))
    .expect("valid regex")
});

// ============================================================================
// Naming convention lexicon
// ============================================================================

/// Characteristic title endings of translated classical-style works
const CLASSICAL_ENDINGS: &[&str] = &[
    "지", "록", "담", "기담", "전기", "열전", "비록", "야사", "연의", "지전", "기전", "행기", "유기",
    "몽기", "환기", "선기",
];

/// Native words that share those endings
const NATIVE_HOMOGRAPHS: &[&str] = &["역전기", "전기", "일기", "세기", "용기", "인기", "무도"];

/// (detector, extractor) per ending
static CLASSICAL_RES: Lazy<Vec<(Regex, Regex)>> = Lazy::new(|| {
    CLASSICAL_ENDINGS
        .iter()
        .map(|ending| {
            (
                Regex::new(&format!(r"^[가-힣]+{}(?:\s+\d|\s*$)", ending)).expect("valid regex"),
                Regex::new(&format!(r"^([가-힣\s]+{})(\s+.*)$", ending)).expect("valid regex"),
            )
        })
        .collect()
});

static SIDE_STORY_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+\s*(?:외전|에필|번외|특별편)").expect("valid regex"));

/// Words that close a title rather than name an author
const AUTHOR_EXCLUSIONS: &[&str] = &["외전", "전기", "서", "편", "기", "록", "상권", "하권", "중권"];

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2,}").expect("valid regex"));

// ============================================================================
// Public API
// ============================================================================

/// Parse a raw filename
///
/// Never fails: on an internal fault the raw input is returned as the title
/// with every other field empty.
pub fn parse(raw: &str) -> ParsedTitle {
    match std::panic::catch_unwind(|| parse_inner(raw)) {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(raw = %raw, "Title parse failed, using raw name");
            ParsedTitle::fallback(raw)
        }
    }
}

fn parse_inner(raw: &str) -> ParsedTitle {
    let (name, extension) = split_extension(raw);
    let file_extension = extension.map(str::to_string);

    if name.trim().is_empty() {
        let title = if raw.trim().is_empty() { raw } else { raw.trim() };
        return ParsedTitle {
            title: title.to_string(),
            file_extension,
            ..Default::default()
        };
    }

    let composed = compose_jamo(name);
    let (mut author, without_author) = split_author_suffix(&composed);
    let (cleaned, embedded_genre_tag) = strip_noise(&without_author);
    let separated = separate_glued_numbers(&cleaned);

    let (anchored_title, residual_text) = extract_title_anchor(&separated);
    let fields = residual::parse_residual(&residual_text);

    let mut title = anchored_title;
    if author.is_none() {
        author = fields.author.clone();
    }
    if author.is_none() {
        if let Some((name, rest)) = split_title_tail_author(&title) {
            author = Some(name);
            title = rest;
        }
    }

    // Fallback order: anchored title, cleaned name, raw input
    let title = [title.trim(), cleaned.trim(), name.trim(), raw.trim()]
        .into_iter()
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string());

    let parsed = ParsedTitle {
        title,
        author,
        volume_info: fields.volume_info,
        range_info: fields.range_info,
        is_completed: fields.is_completed,
        side_story: fields.side_story,
        file_extension,
        embedded_genre_tag,
    };

    debug!(
        raw = %raw,
        title = %parsed.title,
        range = ?parsed.range_info,
        completed = parsed.is_completed,
        "Parsed title"
    );
    parsed
}

/// Split a trailing file extension
///
/// The extension is at most 10 characters after the dot, ASCII alphanumeric
/// and contains at least one letter, so `제목 1.5` keeps its number. A name
/// consisting only of an extension (`.txt`) yields an empty name.
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    if filename.is_empty() {
        return ("", None);
    }
    if filename.starts_with('.') && !filename[1..].contains('.') {
        return ("", Some(filename));
    }

    if let Some(dot) = filename.rfind('.') {
        let ext = &filename[dot..];
        let bare = &ext[1..];
        let valid = dot > 0
            && !bare.is_empty()
            && ext.len() <= 11
            && bare.chars().all(|c| c.is_ascii_alphanumeric())
            && bare.chars().any(|c| c.is_ascii_alphabetic());
        if valid {
            return (&filename[..dot], Some(ext));
        }
    }

    (filename, None)
}

// ============================================================================
// Noise removal
// ============================================================================

fn is_plausible_author(candidate: &str) -> bool {
    let len = candidate.chars().count();
    (2..20).contains(&len)
        && !DIGIT_RUN_RE.is_match(candidate)
        && !AUTHOR_EXCLUSIONS.contains(&candidate)
}

/// Detach a trailing `- 작가` from the full name
fn split_author_suffix(name: &str) -> (Option<String>, String) {
    if let Some(caps) = AUTHOR_SEPARATOR_RE.captures(name) {
        if let (Some(whole), Some(candidate)) = (caps.get(0), caps.get(1)) {
            let candidate = candidate.as_str().trim();
            if is_plausible_author(candidate) {
                return (Some(candidate.to_string()), name[..whole.start()].trim().to_string());
            }
        }
    }
    (None, name.to_string())
}

/// Title ending in `- 작가` after anchoring (`제목 - 작가 1-100`)
fn split_title_tail_author(title: &str) -> Option<(String, String)> {
    let caps = AUTHOR_SEPARATOR_RE.captures(title)?;
    let whole = caps.get(0)?;
    let candidate = caps.get(1)?.as_str().trim();
    if !is_plausible_author(candidate) {
        return None;
    }
    let rest = title[..whole.start()].trim();
    if rest.is_empty() {
        return None;
    }
    Some((candidate.to_string(), rest.to_string()))
}

/// Strip noise tokens and tags, returning the first genre tag found
fn strip_noise(name: &str) -> (String, Option<String>) {
    let mut cleaned = NOISE_RE.replace_all(name, " ").into_owned();

    let embedded_genre_tag = GENRE_TAG_RE
        .captures_iter(&cleaned)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .find(|tag| !NON_GENRE_TAGS.contains(&tag.as_str()));

    cleaned = GENRE_TAG_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = ADULT_TAG_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = PLATFORM_TAG_RE.replace_all(&cleaned, " ").into_owned();

    let collapsed = WHITESPACE_RE.replace_all(cleaned.trim(), " ").into_owned();
    (collapsed, embedded_genre_tag)
}

fn separate_glued_numbers(name: &str) -> String {
    GLUED_NUMBER_RE.replace_all(name, "${1} ${2}").into_owned()
}

// ============================================================================
// Title anchoring
// ============================================================================

/// Candidate anchor kinds, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AnchorKind {
    Unit,
    Range,
    SingleNumber,
    ParenCompletion,
    Completion,
}

impl AnchorKind {
    fn pattern(&self) -> &'static Regex {
        match self {
            AnchorKind::Unit => &UNIT_RE,
            AnchorKind::Range => &RANGE_RE,
            AnchorKind::SingleNumber => &SINGLE_NUMBER_RE,
            AnchorKind::ParenCompletion => &PAREN_COMPLETION_RE,
            AnchorKind::Completion => &COMPLETION_RE,
        }
    }
}

const ANCHOR_KINDS: [AnchorKind; 5] = [
    AnchorKind::Unit,
    AnchorKind::Range,
    AnchorKind::SingleNumber,
    AnchorKind::ParenCompletion,
    AnchorKind::Completion,
];

/// Split `name` into (title, residual)
fn extract_title_anchor(name: &str) -> (String, String) {
    if name.is_empty() {
        return (String::new(), String::new());
    }

    if is_classical_title(name) {
        if let Some(split) = extract_classical_title(name) {
            return split;
        }
    }

    // Side-story suffix first so a trailing number before it still anchors
    if let Some(m) = PLUS_SIDE_RE.find(name) {
        let main = name[..m.start()].trim();
        if !main.is_empty() {
            let side = name[m.start()..].trim();
            let (title, residual) = anchor_main(main);
            return (title, format!("{} {}", residual, side).trim().to_string());
        }
    }

    anchor_main(name)
}

/// Earliest-match anchoring over the candidate patterns
fn anchor_main(name: &str) -> (String, String) {
    let earliest = ANCHOR_KINDS
        .iter()
        .filter_map(|kind| first_anchor(kind.pattern(), name).map(|start| (start, *kind)))
        .min();

    match earliest {
        Some((start, kind)) => {
            let mut title = name[..start].trim();
            if kind == AnchorKind::ParenCompletion {
                title = title.trim_end_matches('.').trim_end();
            }
            (title.to_string(), name[start..].trim().to_string())
        }
        None => (name.trim().to_string(), String::new()),
    }
}

/// First match that leaves a non-empty title before it
fn first_anchor(pattern: &Regex, name: &str) -> Option<usize> {
    pattern
        .find_iter(name)
        .map(|m| m.start())
        .find(|&start| !name[..start].trim().trim_end_matches('.').trim().is_empty())
}

fn is_classical_title(name: &str) -> bool {
    if SIDE_STORY_HINT_RE.is_match(name) {
        return false;
    }
    if NATIVE_HOMOGRAPHS.iter().any(|word| name.contains(word)) {
        return false;
    }
    CLASSICAL_RES.iter().any(|(detector, _)| detector.is_match(name))
}

fn extract_classical_title(name: &str) -> Option<(String, String)> {
    CLASSICAL_RES.iter().find_map(|(_, extractor)| {
        let caps = extractor.captures(name)?;
        let title = caps.get(1)?.as_str().trim().to_string();
        let residual = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
        Some((title, residual))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Extension handling
    // ========================================================================

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("제목 1-100.txt"), ("제목 1-100", Some(".txt")));
        assert_eq!(split_extension(".txt"), ("", Some(".txt")));
        assert_eq!(split_extension("제목 1.5"), ("제목 1.5", None));
        assert_eq!(split_extension("제목. (완)"), ("제목. (완)", None));
        assert_eq!(split_extension("제목"), ("제목", None));
    }

    // ========================================================================
    // Anchoring
    // ========================================================================

    #[test]
    fn test_range_with_side_stories() {
        let parsed = parse("나 혼자 소드 마스터 1-1031 (완) + 외전 1-79, 에필.txt");

        assert_eq!(parsed.title, "나 혼자 소드 마스터");
        assert_eq!(parsed.range_info.as_deref(), Some("1-1031"));
        assert!(parsed.is_completed);
        assert_eq!(parsed.side_story, vec!["외전 1-79".to_string(), "에필".to_string()]);
        assert_eq!(parsed.file_extension.as_deref(), Some(".txt"));
    }

    #[test]
    fn test_single_number_promoted_to_range() {
        let parsed = parse("100층의 올마스터 120 .txt");

        assert_eq!(parsed.title, "100층의 올마스터");
        assert_eq!(parsed.range_info.as_deref(), Some("1-120"));
        assert!(!parsed.is_completed);
    }

    #[test]
    fn test_unit_marker_beats_later_range() {
        let parsed = parse("전지적 독자 시점 2부 1-100");
        assert_eq!(parsed.title, "전지적 독자 시점");
        assert_eq!(parsed.volume_info.as_deref(), Some("2부"));
        assert_eq!(parsed.range_info.as_deref(), Some("1-100"));
    }

    #[test]
    fn test_paren_completion_strips_period() {
        let parsed = parse("달빛조각사. (완)");
        assert_eq!(parsed.title, "달빛조각사");
        assert!(parsed.is_completed);
    }

    #[test]
    fn test_glued_number_separated() {
        let parsed = parse("종족초월1-345完.txt");
        assert_eq!(parsed.title, "종족초월");
        assert_eq!(parsed.range_info.as_deref(), Some("1-345"));
        assert!(parsed.is_completed);
    }

    #[test]
    fn test_title_without_metadata() {
        let parsed = parse("화산귀환");
        assert_eq!(parsed.title, "화산귀환");
        assert!(parsed.range_info.is_none());
        assert!(parsed.side_story.is_empty());
    }

    #[test]
    fn test_classical_naming_path() {
        let parsed = parse("천룡기담 1-50 완");
        assert_eq!(parsed.title, "천룡기담");
        assert_eq!(parsed.range_info.as_deref(), Some("1-50"));
        assert!(parsed.is_completed);
    }

    // ========================================================================
    // Noise, tags, authors
    // ========================================================================

    #[test]
    fn test_genre_tag_retained_and_stripped() {
        let parsed = parse("[무협] 화산귀환 1-1500 (완)");
        assert_eq!(parsed.title, "화산귀환");
        assert_eq!(parsed.embedded_genre_tag.as_deref(), Some("무협"));
    }

    #[test]
    fn test_edition_tag_not_a_genre() {
        let parsed = parse("[단행본] 화산귀환 1-10");
        assert_eq!(parsed.title, "화산귀환");
        assert!(parsed.embedded_genre_tag.is_none());
    }

    #[test]
    fn test_adult_and_platform_tags_removed() {
        let parsed = parse("[문피아] 회귀자 (19금) 1-200");
        assert_eq!(parsed.title, "회귀자");
        assert_eq!(parsed.range_info.as_deref(), Some("1-200"));
    }

    #[test]
    fn test_author_separator() {
        let parsed = parse("템빨 1-100 (완) - 박촌장.txt");
        assert_eq!(parsed.title, "템빨");
        assert_eq!(parsed.author.as_deref(), Some("박촌장"));
    }

    #[test]
    fn test_title_tail_author() {
        let parsed = parse("템빨 - 박촌장 1-100");
        assert_eq!(parsed.title, "템빨");
        assert_eq!(parsed.author.as_deref(), Some("박촌장"));
        assert_eq!(parsed.range_info.as_deref(), Some("1-100"));
    }

    #[test]
    fn test_author_exclusion_word_kept_in_title() {
        let parsed = parse("무림 - 외전");
        assert!(parsed.author.is_none());
    }

    #[test]
    fn test_jamo_obfuscation_recomposed() {
        let parsed = parse("ㄷH공ㅂlㄱr 되었다 1-50.txt");
        assert_eq!(parsed.title, "대공비가 되었다");
    }

    // ========================================================================
    // Degenerate input
    // ========================================================================

    #[test]
    fn test_title_never_empty_for_non_empty_input() {
        for raw in [".txt", "1-100", "(완)", "  ", "+ 외전", "完"] {
            let parsed = parse(raw);
            assert!(!parsed.title.is_empty(), "empty title for {:?}", raw);
        }
        assert_eq!(parse("").title, "");
    }

    #[test]
    fn test_display_name() {
        let parsed = parse("나 혼자 소드 마스터 1-1031 (완) + 외전 1-79, 에필.txt");
        assert_eq!(
            parsed.display_name(Some("판타지")),
            "[판타지] 나 혼자 소드 마스터 1-1031 (완) + 외전 1-79, 에필.txt"
        );
        assert_eq!(ParsedTitle::fallback("x").display_name(None), "x");
    }
}
