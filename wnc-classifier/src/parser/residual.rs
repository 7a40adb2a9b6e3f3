//! Residual string parsing
//!
//! Everything after the title anchor. Steps run in a fixed order and each
//! one removes what it consumed, so later steps never see earlier markers.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Metadata recovered from the residual
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResidualFields {
    pub author: Option<String>,
    pub volume_info: Option<String>,
    pub range_info: Option<String>,
    pub is_completed: bool,
    pub side_story: Vec<String>,
}

/// Completion marker, bracketed or bare
const COMPLETE_MARK: &str = r"(?:[\(\[]\s*(?:완결?|完)\s*[\)\]]|完|완결?)";

static AUTHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)[-–—]\s+([^-–—\d][^-–—]*)$").expect("valid regex"));

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2,}").expect("valid regex"));

/// `1부 1-546 完 2부 1-212`
static COMPOSITE_WITH_VOLUME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(\d+)\s*부\s*(\d+)\s*[-~]\s*(\d+)\s*{}\s*(\d+)\s*부\s*(\d+)\s*[-~]\s*(\d+)",
        COMPLETE_MARK
    ))
    .expect("valid regex")
});

/// `1-546 (완) 2부 1-212`
static COMPOSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(\d+)\s*[-~]\s*(\d+)\s*{}\s*(\d+)\s*부\s*(\d+)\s*[-~]\s*(\d+)",
        COMPLETE_MARK
    ))
    .expect("valid regex")
});

static MAIN_AND_SIDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"본편\s*및\s*외전\s*{}?", COMPLETE_MARK)).expect("valid regex")
});

/// `完+外`, `완결+外 1-5`
static COMPLETE_PLUS_OUTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"{}\s*\+\s*外\s*(\d+(?:\s*[-~]\s*\d+)?)?",
        COMPLETE_MARK
    ))
    .expect("valid regex")
});

/// `完 외포` (side stories included)
static OUTER_INCLUDED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:完|완)\s*외포").expect("valid regex"));

/// `340 完 , 외전 12 完`
static COMPLETE_THEN_SIDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:完|완)\s*,\s*외전\s*(\d+)\s*(?:完|완)").expect("valid regex")
});

static AFTERWORD_INCLUDED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"후기\s*포함").expect("valid regex"));

static DIGIT_COMPLETE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)(完|완)").expect("valid regex"));

static COMPLETION_STRIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[\(\[]\s*(?:완결?|完|(?i:complete|end|fin))\s*[\)\]]",
        r"|본편\s*완결",
        r"|(?:^|\s)(?:完|완결?)(?:\s|$|\+|,)",
    ))
    .expect("valid regex")
});

static PLUS_SIDE_STORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\+\s*(외전|番外|外|번외편|번외|에필로그|에필|특별편|스핀오프|후기|特外)([\s\d\-~,]*)",
    )
    .expect("valid regex")
});

static FREE_SIDE_STORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(외전|番外|번외편|번외|에필로그|에필|특별편|스핀오프|후기|特外|外)\s*(\d+(?:\s*[-~]\s*\d+)?)?",
    )
    .expect("valid regex")
});

static VOLUME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[-~]\s*(\d+)\s*부|(\d+)\s*부").expect("valid regex"));

static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[-~]\s*(\d+)").expect("valid regex"));

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

static DASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[-~]\s*").expect("valid regex"));

/// Parse the residual string in fixed order
///
/// (a) author, (b) composites, (c) completion idioms, (d) completion,
/// (e) side stories, (f) volume, (g) range.
pub(crate) fn parse_residual(residual: &str) -> ResidualFields {
    let mut fields = ResidualFields::default();
    let mut rest = residual.trim().to_string();
    if rest.is_empty() {
        return fields;
    }

    // (a) author suffix
    if let Some(caps) = AUTHOR_RE.captures(&rest) {
        if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
            let name = name.as_str().trim();
            if name.chars().count() < 20 && !DIGIT_RUN_RE.is_match(name) {
                fields.author = Some(name.to_string());
                rest = rest[..whole.start()].to_string();
            }
        }
    }

    // (b) composites
    if let Some(caps) = COMPOSITE_WITH_VOLUME_RE.captures(&rest) {
        fields.volume_info = Some(format!("{}부", number(&caps, 1)));
        fields.range_info = Some(format!(
            "{} (완) {}부 {}",
            normalize_range(number(&caps, 2), number(&caps, 3)),
            number(&caps, 4),
            normalize_range(number(&caps, 5), number(&caps, 6)),
        ));
        rest = remove_match(&rest, &caps);
    } else if let Some(caps) = COMPOSITE_RE.captures(&rest) {
        // First part finished, the work as a whole continues
        fields.range_info = Some(format!(
            "{} (완) {}부 {}",
            normalize_range(number(&caps, 1), number(&caps, 2)),
            number(&caps, 3),
            normalize_range(number(&caps, 4), number(&caps, 5)),
        ));
        rest = remove_match(&rest, &caps);
    }

    // (c) completion idioms
    if let Some(caps) = MAIN_AND_SIDE_RE.captures(&rest) {
        fields.is_completed = true;
        push_side_story(&mut fields.side_story, "외전".to_string());
        rest = remove_match(&rest, &caps);
    }
    if let Some(caps) = COMPLETE_PLUS_OUTER_RE.captures(&rest) {
        fields.is_completed = true;
        let entry = match caps.get(1) {
            Some(range) => format!("외전 {}", normalize_dashes(range.as_str())),
            None => "외전".to_string(),
        };
        push_side_story(&mut fields.side_story, entry);
        rest = remove_match(&rest, &caps);
    }
    if let Some(caps) = OUTER_INCLUDED_RE.captures(&rest) {
        fields.is_completed = true;
        push_side_story(&mut fields.side_story, "외전".to_string());
        rest = remove_match(&rest, &caps);
    }
    if let Some(caps) = COMPLETE_THEN_SIDE_RE.captures(&rest) {
        fields.is_completed = true;
        fields.range_info = Some(normalize_range("1", number(&caps, 1)));
        push_side_story(&mut fields.side_story, format!("외전 {}", strip_zeros(number(&caps, 2))));
        rest = remove_match(&rest, &caps);
    }
    rest = AFTERWORD_INCLUDED_RE.replace_all(&rest, "후기").into_owned();

    // (d) completion marker
    rest = DIGIT_COMPLETE_RE.replace_all(&rest, "${1} ${2}").into_owned();
    while COMPLETION_STRIP_RE.is_match(&rest) {
        fields.is_completed = true;
        rest = COMPLETION_STRIP_RE.replace_all(&rest, " ").into_owned();
    }

    // (e) side stories: `+ suffix` first, then free-standing keywords
    let plus_entries: Vec<String> = PLUS_SIDE_STORY_RE
        .captures_iter(&rest)
        .map(|caps| side_story_entry(&caps))
        .collect();
    for entry in plus_entries {
        push_side_story(&mut fields.side_story, entry);
    }
    rest = PLUS_SIDE_STORY_RE.replace_all(&rest, " ").into_owned();

    while let Some(caps) = FREE_SIDE_STORY_RE.captures(&rest) {
        push_side_story(&mut fields.side_story, side_story_entry(&caps));
        rest = remove_match(&rest, &caps);
    }

    // (f) volume
    if fields.volume_info.is_none() {
        if let Some(caps) = VOLUME_RE.captures(&rest) {
            fields.volume_info = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(start), Some(end), _) => {
                    Some(format!("{}-{}부", strip_zeros(start.as_str()), strip_zeros(end.as_str())))
                }
                (_, _, Some(single)) => Some(format!("{}부", strip_zeros(single.as_str()))),
                _ => None,
            };
            rest = remove_match(&rest, &caps);
        }
    }

    // (g) range, or a multi-digit number promoted to 1-N
    if fields.range_info.is_none() {
        if let Some(caps) = RANGE_RE.captures(&rest) {
            fields.range_info = Some(normalize_range(number(&caps, 1), number(&caps, 2)));
        } else if let Some(m) = NUMBER_RE.find(&rest) {
            let digits = m.as_str();
            let value = strip_zeros(digits);
            if digits.len() >= 2 && value != "0" {
                fields.range_info = Some(normalize_range("1", &value));
            }
        }
    }

    fields
}

fn number<'a>(caps: &'a Captures<'_>, index: usize) -> &'a str {
    caps.get(index).map(|m| m.as_str()).unwrap_or("")
}

fn remove_match(text: &str, caps: &Captures<'_>) -> String {
    match caps.get(0) {
        Some(m) => format!("{} {}", &text[..m.start()], &text[m.end()..]),
        None => text.to_string(),
    }
}

fn strip_zeros(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `start-end` with leading zeros removed and start ≤ end
pub(crate) fn normalize_range(start: &str, end: &str) -> String {
    let (start, end) = (strip_zeros(start), strip_zeros(end));
    // Numeric comparison on digit strings without overflow
    let swapped = (start.len(), start.as_str()) > (end.len(), end.as_str());
    if swapped {
        format!("{}-{}", end, start)
    } else {
        format!("{}-{}", start, end)
    }
}

fn normalize_dashes(text: &str) -> String {
    DASH_RE.replace_all(text.trim(), "-").into_owned()
}

fn canonical_side_token(token: &str) -> &str {
    match token {
        "番外" | "번외편" | "번외" | "外" => "외전",
        "에필로그" => "에필",
        "特外" => "특외",
        other => other,
    }
}

fn side_story_entry(caps: &Captures<'_>) -> String {
    let token = canonical_side_token(number(caps, 1));
    let detail = number(caps, 2).trim_matches(|c: char| c.is_whitespace() || c == ',');
    if detail.is_empty() {
        token.to_string()
    } else {
        format!("{} {}", token, normalize_dashes(detail))
    }
}

fn push_side_story(entries: &mut Vec<String>, entry: String) {
    if !entries.contains(&entry) {
        entries.push(entry);
    }
}
