//! Title anchor parser integration tests
//!
//! Exercise the public `parse` entry point with realistic archive names.

use wnc_classifier::parse;
use wnc_classifier::query::build_queries;

/// Archive names seen in the wild, messiest first
const CORPUS: &[&str] = &[
    "[무협] 화산귀환 1-1500 (완).txt",
    "나 혼자 소드 마스터 1-1031 (완) + 외전 1-79, 에필.txt",
    "100층의 올마스터 120 .txt",
    "ㄷH공ㅂlㄱr 되었다 1-50.txt",
    "템빨 1-100 (완) - 박촌장.txt",
    "전지적 독자 시점 1부 1-551 完 2부 1-100.zip",
    "(19N) [단행본] 마법사의 정원 0300~0001.txt",
    "1-100",
    "(완)",
    "完",
    ".txt",
];

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_title_non_empty_for_every_non_empty_input() {
    for raw in CORPUS {
        let parsed = parse(raw);
        assert!(!parsed.title.trim().is_empty(), "empty title for {:?}", raw);
    }
}

#[test]
fn test_ranges_are_ordered() {
    for raw in CORPUS {
        let parsed = parse(raw);
        let Some(range) = parsed.range_info.as_deref() else {
            continue;
        };
        // First segment of a possibly composite range
        let first = range.split_whitespace().next().unwrap();
        let Some((start, end)) = first.split_once('-') else {
            continue;
        };
        if let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) {
            assert!(start <= end, "unordered range {:?} for {:?}", range, raw);
        }
    }
}

#[test]
fn test_empty_input_degrades_quietly() {
    let parsed = parse("");
    assert_eq!(parsed.title, "");
    assert!(parsed.range_info.is_none());
    assert!(!parsed.is_completed);
}

// ============================================================================
// Documented examples
// ============================================================================

#[test]
fn test_completed_with_side_stories() {
    // Act
    let parsed = parse("나 혼자 소드 마스터 1-1031 (완) + 외전 1-79, 에필.txt");

    // Assert
    assert_eq!(parsed.title, "나 혼자 소드 마스터");
    assert_eq!(parsed.range_info.as_deref(), Some("1-1031"));
    assert!(parsed.is_completed);
    assert!(parsed.side_story.iter().any(|s| s.contains("외전")));
    assert!(parsed.side_story.iter().any(|s| s.contains("에필")));
}

#[test]
fn test_trailing_number_promoted() {
    let parsed = parse("100층의 올마스터 120 .txt");
    assert_eq!(parsed.title, "100층의 올마스터");
    assert_eq!(parsed.range_info.as_deref(), Some("1-120"));
}

#[test]
fn test_reversed_zero_padded_range() {
    let parsed = parse("마법사의 정원 0300~0001.txt");
    assert_eq!(parsed.title, "마법사의 정원");
    assert_eq!(parsed.range_info.as_deref(), Some("1-300"));
}

// ============================================================================
// Parser → query builder hand-off
// ============================================================================

#[test]
fn test_author_flows_into_first_query() {
    let parsed = parse("템빨 1-100 (완) - 박촌장.txt");
    let plan = build_queries(&parsed);

    assert_eq!(plan.author(), Some("박촌장"));
    assert_eq!(plan.queries[0].text, "템빨 박촌장");
    let priorities: Vec<u8> = plan.queries.iter().map(|q| q.priority).collect();
    assert!(priorities.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_display_name_round_trip_fields() {
    let parsed = parse("[무협] 화산귀환 1-1500 (완).txt");
    let name = parsed.display_name(Some("무협"));

    assert!(name.starts_with("[무협] 화산귀환 1-1500"));
    assert!(name.ends_with(".txt"));
}
