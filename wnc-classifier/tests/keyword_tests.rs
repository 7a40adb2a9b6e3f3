//! Keyword classifier integration tests

use std::io::Write;
use tempfile::NamedTempFile;
use wnc_classifier::keywords::{KeywordClassifier, KeywordTable};

fn table_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_builtin_table_ranks_martial_arts() {
    let classifier = KeywordClassifier::default();

    let verdict = classifier.classify_with_confidence("천마의 귀환, 무림을 평정하다");

    assert_eq!(verdict.genre, "무협");
    assert!(verdict.confidence > 0.0 && verdict.confidence <= 1.0);
    assert!(verdict.matched().iter().any(|m| m.starts_with("천마")));
}

#[test]
fn test_text_without_keywords_is_unclassified() {
    let verdict = KeywordClassifier::default().classify_with_confidence("zzz");

    assert!(verdict.is_unclassified());
    assert_eq!(verdict.confidence, 0.0);
    assert!(verdict.ranked.is_empty());
}

#[test]
fn test_custom_table_replaces_single_keywords() {
    // Arrange
    let file = table_file(r#"{"version": "custom", "single_keywords": {"스포츠": {"비검": 10}}}"#);

    // Act
    let table = KeywordTable::load_or_default(Some(file.path()));
    let classifier = KeywordClassifier::new(table);

    // Assert
    assert_eq!(classifier.table().version, "custom");
    assert_eq!(classifier.classify_with_confidence("비검의 주인").genre, "스포츠");
    assert!(classifier.classify_with_confidence("천마 무림").is_unclassified());
    // Sections missing from the file keep their built-in content
    assert_eq!(classifier.special_case("화산귀환 1-1500"), Some(("화산귀환", "무협")));
}
