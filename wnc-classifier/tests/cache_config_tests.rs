//! Cache persistence and configuration loading across runs

use serial_test::serial;
use tempfile::TempDir;
use wnc_classifier::config::CONFIG_ENV;
use wnc_classifier::orchestrator::TraceEvent;
use wnc_classifier::{Classifier, ClassifierConfig, Provenance};
use wnc_common::ConfidenceTier;

// ============================================================================
// Cache persistence
// ============================================================================

#[tokio::test]
async fn test_cached_result_survives_restart() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config = ClassifierConfig::default();

    // Act: first run resolves by tag and flushes
    let first = Classifier::offline(&config, dir.path());
    let outcome = first.classify("[무협] 화산귀환 1-10.txt").await;
    assert!(first.flush_cache());
    drop(first);

    // Second run sees the persisted entry for the same title without a tag
    let second = Classifier::offline(&config, dir.path());
    let cached = second.classify("화산귀환 11-20.txt").await;

    // Assert
    assert!(config.cache_path(dir.path()).exists());
    assert_eq!(outcome.result.source, Provenance::Tag);
    assert_eq!(cached.result.genre, "무협");
    assert_eq!(cached.result.confidence, ConfidenceTier::High);
    assert_eq!(cached.result.source, Provenance::Tag);
    assert!(cached.trace.any(|e| matches!(e, TraceEvent::CacheHit { .. })));
}

#[tokio::test]
async fn test_flush_without_changes_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let classifier = Classifier::offline(&ClassifierConfig::default(), dir.path());

    assert!(!classifier.flush_cache());
    assert!(!ClassifierConfig::default().cache_path(dir.path()).exists());
}

#[tokio::test]
async fn test_malformed_cache_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let config = ClassifierConfig::default();
    std::fs::write(config.cache_path(dir.path()), "{ truncated").unwrap();

    let classifier = Classifier::offline(&config, dir.path());

    assert!(classifier.cache().is_empty());
    let outcome = classifier.classify("[현판] 재벌집 막내아들 1-10.txt").await;
    assert_eq!(outcome.result.genre, "현판");
    assert!(classifier.flush_cache());
}

// ============================================================================
// Configuration loading
// ============================================================================

#[test]
#[serial]
fn test_config_file_from_environment() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[batch]
workers = 9

[thresholds]
confidence_floor = 0.5

[cache]
cache_unclassified = false
"#,
    )
    .unwrap();
    std::env::set_var(CONFIG_ENV, &path);

    // Act
    let config = ClassifierConfig::load(None);
    std::env::remove_var(CONFIG_ENV);

    // Assert
    assert_eq!(config.batch.workers, 9);
    assert_eq!(config.thresholds.confidence_floor, 0.5);
    assert!(!config.cache.cache_unclassified);
    // Untouched sections keep defaults
    assert_eq!(config.http, ClassifierConfig::default().http);
}

#[test]
#[serial]
fn test_cli_path_wins_over_environment() {
    let dir = TempDir::new().unwrap();
    let env_path = dir.path().join("env.toml");
    let cli_path = dir.path().join("cli.toml");
    std::fs::write(&env_path, "[batch]\nworkers = 2\n").unwrap();
    std::fs::write(&cli_path, "[batch]\nworkers = 7\n").unwrap();
    std::env::set_var(CONFIG_ENV, &env_path);

    let config = ClassifierConfig::load(Some(&cli_path));
    std::env::remove_var(CONFIG_ENV);

    assert_eq!(config.batch.workers, 7);
}

#[test]
#[serial]
fn test_malformed_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[batch\nworkers = ").unwrap();

    let config = ClassifierConfig::load(Some(&path));

    assert_eq!(config, ClassifierConfig::default());
}
