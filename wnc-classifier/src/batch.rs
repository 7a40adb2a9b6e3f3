//! Batch classification
//!
//! Runs many names through one shared [`Classifier`] with a bounded number
//! of concurrent workers. Circuit breakers and the cache are shared through
//! the classifier, so a source that trips on item N stays closed for every
//! later item of the run. Each item runs in its own task: a panic or failure
//! becomes an unclassified record and never aborts the batch.

use crate::orchestrator::{ClassificationOutcome, Classifier, Trace};
use crate::parser::{self, ParsedTitle};
use crate::types::ClassificationResult;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;
use wnc_common::ConfidenceTier;

/// Worker count used when zero is requested
pub const DEFAULT_WORKERS: usize = 5;

/// One output line of a batch run (JSON Lines)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub filename: String,
    pub title: String,
    pub genre: String,
    pub confidence: ConfidenceTier,
    pub source: String,
}

impl BatchRecord {
    pub fn from_outcome(filename: &str, outcome: &ClassificationOutcome) -> Self {
        Self {
            filename: filename.to_string(),
            title: outcome.parsed.title.clone(),
            genre: outcome.result.genre.clone(),
            confidence: outcome.result.confidence,
            source: outcome.result.source.to_string(),
        }
    }
}

/// Counts for one batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub classified: usize,
    pub unclassified: usize,
    /// Items that panicked or failed inside their worker
    pub failed: usize,
    /// Classified items per provenance
    pub by_source: BTreeMap<String, usize>,
    /// Whether the cache was written at the end of the run
    pub cache_flushed: bool,
}

/// Results in input order plus the run summary
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<(String, ClassificationOutcome)>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn records(&self) -> impl Iterator<Item = BatchRecord> + '_ {
        self.outcomes
            .iter()
            .map(|(name, outcome)| BatchRecord::from_outcome(name, outcome))
    }
}

/// Bounded worker pool over a shared classifier
pub struct BatchClassifier {
    classifier: Arc<Classifier>,
}

impl BatchClassifier {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// Classify every name with at most `workers` in flight
    ///
    /// Outcomes come back in input order. The cache is flushed once at the
    /// end of the run.
    pub async fn run(&self, names: Vec<String>, workers: usize) -> BatchReport {
        let workers = if workers == 0 { DEFAULT_WORKERS } else { workers };
        let run_id = Uuid::new_v4();
        let total = names.len();

        info!(
            run_id = %run_id,
            total,
            workers,
            sources = self.classifier.has_sources(),
            "Batch classification starting"
        );

        let processed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let mut indexed: Vec<(usize, String, ClassificationOutcome)> = stream::iter(names.into_iter().enumerate())
            .map(|(index, name)| {
                let classifier = self.classifier.clone();
                let processed = processed.clone();
                let failed = failed.clone();

                async move {
                    debug!(run_id = %run_id, index, name = %name, "Worker starting item");

                    let task_name = name.clone();
                    let outcome = match tokio::spawn(async move { classifier.classify(&task_name).await }).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!(run_id = %run_id, name = %name, error = %e, "Item failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                            failed_outcome(&name, &e.to_string())
                        }
                    };

                    let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if current % 10 == 0 || current == total {
                        info!(
                            run_id = %run_id,
                            progress = format!("{}/{}", current, total),
                            "Batch progress"
                        );
                    }

                    (index, name, outcome)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _, _)| *index);
        let outcomes: Vec<(String, ClassificationOutcome)> = indexed
            .into_iter()
            .map(|(_, name, outcome)| (name, outcome))
            .collect();

        let cache_flushed = self.classifier.flush_cache();
        let summary = summarize(run_id, &outcomes, failed.load(Ordering::Relaxed), cache_flushed);

        info!(
            run_id = %run_id,
            total = summary.total,
            classified = summary.classified,
            unclassified = summary.unclassified,
            failed = summary.failed,
            "Batch classification completed"
        );

        BatchReport { outcomes, summary }
    }
}

/// Unclassified outcome for an item whose worker died
fn failed_outcome(name: &str, error: &str) -> ClassificationOutcome {
    // The panic may have come from the parser itself
    let parsed = std::panic::catch_unwind(|| parser::parse(name)).unwrap_or_else(|_| ParsedTitle::fallback(name));
    ClassificationOutcome {
        result: ClassificationResult::unclassified(ConfidenceTier::Low, vec![format!("worker failed: {}", error)]),
        parsed,
        trace: Trace::new(),
    }
}

fn summarize(
    run_id: Uuid,
    outcomes: &[(String, ClassificationOutcome)],
    failed: usize,
    cache_flushed: bool,
) -> BatchSummary {
    let mut by_source = BTreeMap::new();
    let mut classified = 0;
    for (_, outcome) in outcomes {
        if outcome.result.is_unclassified() {
            continue;
        }
        classified += 1;
        *by_source.entry(outcome.result.source.to_string()).or_insert(0) += 1;
    }

    BatchSummary {
        run_id,
        total: outcomes.len(),
        classified,
        unclassified: outcomes.len() - classified,
        failed,
        by_source,
        cache_flushed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Provenance;

    #[tokio::test]
    async fn test_results_in_input_order() {
        // Arrange
        let batch = BatchClassifier::new(Arc::new(Classifier::builder().build()));
        let names = vec![
            "[무협] 화산귀환 1-10.txt".to_string(),
            "".to_string(),
            "[로판] 악녀는 두 번 산다 1-50.txt".to_string(),
        ];

        // Act
        let report = batch.run(names.clone(), 2).await;

        // Assert
        let returned: Vec<&str> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(returned, names.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(report.outcomes[0].1.result.genre, "무협");
        assert!(report.outcomes[1].1.result.is_unclassified());
        assert_eq!(report.outcomes[2].1.result.genre, "로판");
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let batch = BatchClassifier::new(Arc::new(Classifier::builder().build()));
        let names = vec!["[무협] 화산귀환.txt".to_string(), "".to_string()];

        let report = batch.run(names, 0).await;

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.classified, 1);
        assert_eq!(report.summary.unclassified, 1);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(report.summary.by_source.get("tag"), Some(&1));
        // In-memory cache has nothing to flush to
        assert!(!report.summary.cache_flushed);
    }

    #[test]
    fn test_record_fields() {
        let outcome = ClassificationOutcome {
            result: ClassificationResult::new("무협", ConfidenceTier::High, Provenance::Tag, 1.0, vec![]),
            parsed: parser::parse("[무협] 화산귀환 1-10.txt"),
            trace: Trace::new(),
        };

        let record = BatchRecord::from_outcome("[무협] 화산귀환 1-10.txt", &outcome);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["title"], "화산귀환");
        assert_eq!(json["genre"], "무협");
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["source"], "tag");
    }

    #[test]
    fn test_failed_outcome_keeps_title() {
        let outcome = failed_outcome("화산귀환 1-10.txt", "task panicked");
        assert!(outcome.result.is_unclassified());
        assert_eq!(outcome.parsed.title, "화산귀환");
    }
}
