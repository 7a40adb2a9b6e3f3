//! Decision trace
//!
//! One typed event per decision point, carried in the classification
//! outcome. Tests assert on events; operators read the same events as
//! `debug!` records.

use crate::types::{Provenance, SourceId};
use serde::Serialize;
use tracing::debug;

/// Why a source was not consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Breaker tripped earlier in the run
    CircuitOpen,
    /// Search returned no links for the source
    NoLinks,
}

/// Decision point reached while classifying one name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    TagShortcut {
        tag: String,
        genre: String,
    },
    CacheHit {
        key: String,
        genre: String,
    },
    QueryIssued {
        query: String,
        description: String,
        links: usize,
    },
    SearchFailed {
        query: String,
        error: String,
    },
    SourceSkipped {
        source: SourceId,
        reason: SkipReason,
    },
    SourceTried {
        source: SourceId,
        links: usize,
    },
    SourceFailed {
        source: SourceId,
        error: String,
    },
    SourceMatched {
        source: SourceId,
        genre: String,
        raw_genre: String,
        confidence: f32,
    },
    /// Result ignored in favour of an earlier, at least as specific one
    SourceSuppressed {
        source: SourceId,
        genre: String,
        kept: String,
    },
    /// More specific label replaced a held or pending one
    CompetingLabel {
        source: SourceId,
        genre: String,
        replaced: String,
    },
    /// Coarse label rewritten from title keywords
    Remapped {
        source: SourceId,
        from: String,
        to: String,
        keywords: Vec<String>,
    },
    /// Source result below the acceptance threshold, passed over
    BelowAcceptance {
        source: SourceId,
        genre: String,
        confidence: f32,
    },
    RefinementApplied {
        from: String,
        to: String,
        mode: String,
    },
    RefinementRejected {
        genre: String,
        mode: String,
        reason: String,
    },
    FallbackUsed {
        source: Provenance,
        genre: String,
    },
    Unclassified,
}

/// Ordered decision trace for one classification
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and emit it as a debug record
    pub fn record(&mut self, event: TraceEvent) {
        debug!(event = ?event, "Decision");
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether any event satisfies `pred`
    pub fn any(&self, pred: impl Fn(&TraceEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_tagged() {
        let mut trace = Trace::new();
        trace.record(TraceEvent::SourceSkipped {
            source: SourceId::Joara,
            reason: SkipReason::CircuitOpen,
        });
        trace.record(TraceEvent::Unclassified);

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json[0]["event"], "source_skipped");
        assert_eq!(json[0]["source"], "joara");
        assert_eq!(json[0]["reason"], "circuit_open");
        assert_eq!(json[1]["event"], "unclassified");
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_any() {
        let mut trace = Trace::new();
        trace.record(TraceEvent::CacheHit {
            key: "화산귀환".into(),
            genre: "무협".into(),
        });
        assert!(trace.any(|e| matches!(e, TraceEvent::CacheHit { .. })));
        assert!(!trace.any(|e| matches!(e, TraceEvent::Unclassified)));
    }
}
