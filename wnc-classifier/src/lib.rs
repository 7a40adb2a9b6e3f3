//! wnc-classifier library interface
//!
//! Parses raw web-novel filenames into structured records and classifies
//! them into the canonical genre set using external platform pages, a
//! result cache, a weighted keyword model and an author registry.
//!
//! # Example
//! ```rust,ignore
//! let classifier = Classifier::builder().build();
//! let outcome = classifier.classify("[무협] 화산귀환 1-1500 (완).txt").await;
//! assert_eq!(outcome.result.genre, "무협");
//! ```

pub mod authors;
pub mod batch;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod keywords;
pub mod matcher;
pub mod orchestrator;
pub mod parser;
pub mod query;
pub mod search;
pub mod sources;
pub mod types;
pub mod vocabulary;

pub use batch::{BatchClassifier, BatchRecord, BatchReport, BatchSummary};
pub use config::ClassifierConfig;
pub use orchestrator::{ClassificationOutcome, Classifier, ClassifierBuilder, ClassifierSettings};
pub use parser::{parse, ParsedTitle};
pub use types::{ClassificationResult, Provenance, SourceId, SourceResult};
