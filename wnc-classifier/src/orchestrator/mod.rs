//! Classification Orchestrator
//!
//! Turns one raw filename into a [`ClassificationOutcome`]. Evidence is
//! consulted in a fixed order of [`Step`]s:
//!
//! 1. genre tag in the filename
//! 2. result cache
//! 3. external sources (search, arbitration, refinement)
//! 4. special-case titles
//! 5. characteristic title keywords
//! 6. keyword classifier
//! 7. author registry
//!
//! Anything left over is 미분류. `classify` never fails; every lookup
//! failure degrades to "no evidence" and is recorded in the [`Trace`].
//!
//! The cache, keyword tables, vocabulary and author registry are shared
//! services injected at construction, so one `Classifier` serves every
//! worker of a batch.

pub mod refine;
pub mod steps;
pub mod trace;

pub use refine::{refine, refinement_mode, Refinement, RefinementMode};
pub use steps::{Resolution, Step, StepInput};
pub use trace::{SkipReason, Trace, TraceEvent};

use crate::authors::AuthorRegistry;
use crate::cache::ResultCache;
use crate::config::ClassifierConfig;
use crate::fetch::{CircuitBreakers, FetchGuard, HttpFetcher, DEFAULT_USER_AGENT};
use crate::keywords::{KeywordClassifier, KeywordTable};
use crate::matcher::TitleMatcher;
use crate::parser::{self, ParsedTitle};
use crate::query::build_queries;
use crate::search::{PortalSearch, SearchProvider};
use crate::sources::{default_extractors, ExtractorContext, SourceArbiter};
use crate::types::ClassificationResult;
use crate::vocabulary::GenreVocabulary;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use wnc_common::ConfidenceTier;

/// Thresholds the steps compare against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierSettings {
    /// Keyword fallback must reach this confidence
    pub confidence_floor: f32,
    pub title_keyword_confidence: f32,
    /// Source results below this are not accepted
    pub search_acceptance: f32,
    pub author_hint_confidence: f32,
    /// Remember 미분류 results in the cache
    pub cache_unclassified: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

impl From<&ClassifierConfig> for ClassifierSettings {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            confidence_floor: config.thresholds.confidence_floor,
            title_keyword_confidence: config.thresholds.title_keyword_confidence,
            search_acceptance: config.thresholds.search_acceptance,
            author_hint_confidence: config.thresholds.author_hint_confidence,
            cache_unclassified: config.cache.cache_unclassified,
        }
    }
}

/// Everything produced for one raw name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationOutcome {
    pub result: ClassificationResult,
    pub parsed: ParsedTitle,
    pub trace: Trace,
}

impl ClassificationOutcome {
    /// Standardized display name carrying the resolved genre
    pub fn display_name(&self) -> String {
        let genre = Some(self.result.genre.as_str()).filter(|_| !self.result.is_unclassified());
        self.parsed.display_name(genre)
    }
}

/// Genre classifier for raw filenames
pub struct Classifier {
    cache: Arc<ResultCache>,
    authors: Arc<AuthorRegistry>,
    keywords: Arc<KeywordClassifier>,
    vocabulary: Arc<GenreVocabulary>,
    search: Option<Arc<dyn SearchProvider>>,
    arbiter: Option<SourceArbiter>,
    settings: ClassifierSettings,
}

impl Classifier {
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::default()
    }

    /// Wire a networked classifier from configuration
    ///
    /// Data files are loaded from `data_dir` with built-in fallbacks. When
    /// the HTTP client cannot be built the classifier runs offline.
    pub fn from_config(config: &ClassifierConfig, data_dir: &Path) -> Self {
        let builder = Self::offline_builder(config, data_dir);

        let user_agent = config.http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let fetcher = match HttpFetcher::new(config.http.timeout(), config.http.connect_timeout(), user_agent) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                error!(error = %e, "HTTP client unavailable, classifying without sources");
                return builder.build();
            }
        };
        let client = fetcher.client().clone();

        let breakers = Arc::new(CircuitBreakers::new());
        let guard = Arc::new(FetchGuard::new(
            Arc::new(fetcher),
            breakers.clone(),
            config.http.min_interval(),
        ));
        let ctx = ExtractorContext {
            guard: guard.clone(),
            matcher: Arc::new(TitleMatcher::new(config.thresholds.match_thresholds())),
            vocabulary: builder.vocabulary.clone(),
            max_pages: config.http.max_pages_per_source,
        };

        let search: Arc<dyn SearchProvider> = match config.search_credentials() {
            Some(credentials) => Arc::new(PortalSearch::with_api(
                guard,
                client,
                credentials,
                config.search.requests_per_second,
                config.search.results_per_query,
            )),
            None => {
                info!("No search API credentials, using web search");
                Arc::new(PortalSearch::web(guard))
            }
        };
        let arbiter = SourceArbiter::new(default_extractors(&ctx), breakers, builder.vocabulary.clone());

        builder.sources(search, arbiter).build()
    }

    /// Classifier without external sources, from configuration
    pub fn offline(config: &ClassifierConfig, data_dir: &Path) -> Self {
        Self::offline_builder(config, data_dir).build()
    }

    fn offline_builder(config: &ClassifierConfig, data_dir: &Path) -> ClassifierBuilder {
        let vocabulary = GenreVocabulary::load_or_default(Some(&config.vocabulary_path(data_dir)));
        let table = KeywordTable::load_or_default(Some(&config.keywords_path(data_dir)));
        let cache = ResultCache::open(config.cache_path(data_dir));
        info!(
            vocabulary = vocabulary.len(),
            cached = cache.len(),
            "Classifier data loaded"
        );

        Self::builder()
            .vocabulary(vocabulary)
            .keywords(KeywordClassifier::new(table))
            .cache(Arc::new(cache))
            .settings(ClassifierSettings::from(config))
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn has_sources(&self) -> bool {
        self.search.is_some() && self.arbiter.is_some()
    }

    /// Parse and classify one raw filename
    pub async fn classify(&self, raw: &str) -> ClassificationOutcome {
        let parsed = parser::parse(raw);
        let mut trace = Trace::new();

        if parsed.title.trim().is_empty() {
            trace.record(TraceEvent::Unclassified);
            return ClassificationOutcome {
                result: ClassificationResult::unclassified(ConfidenceTier::None, vec!["empty input".to_string()]),
                parsed,
                trace,
            };
        }

        let plan = build_queries(&parsed);
        let input = StepInput {
            parsed: &parsed,
            plan: &plan,
        };

        let mut resolved = None;
        for step in Step::ORDER {
            if let Some(resolution) = self.run_step(step, &input, &mut trace).await {
                debug!(
                    title = %parsed.title,
                    step = %step,
                    genre = %resolution.result.genre,
                    "Resolved"
                );
                resolved = Some(resolution);
                break;
            }
        }

        let resolution = resolved.unwrap_or_else(|| {
            trace.record(TraceEvent::Unclassified);
            Resolution {
                result: ClassificationResult::unclassified(
                    ConfidenceTier::Low,
                    vec!["no evidence".to_string()],
                ),
                cacheable: self.settings.cache_unclassified,
            }
        });

        if resolution.cacheable {
            self.cache.set(&parsed.title, &resolution.result);
        }

        ClassificationOutcome {
            result: resolution.result,
            parsed,
            trace,
        }
    }

    /// Persist the cache; failures are logged
    pub fn flush_cache(&self) -> bool {
        match self.cache.flush() {
            Ok(written) => written,
            Err(e) => {
                warn!(error = %e, "Failed to flush genre cache");
                false
            }
        }
    }
}

/// Builder for [`Classifier`]
///
/// Unset services fall back to built-in tables and an in-memory cache.
#[derive(Default)]
pub struct ClassifierBuilder {
    cache: Option<Arc<ResultCache>>,
    authors: Option<AuthorRegistry>,
    keywords: Option<KeywordClassifier>,
    vocabulary: Arc<GenreVocabulary>,
    search: Option<Arc<dyn SearchProvider>>,
    arbiter: Option<SourceArbiter>,
    settings: ClassifierSettings,
}

impl ClassifierBuilder {
    pub fn cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn authors(mut self, authors: AuthorRegistry) -> Self {
        self.authors = Some(authors);
        self
    }

    pub fn keywords(mut self, keywords: KeywordClassifier) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn vocabulary(mut self, vocabulary: GenreVocabulary) -> Self {
        self.vocabulary = Arc::new(vocabulary);
        self
    }

    /// External sources: search provider plus the arbiter over extractors
    pub fn sources(mut self, search: Arc<dyn SearchProvider>, arbiter: SourceArbiter) -> Self {
        self.search = Some(search);
        self.arbiter = Some(arbiter);
        self
    }

    pub fn settings(mut self, settings: ClassifierSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Classifier {
        Classifier {
            cache: self.cache.unwrap_or_else(|| Arc::new(ResultCache::in_memory())),
            authors: Arc::new(self.authors.unwrap_or_else(AuthorRegistry::builtin)),
            keywords: Arc::new(self.keywords.unwrap_or_default()),
            vocabulary: self.vocabulary,
            search: self.search,
            arbiter: self
                .arbiter
                .map(|arbiter| arbiter.with_acceptance(self.settings.search_acceptance)),
            settings: self.settings,
        }
    }
}
