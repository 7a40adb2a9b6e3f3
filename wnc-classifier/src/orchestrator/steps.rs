//! Resolver steps
//!
//! Each step inspects one kind of evidence and either resolves the title or
//! passes. [`Classifier::classify`](super::Classifier::classify) runs them
//! in [`Step::ORDER`] and stops at the first resolution.

use super::refine::refine;
use super::trace::{Trace, TraceEvent};
use super::Classifier;
use crate::fetch::FetchError;
use crate::keywords::analyze_title;
use crate::parser::ParsedTitle;
use crate::query::QueryPlan;
use crate::search::PlatformLinks;
use crate::types::{ClassificationResult, Provenance, SourceQuery};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};
use wnc_common::ConfidenceTier;

/// Score attached to a whitelisted filename tag
pub const TAG_CONFIDENCE: f32 = 1.0;
/// Score attached to a special-case title
pub const SPECIAL_CASE_CONFIDENCE: f32 = 0.95;

/// Resolver step, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    TagShortcut,
    CacheLookup,
    SourceSearch,
    SpecialCases,
    TitleKeywords,
    KeywordFallback,
    AuthorFallback,
}

impl Step {
    pub const ORDER: [Step; 7] = [
        Step::TagShortcut,
        Step::CacheLookup,
        Step::SourceSearch,
        Step::SpecialCases,
        Step::TitleKeywords,
        Step::KeywordFallback,
        Step::AuthorFallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::TagShortcut => "tag_shortcut",
            Step::CacheLookup => "cache_lookup",
            Step::SourceSearch => "source_search",
            Step::SpecialCases => "special_cases",
            Step::TitleKeywords => "title_keywords",
            Step::KeywordFallback => "keyword_fallback",
            Step::AuthorFallback => "author_fallback",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result produced by a step
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub result: ClassificationResult,
    /// Write the result to the cache
    pub cacheable: bool,
}

impl Resolution {
    fn fresh(result: ClassificationResult) -> Self {
        Self {
            result,
            cacheable: true,
        }
    }

    fn cached(result: ClassificationResult) -> Self {
        Self {
            result,
            cacheable: false,
        }
    }
}

/// What every step sees for one title
pub struct StepInput<'a> {
    pub parsed: &'a ParsedTitle,
    pub plan: &'a QueryPlan,
}

impl<'a> StepInput<'a> {
    fn title(&self) -> &str {
        &self.parsed.title
    }

    /// Author from the filename, else from the title itself
    fn author(&self) -> Option<&str> {
        self.parsed.author.as_deref().or_else(|| self.plan.author())
    }
}

impl Classifier {
    /// Run one step
    pub(super) async fn run_step(
        &self,
        step: Step,
        input: &StepInput<'_>,
        trace: &mut Trace,
    ) -> Option<Resolution> {
        match step {
            Step::TagShortcut => self.tag_shortcut(input, trace),
            Step::CacheLookup => self.cache_lookup(input, trace),
            Step::SourceSearch => self.source_search(input, trace).await,
            Step::SpecialCases => self.special_cases(input, trace),
            Step::TitleKeywords => self.title_keywords(input, trace),
            Step::KeywordFallback => self.keyword_fallback(input, trace),
            Step::AuthorFallback => self.author_fallback(input, trace),
        }
    }

    fn tag_shortcut(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let tag = input.parsed.embedded_genre_tag.as_deref()?;
        let genre = self.vocabulary.map_known(tag)?;
        trace.record(TraceEvent::TagShortcut {
            tag: tag.to_string(),
            genre: genre.clone(),
        });
        Some(Resolution::fresh(ClassificationResult::new(
            genre,
            ConfidenceTier::High,
            Provenance::Tag,
            TAG_CONFIDENCE,
            vec![format!("filename tag [{}]", tag)],
        )))
    }

    fn cache_lookup(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let entry = self.cache.get(input.title())?;
        trace.record(TraceEvent::CacheHit {
            key: crate::cache::cache_key(input.title()),
            genre: entry.genre.clone(),
        });
        Some(Resolution::cached(entry.to_result()))
    }

    /// Queries in order until one yields accepted source evidence
    async fn source_search(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let (search, arbiter) = match (&self.search, &self.arbiter) {
            (Some(search), Some(arbiter)) => (search, arbiter),
            _ => {
                debug!("No search provider configured, skipping source lookups");
                return None;
            }
        };
        let query = SourceQuery::new(input.plan.match_title(), input.author().map(str::to_string));

        for search_query in &input.plan.queries {
            let urls = match search.search(&search_query.text).await {
                Ok(urls) => urls,
                Err(e) => {
                    warn!(query = %search_query.text, error = %e, "Search failed");
                    trace.record(TraceEvent::SearchFailed {
                        query: search_query.text.clone(),
                        error: e.to_string(),
                    });
                    if matches!(e, FetchError::QuotaExceeded(_) | FetchError::CircuitOpen(_)) {
                        break;
                    }
                    continue;
                }
            };

            let links = PlatformLinks::bucket(urls);
            trace.record(TraceEvent::QueryIssued {
                query: search_query.text.clone(),
                description: search_query.description.clone(),
                links: links.total(),
            });
            if links.is_empty() {
                continue;
            }
            debug!(query = %search_query.text, links = %links.summary(), "Platform links");

            let Some(result) = arbiter.arbitrate(&links, &query, trace).await else {
                continue;
            };

            let refined = refine(&result, input.plan.match_title(), &self.keywords, trace);
            let mut evidence = vec![format!(
                "{}: {} ({})",
                result.source.display_name(),
                result.raw_genre,
                result.url
            )];
            if refined.changed {
                evidence.push(format!("refined {} → {}", result.genre, refined.genre));
            }
            return Some(Resolution::fresh(ClassificationResult::new(
                refined.genre,
                ConfidenceTier::High,
                Provenance::Source(result.source),
                refined.confidence,
                evidence,
            )));
        }
        None
    }

    fn special_cases(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let (special, genre) = self.keywords.special_case(input.title())?;
        if !self.vocabulary.is_valid(genre) {
            debug!(title = %special, genre = %genre, "Special case maps outside whitelist");
            return None;
        }
        trace.record(TraceEvent::FallbackUsed {
            source: Provenance::SpecialCase,
            genre: genre.to_string(),
        });
        Some(Resolution::fresh(ClassificationResult::new(
            genre,
            ConfidenceTier::High,
            Provenance::SpecialCase,
            SPECIAL_CASE_CONFIDENCE,
            vec![format!("special case '{}'", special)],
        )))
    }

    fn title_keywords(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let hit = analyze_title(input.title())?;
        if hit.confidence < self.settings.title_keyword_confidence {
            return None;
        }
        trace.record(TraceEvent::FallbackUsed {
            source: Provenance::TitleKeyword,
            genre: hit.genre.to_string(),
        });
        Some(Resolution::fresh(ClassificationResult::new(
            hit.genre,
            ConfidenceTier::Medium,
            Provenance::TitleKeyword,
            hit.confidence,
            vec![format!("title keywords: {}", hit.matched.join(", "))],
        )))
    }

    fn keyword_fallback(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let verdict = self.keywords.classify_with_confidence(input.title());
        if verdict.is_unclassified() {
            return None;
        }
        if verdict.confidence < self.settings.confidence_floor {
            debug!(
                genre = %verdict.genre,
                confidence = verdict.confidence,
                "Keyword verdict below confidence floor"
            );
            return None;
        }
        trace.record(TraceEvent::FallbackUsed {
            source: Provenance::Keyword,
            genre: verdict.genre.clone(),
        });
        let evidence = vec![format!("keywords: {}", verdict.matched().join(", "))];
        Some(Resolution::fresh(ClassificationResult::new(
            verdict.genre,
            ConfidenceTier::Medium,
            Provenance::Keyword,
            verdict.confidence,
            evidence,
        )))
    }

    fn author_fallback(&self, input: &StepInput<'_>, trace: &mut Trace) -> Option<Resolution> {
        let hint = self.authors.lookup(input.author()?)?;
        if !self.vocabulary.is_valid(&hint.genre) {
            return None;
        }
        trace.record(TraceEvent::FallbackUsed {
            source: Provenance::Author,
            genre: hint.genre.clone(),
        });
        Some(Resolution::fresh(ClassificationResult::new(
            hint.genre,
            ConfidenceTier::Medium,
            Provenance::Author,
            self.settings.author_hint_confidence,
            vec![format!("author '{}'", hint.author)],
        )))
    }
}
