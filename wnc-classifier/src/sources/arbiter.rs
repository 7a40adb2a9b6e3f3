//! Multi-source arbitration
//!
//! Walks the extractors in priority order over one query's link buckets
//! and fuses their answers:
//!
//! - 리디북스 and 문피아 are compared head to head when both have links
//! - a result that still needs refinement is held pending while later
//!   sources get a chance to name a more specific label
//! - a generic 소설 answer is only a fallback
//! - coarse labels are remapped when the title itself is unambiguous

use crate::fetch::{CircuitBreakers, Endpoint};
use crate::orchestrator::trace::{SkipReason, Trace, TraceEvent};
use crate::search::PlatformLinks;
use crate::types::{Provenance, SourceExtractor, SourceId, SourceQuery, SourceResult};
use crate::vocabulary::GenreVocabulary;
use std::sync::Arc;
use tracing::{debug, warn};
use wnc_common::genre::{self, specificity};

// ============================================================================
// Title keyword remapping
// ============================================================================

/// Title keywords that rewrite a coarse source label
struct RemapRule {
    to: &'static str,
    from: &'static [&'static str],
    keywords: &'static [&'static str],
    exclusions: &'static [&'static str],
    min_hits: usize,
}

const REMAP_RULES: &[RemapRule] = &[
    RemapRule {
        to: genre::SPORTS,
        from: &[genre::MODERN_FANTASY, genre::FANTASY],
        keywords: &["축구", "야구", "농구", "배구", "테니스", "골프", "선수", "코치", "감독", "호타", "준족"],
        exclusions: &["영화", "드라마", "연극", "공연", "마왕", "용사", "마법"],
        min_hits: 2,
    },
    RemapRule {
        to: genre::HISTORY,
        from: &[genre::FANTASY, genre::MODERN_FANTASY],
        keywords: &[
            "조선", "고려", "삼국시대", "삼국지", "왕조", "황제", "제국", "전쟁", "임진왜란",
            "병자호란", "외교관", "봉건", "이성계", "인조반정",
        ],
        exclusions: &["사이버펑크", "네오", "미래", "SF", "우주", "마왕", "용사", "마법", "던전", "게이트"],
        min_hits: 2,
    },
    RemapRule {
        to: genre::GAME_FANTASY,
        from: &[genre::FANTASY, genre::FUSION_FANTASY],
        keywords: &["게임", "VR", "가상현실", "레벨업", "스킬", "아이템", "NPC", "플레이어"],
        exclusions: &[],
        min_hits: 2,
    },
    RemapRule {
        to: genre::FUSION_FANTASY,
        from: &[genre::FANTASY],
        keywords: &["회귀", "환생", "빙의", "차원", "이계", "전이", "귀환"],
        exclusions: &[],
        min_hits: 1,
    },
];

/// Confidence floor of a remapped result
const REMAP_MIN_CONFIDENCE: f32 = 0.85;
const REMAP_PENALTY: f32 = 0.03;

/// Label rewrite suggested by the title
#[derive(Debug, Clone, PartialEq)]
pub struct Remap {
    pub genre: &'static str,
    pub keywords: Vec<&'static str>,
}

/// Rewrite a coarse `genre` when `title` carries enough keywords of a more
/// specific one; rules are tried in order
pub fn remap_by_title(genre: &str, title: &str) -> Option<Remap> {
    let lowered = title.to_lowercase();
    let compact: String = lowered.split_whitespace().collect();

    REMAP_RULES
        .iter()
        .filter(|rule| rule.from.contains(&genre))
        .find_map(|rule| {
            if rule.exclusions.iter().any(|x| lowered.contains(&x.to_lowercase())) {
                return None;
            }
            let hits: Vec<&'static str> = rule
                .keywords
                .iter()
                .copied()
                .filter(|k| {
                    let k = k.to_lowercase();
                    lowered.contains(&k) || compact.contains(&k)
                })
                .collect();
            (hits.len() >= rule.min_hits).then(|| Remap {
                genre: rule.to,
                keywords: hits,
            })
        })
}

// ============================================================================
// Arbiter
// ============================================================================

/// Fuses per-source results into one answer
pub struct SourceArbiter {
    extractors: Vec<Arc<dyn SourceExtractor>>,
    breakers: Arc<CircuitBreakers>,
    vocabulary: Arc<GenreVocabulary>,
    /// Results below this confidence are passed over
    acceptance: f32,
}

impl SourceArbiter {
    /// Extractors are sorted into source priority order
    pub fn new(
        mut extractors: Vec<Arc<dyn SourceExtractor>>,
        breakers: Arc<CircuitBreakers>,
        vocabulary: Arc<GenreVocabulary>,
    ) -> Self {
        extractors.sort_by_key(|e| e.source().priority());
        Self {
            extractors,
            breakers,
            vocabulary,
            acceptance: 0.0,
        }
    }

    /// Skip source results below `acceptance` and keep walking
    pub fn with_acceptance(mut self, acceptance: f32) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn acceptance(&self) -> f32 {
        self.acceptance
    }

    pub fn extractors(&self) -> &[Arc<dyn SourceExtractor>] {
        &self.extractors
    }

    /// Run every extractor with links and settle on one result
    ///
    /// Never fails; extractor errors are traced and skipped.
    pub async fn arbitrate(
        &self,
        links: &PlatformLinks,
        query: &SourceQuery,
        trace: &mut Trace,
    ) -> Option<SourceResult> {
        let contested = links.has(SourceId::Ridibooks) && links.has(SourceId::Munpia);

        let mut held: Option<SourceResult> = None;
        let mut pending: Option<SourceResult> = None;
        let mut fallback: Option<SourceResult> = None;

        for extractor in &self.extractors {
            let source = extractor.source();

            if self.breakers.is_open(Endpoint::Source(source)) {
                trace.record(TraceEvent::SourceSkipped {
                    source,
                    reason: SkipReason::CircuitOpen,
                });
                continue;
            }
            let urls = links.links(source);
            if urls.is_empty() {
                trace.record(TraceEvent::SourceSkipped {
                    source,
                    reason: SkipReason::NoLinks,
                });
                continue;
            }

            trace.record(TraceEvent::SourceTried {
                source,
                links: urls.len(),
            });
            let result = match extractor.extract_genre(urls, query).await {
                Ok(Some(result)) => result,
                Ok(None) => {
                    debug!(source = %source, "No evidence");
                    continue;
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "Source lookup failed");
                    trace.record(TraceEvent::SourceFailed {
                        source,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if genre::is_unclassified(&result.genre) || !self.vocabulary.is_valid(&result.genre) {
                debug!(source = %source, genre = %result.genre, "Discarding label outside whitelist");
                continue;
            }
            trace.record(TraceEvent::SourceMatched {
                source,
                genre: result.genre.clone(),
                raw_genre: result.raw_genre.clone(),
                confidence: result.confidence,
            });

            let result = self.remap(result, &query.title, trace);
            if result.confidence < self.acceptance {
                debug!(source = %source, confidence = result.confidence, "Below acceptance, trying later sources");
                trace.record(TraceEvent::BelowAcceptance {
                    source,
                    genre: result.genre,
                    confidence: result.confidence,
                });
                continue;
            }

            // 리디북스 waits for 문피아 when both are available
            if contested && source == SourceId::Ridibooks {
                held = Some(result);
                continue;
            }
            if source == SourceId::Munpia {
                if let Some(ridibooks) = held.take() {
                    return Some(settle_head_to_head(ridibooks, result, trace));
                }
            }

            if let Some(current) = &pending {
                if specificity(&result.genre) > specificity(&current.genre) {
                    trace.record(TraceEvent::CompetingLabel {
                        source,
                        genre: result.genre.clone(),
                        replaced: current.genre.clone(),
                    });
                    return Some(result);
                }
                trace.record(TraceEvent::SourceSuppressed {
                    source,
                    genre: result.genre,
                    kept: current.genre.clone(),
                });
                continue;
            }

            if let Some(kept) = held.as_ref().filter(|h| h.genre != genre::GENERAL_NOVEL) {
                if specificity(&result.genre) <= specificity(&kept.genre) {
                    trace.record(TraceEvent::SourceSuppressed {
                        source,
                        genre: result.genre,
                        kept: kept.genre.clone(),
                    });
                    continue;
                }
                trace.record(TraceEvent::CompetingLabel {
                    source,
                    genre: result.genre.clone(),
                    replaced: kept.genre.clone(),
                });
                return Some(result);
            }

            if result.needs_refinement && held.is_none() {
                debug!(source = %source, genre = %result.genre, "Holding result pending refinement");
                pending = Some(result);
                continue;
            }

            if result.genre == genre::GENERAL_NOVEL {
                if fallback.is_none() {
                    fallback = Some(result);
                }
                continue;
            }

            return Some(result);
        }

        if let Some(result) = held.or(pending) {
            return Some(result);
        }
        fallback.map(|result| {
            trace.record(TraceEvent::FallbackUsed {
                source: Provenance::Source(result.source),
                genre: result.genre.clone(),
            });
            result
        })
    }

    fn remap(&self, result: SourceResult, title: &str, trace: &mut Trace) -> SourceResult {
        let Some(remap) = remap_by_title(&result.genre, title) else {
            return result;
        };
        if !self.vocabulary.is_valid(remap.genre) {
            return result;
        }
        trace.record(TraceEvent::Remapped {
            source: result.source,
            from: result.genre.clone(),
            to: remap.genre.to_string(),
            keywords: remap.keywords.iter().map(|k| k.to_string()).collect(),
        });
        SourceResult::new(
            remap.genre,
            (result.confidence - REMAP_PENALTY).max(REMAP_MIN_CONFIDENCE),
            result.source,
            result.raw_genre,
            result.url,
        )
    }
}

/// 리디북스 keeps its label unless 문피아 names a strictly more specific one
fn settle_head_to_head(
    ridibooks: SourceResult,
    munpia: SourceResult,
    trace: &mut Trace,
) -> SourceResult {
    if munpia.genre != ridibooks.genre
        && specificity(&munpia.genre) > specificity(&ridibooks.genre)
    {
        trace.record(TraceEvent::CompetingLabel {
            source: munpia.source,
            genre: munpia.genre.clone(),
            replaced: ridibooks.genre.clone(),
        });
        return munpia;
    }
    if munpia.genre != ridibooks.genre {
        trace.record(TraceEvent::SourceSuppressed {
            source: munpia.source,
            genre: munpia.genre,
            kept: ridibooks.genre.clone(),
        });
    }
    ridibooks
}
