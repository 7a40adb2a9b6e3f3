//! Refinement of coarse source labels
//!
//! Some platforms file several canonical genres under one label (네이버시리즈
//! "판타지" covers 퓨판/겜판/역사, its "현판" covers 스포츠). The keyword
//! classifier proposes a finer label from the title; the proposal is only
//! taken when it clears a confidence bar and, for most labels, a title
//! validation keyword.

use super::trace::{Trace, TraceEvent};
use crate::keywords::KeywordClassifier;
use crate::types::{SourceId, SourceResult};
use serde::Serialize;
use std::fmt;
use tracing::debug;
use wnc_common::genre;

/// Bonus added to the keyword confidence when 현판 becomes 스포츠
const SPORTS_BONUS: f32 = 0.1;
/// Default acceptance bar for a refined label
const REFINE_MIN_CONFIDENCE: f32 = 0.70;
/// Bar for 퓨판, the usual home of off-list fantasy titles
const FUSION_MIN_CONFIDENCE: f32 = 0.60;
/// Bar for keeping plain 판타지
const FANTASY_MIN_CONFIDENCE: f32 = 0.50;
/// Labels without a validation list need this much keyword confidence
const UNVALIDATED_MIN_CONFIDENCE: f32 = 0.80;

/// How a coarse label may be refined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementMode {
    /// 현판 that may really be 스포츠
    HyunpanSports,
    /// 판타지 that may be 퓨판, 겜판 or 역사
    FantasyFull,
    /// 리디북스 퓨판 that may be 겜판 or 역사
    FusionGameHistory,
}

impl RefinementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefinementMode::HyunpanSports => "hyunpan_sports",
            RefinementMode::FantasyFull => "fantasy_full",
            RefinementMode::FusionGameHistory => "fusion_game_history",
        }
    }

    /// Labels the refined result may take
    pub fn allowed(&self) -> &'static [&'static str] {
        match self {
            RefinementMode::HyunpanSports => &[genre::SPORTS, genre::MODERN_FANTASY],
            RefinementMode::FantasyFull => &[
                genre::FUSION_FANTASY,
                genre::GAME_FANTASY,
                genre::HISTORY,
                genre::FANTASY,
            ],
            RefinementMode::FusionGameHistory => {
                &[genre::GAME_FANTASY, genre::HISTORY, genre::FUSION_FANTASY]
            }
        }
    }
}

impl fmt::Display for RefinementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refinement table: which (source, label) pairs are coarser than the
/// canonical taxonomy
pub fn refinement_mode(source: SourceId, label: &str) -> Option<RefinementMode> {
    match (source, label) {
        (SourceId::NaverSeries | SourceId::KakaoPage, genre::FANTASY) => {
            Some(RefinementMode::FantasyFull)
        }
        (
            SourceId::NaverSeries | SourceId::KakaoPage | SourceId::Ridibooks,
            genre::MODERN_FANTASY,
        ) => Some(RefinementMode::HyunpanSports),
        (SourceId::Ridibooks, genre::FUSION_FANTASY) => Some(RefinementMode::FusionGameHistory),
        _ => None,
    }
}

/// Label and confidence after refinement
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    pub genre: String,
    pub confidence: f32,
    /// Label differs from the source's
    pub changed: bool,
}

impl Refinement {
    fn kept(result: &SourceResult) -> Self {
        Self {
            genre: result.genre.clone(),
            confidence: result.confidence,
            changed: false,
        }
    }
}

/// Refine `result` against `title`
///
/// Results that need no refinement come back unchanged. A rejected
/// proposal keeps the source label at the source confidence.
pub fn refine(
    result: &SourceResult,
    title: &str,
    keywords: &KeywordClassifier,
    trace: &mut Trace,
) -> Refinement {
    let Some(mode) = refinement_mode(result.source, &result.genre) else {
        return Refinement::kept(result);
    };

    match propose(mode, result, title, keywords) {
        Ok((genre, confidence)) if genre != result.genre => {
            trace.record(TraceEvent::RefinementApplied {
                from: result.genre.clone(),
                to: genre.clone(),
                mode: mode.to_string(),
            });
            Refinement {
                genre,
                confidence,
                changed: true,
            }
        }
        Ok(_) => {
            debug!(genre = %result.genre, mode = %mode, "Keywords agree with source label");
            Refinement::kept(result)
        }
        Err(reason) => {
            trace.record(TraceEvent::RefinementRejected {
                genre: result.genre.clone(),
                mode: mode.to_string(),
                reason,
            });
            Refinement::kept(result)
        }
    }
}

/// Proposed `(label, confidence)` or the reason there is none
fn propose(
    mode: RefinementMode,
    result: &SourceResult,
    title: &str,
    keywords: &KeywordClassifier,
) -> Result<(String, f32), String> {
    let verdict = keywords.classify_with_confidence(title);
    if verdict.is_unclassified() {
        return Err("no keyword evidence in title".to_string());
    }
    let top = verdict.genre.as_str();
    let kw = verdict.confidence;
    let src = result.confidence;

    match mode {
        RefinementMode::HyunpanSports => {
            if top == genre::SPORTS && kw >= REFINE_MIN_CONFIDENCE {
                Ok((top.to_string(), src.min(kw + SPORTS_BONUS)))
            } else {
                Err(format!("keyword top {} ({:.2}) is not a confident 스포츠", top, kw))
            }
        }

        RefinementMode::FantasyFull => {
            if top == genre::MODERN_FANTASY {
                return Ok((genre::FUSION_FANTASY.to_string(), src.min(kw)));
            }
            if !mode.allowed().contains(&top) {
                return if kw >= FUSION_MIN_CONFIDENCE {
                    Ok((genre::FUSION_FANTASY.to_string(), src.min(kw)))
                } else {
                    Err(format!("keyword top {} ({:.2}) outside allowed set", top, kw))
                };
            }

            let bar = match top {
                genre::FUSION_FANTASY => FUSION_MIN_CONFIDENCE,
                genre::FANTASY => FANTASY_MIN_CONFIDENCE,
                _ => REFINE_MIN_CONFIDENCE,
            };
            if kw < bar {
                return Err(format!("{} confidence {:.2} below {:.2}", top, kw, bar));
            }
            validate(top, title, kw, keywords)?;
            Ok((top.to_string(), src.min(kw)))
        }

        RefinementMode::FusionGameHistory => {
            if !matches!(top, genre::GAME_FANTASY | genre::HISTORY) {
                return Err(format!("keyword top {} is neither 겜판 nor 역사", top));
            }
            if kw < REFINE_MIN_CONFIDENCE {
                return Err(format!("{} confidence {:.2} below {:.2}", top, kw, REFINE_MIN_CONFIDENCE));
            }
            validate(top, title, kw, keywords)?;
            Ok((top.to_string(), src.min(kw)))
        }
    }
}

/// Title-level evidence for a proposed label
fn validate(label: &str, title: &str, confidence: f32, keywords: &KeywordClassifier) -> Result<(), String> {
    if label == genre::FANTASY {
        return Ok(());
    }
    if !keywords.has_validation(label) {
        return if confidence >= UNVALIDATED_MIN_CONFIDENCE {
            Ok(())
        } else {
            Err(format!("{} has no validation list and confidence {:.2}", label, confidence))
        };
    }
    if keywords.validation_matches(label, title).is_empty() {
        Err(format!("no {} validation keyword in title", label))
    } else {
        Ok(())
    }
}
