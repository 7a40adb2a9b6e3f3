//! Core Types and Trait Definitions
//!
//! Shared data model for the source-lookup layer:
//! - [`SourceId`]: the 12 external platforms, in lookup priority order
//! - [`SourceQuery`]: the identity being looked up
//! - [`SourceResult`]: one platform's genre evidence
//! - [`ClassificationResult`]: the final decision and its [`Provenance`]
//! - [`SourceExtractor`]: the contract every platform implements

use crate::fetch::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use wnc_common::genre;
use wnc_common::ConfidenceTier;

// ============================================================================
// Sources
// ============================================================================

/// External genre source
///
/// Variant order is lookup priority: most taxonomy-specific and most
/// reliable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Ridibooks,
    Munpia,
    NaverSeries,
    KakaoPage,
    Novelnet,
    Novelpia,
    Joara,
    Webtoonguide,
    Mrblue,
    Kyobo,
    Yes24,
    Aladin,
}

impl SourceId {
    /// All sources in priority order
    pub const ALL: [SourceId; 12] = [
        SourceId::Ridibooks,
        SourceId::Munpia,
        SourceId::NaverSeries,
        SourceId::KakaoPage,
        SourceId::Novelnet,
        SourceId::Novelpia,
        SourceId::Joara,
        SourceId::Webtoonguide,
        SourceId::Mrblue,
        SourceId::Kyobo,
        SourceId::Yes24,
        SourceId::Aladin,
    ];

    /// Stable identifier used in logs, cache entries and config
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Ridibooks => "ridibooks",
            SourceId::Munpia => "munpia",
            SourceId::NaverSeries => "naver_series",
            SourceId::KakaoPage => "kakao_page",
            SourceId::Novelnet => "novelnet",
            SourceId::Novelpia => "novelpia",
            SourceId::Joara => "joara",
            SourceId::Webtoonguide => "webtoonguide",
            SourceId::Mrblue => "mrblue",
            SourceId::Kyobo => "kyobo",
            SourceId::Yes24 => "yes24",
            SourceId::Aladin => "aladin",
        }
    }

    /// Platform name as shown to users
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Ridibooks => "리디북스",
            SourceId::Munpia => "문피아",
            SourceId::NaverSeries => "네이버시리즈",
            SourceId::KakaoPage => "카카오페이지",
            SourceId::Novelnet => "소설넷",
            SourceId::Novelpia => "노벨피아",
            SourceId::Joara => "조아라",
            SourceId::Webtoonguide => "웹툰가이드",
            SourceId::Mrblue => "미스터블루",
            SourceId::Kyobo => "교보문고",
            SourceId::Yes24 => "예스24",
            SourceId::Aladin => "알라딘",
        }
    }

    /// Lookup priority (1 = first)
    pub fn priority(&self) -> u8 {
        *self as u8 + 1
    }

    /// Confidence baseline for a genre read from this source
    pub fn base_confidence(&self) -> f32 {
        match self {
            SourceId::Ridibooks => 0.95,
            SourceId::Munpia | SourceId::Novelpia => 0.92,
            SourceId::KakaoPage => 0.90,
            SourceId::NaverSeries | SourceId::Novelnet => 0.88,
            SourceId::Joara | SourceId::Mrblue | SourceId::Kyobo | SourceId::Aladin => 0.85,
            SourceId::Webtoonguide => 0.75,
            SourceId::Yes24 => 0.70,
        }
    }

    /// Maximum candidate pages fetched per lookup
    pub fn page_limit(&self, configured: usize) -> usize {
        match self {
            SourceId::Joara => configured.min(2),
            _ => configured,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Query and result
// ============================================================================

/// Identity being looked up on a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    /// Work title as parsed from the filename
    pub title: String,
    /// Known author, if any (comma-separated for several)
    pub author: Option<String>,
}

impl SourceQuery {
    pub fn new(title: impl Into<String>, author: Option<String>) -> Self {
        Self {
            title: title.into(),
            author: author.filter(|a| !a.trim().is_empty()),
        }
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

/// Genre evidence from one source
///
/// `genre` is canonical or [`wnc_common::genre::UNCLASSIFIED`]; the arbiter
/// discards anything outside the whitelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Canonical genre label
    pub genre: String,
    /// Confidence baseline (0.0-1.0)
    pub confidence: f32,
    /// Source that produced the evidence
    pub source: SourceId,
    /// Genre text exactly as the page showed it
    pub raw_genre: String,
    /// Page the evidence came from
    pub url: String,
    /// Source label is coarser than the canonical taxonomy
    pub needs_refinement: bool,
}

impl SourceResult {
    /// Build a result, deriving `needs_refinement` from the refinement table
    pub fn new(
        genre: impl Into<String>,
        confidence: f32,
        source: SourceId,
        raw_genre: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let genre = genre.into();
        let needs_refinement = crate::orchestrator::refine::refinement_mode(source, &genre).is_some();
        Self {
            genre,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            raw_genre: raw_genre.into(),
            url: url.into(),
            needs_refinement,
        }
    }
}

// ============================================================================
// Classification result
// ============================================================================

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Provenance {
    /// Bracketed genre tag in the filename
    Tag,
    /// External platform page
    Source(SourceId),
    /// Hand-maintained title → genre table
    SpecialCase,
    /// Characteristic title keyword
    TitleKeyword,
    /// Weighted keyword classifier
    Keyword,
    /// Author registry hint
    Author,
    /// Nothing resolved
    None,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Tag => "tag",
            Provenance::Source(id) => id.as_str(),
            Provenance::SpecialCase => "special_case",
            Provenance::TitleKeyword => "title_keyword",
            Provenance::Keyword => "keyword",
            Provenance::Author => "author",
            Provenance::None => "none",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.as_str().to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let fixed = match value.as_str() {
            "tag" => Some(Provenance::Tag),
            "special_case" => Some(Provenance::SpecialCase),
            "title_keyword" => Some(Provenance::TitleKeyword),
            "keyword" => Some(Provenance::Keyword),
            "author" => Some(Provenance::Author),
            "none" => Some(Provenance::None),
            _ => None,
        };
        fixed
            .or_else(|| {
                SourceId::ALL
                    .into_iter()
                    .find(|id| id.as_str() == value)
                    .map(Provenance::Source)
            })
            .ok_or_else(|| format!("Unknown provenance: {}", value))
    }
}

/// Final genre decision for one work
///
/// `genre == 미분류` implies a tier of `low` or `none`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Canonical genre or 미분류
    pub genre: String,
    pub confidence: ConfidenceTier,
    pub source: Provenance,
    /// Numeric confidence behind the tier (0.0-1.0)
    pub score: f32,
    /// Human-readable justification trail
    pub evidence: Vec<String>,
}

impl ClassificationResult {
    pub fn new(
        genre: impl Into<String>,
        confidence: ConfidenceTier,
        source: Provenance,
        score: f32,
        evidence: Vec<String>,
    ) -> Self {
        let genre = genre.into();
        // Unclassified can never carry more than low confidence
        let confidence = if genre::is_unclassified(&genre) && confidence > ConfidenceTier::Low {
            ConfidenceTier::Low
        } else {
            confidence
        };
        Self {
            genre,
            confidence,
            source,
            score: score.clamp(0.0, 1.0),
            evidence,
        }
    }

    /// Terminal "nothing found" result
    pub fn unclassified(confidence: ConfidenceTier, evidence: Vec<String>) -> Self {
        Self::new(genre::UNCLASSIFIED, confidence, Provenance::None, 0.0, evidence)
    }

    pub fn is_unclassified(&self) -> bool {
        genre::is_unclassified(&self.genre)
    }
}

// ============================================================================
// Source Extractor Trait
// ============================================================================

/// Source extractor contract
///
/// One implementation per platform, collected into an ordered list and
/// iterated by [`crate::sources::arbiter`].
///
/// # Example
/// ```rust,ignore
/// let query = SourceQuery::new("화산귀환", Some("비가".into()));
/// if let Some(result) = extractor.extract_genre(&urls, &query).await? {
///     println!("{} → {}", result.raw_genre, result.genre);
/// }
/// ```
#[async_trait::async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Source this extractor reads
    fn source(&self) -> SourceId;

    /// Confidence baseline for this source (0.0-1.0)
    fn base_confidence(&self) -> f32 {
        self.source().base_confidence()
    }

    /// Extract a genre from candidate pages
    ///
    /// # Arguments
    /// * `urls` - Candidate page URLs for this source, best first
    /// * `query` - Title and optional author to confirm identity against
    ///
    /// # Returns
    /// `Some` with the first genre signal from a page whose title matches,
    /// `None` when no page matched or none carried a signal
    ///
    /// # Errors
    /// Returns `ExtractionError` when the source itself is unusable
    /// (quota exhausted, circuit open). Single-page failures are skipped.
    async fn extract_genre(
        &self,
        urls: &[String],
        query: &SourceQuery,
    ) -> Result<Option<SourceResult>, ExtractionError>;
}

/// Extraction error
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Source returned an error response
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse a page
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source disabled or unreachable for this run
    #[error("Source not available: {0}")]
    NotAvailable(String),

    /// Source signalled quota exhaustion
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FetchError> for ExtractionError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(url) => ExtractionError::Network(format!("timeout: {}", url)),
            FetchError::Network(msg) => ExtractionError::Network(msg),
            FetchError::Status(code) => ExtractionError::Api(format!("HTTP {}", code)),
            FetchError::QuotaExceeded(code) => {
                ExtractionError::QuotaExceeded(format!("HTTP {}", code))
            }
            FetchError::CircuitOpen(name) => ExtractionError::NotAvailable(name),
            FetchError::Body(msg) => ExtractionError::Parse(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_follows_declaration_order() {
        let priorities: Vec<u8> = SourceId::ALL.iter().map(|s| s.priority()).collect();
        assert_eq!(priorities, (1..=12).collect::<Vec<u8>>());
        assert_eq!(SourceId::Ridibooks.priority(), 1);
        assert_eq!(SourceId::Aladin.priority(), 12);
    }

    #[test]
    fn test_page_limit() {
        assert_eq!(SourceId::Joara.page_limit(3), 2);
        assert_eq!(SourceId::Ridibooks.page_limit(3), 3);
    }

    #[test]
    fn test_refinement_flag_derived() {
        let result = SourceResult::new("판타지", 0.88, SourceId::NaverSeries, "판타지", "u");
        assert!(result.needs_refinement);

        let result = SourceResult::new("판타지", 0.92, SourceId::Munpia, "판타지", "u");
        assert!(!result.needs_refinement);

        let result = SourceResult::new("현판", 0.95, SourceId::Ridibooks, "현대판타지", "u");
        assert!(result.needs_refinement);
    }

    #[test]
    fn test_provenance_serializes_flat() {
        let json = serde_json::to_string(&Provenance::Source(SourceId::KakaoPage)).unwrap();
        assert_eq!(json, "\"kakao_page\"");

        let parsed: Provenance = serde_json::from_str("\"title_keyword\"").unwrap();
        assert_eq!(parsed, Provenance::TitleKeyword);
        assert!(serde_json::from_str::<Provenance>("\"nowhere\"").is_err());
    }

    #[test]
    fn test_unclassified_never_high() {
        let result = ClassificationResult::new(
            genre::UNCLASSIFIED,
            ConfidenceTier::High,
            Provenance::None,
            0.9,
            Vec::new(),
        );
        assert_eq!(result.confidence, ConfidenceTier::Low);
        assert!(result.is_unclassified());
    }

    #[test]
    fn test_quota_error_converts() {
        let err: ExtractionError = FetchError::QuotaExceeded(429).into();
        assert!(matches!(err, ExtractionError::QuotaExceeded(_)));
    }
}
