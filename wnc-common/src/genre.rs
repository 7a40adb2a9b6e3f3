//! Canonical genre labels and confidence tiers
//!
//! The classifier never invents labels: every resolved genre is one of the
//! constants below or [`UNCLASSIFIED`].

use serde::{Deserialize, Serialize};
use std::fmt;

pub const FANTASY: &str = "판타지";
pub const FUSION_FANTASY: &str = "퓨판";
pub const MODERN_FANTASY: &str = "현판";
pub const GAME_FANTASY: &str = "겜판";
pub const MARTIAL_ARTS: &str = "무협";
pub const XIANXIA: &str = "선협";
pub const ROMANCE_FANTASY: &str = "로판";
pub const SPORTS: &str = "스포츠";
pub const HISTORY: &str = "역사";
pub const SCI_FI: &str = "SF";
pub const YANQING: &str = "언정";
pub const GENERAL_NOVEL: &str = "소설";
pub const PARODY: &str = "패러디";

/// Explicit "no genre" value
pub const UNCLASSIFIED: &str = "미분류";

/// Default canonical whitelist, in display order
pub const CANONICAL_GENRES: &[&str] = &[
    MODERN_FANTASY,
    FUSION_FANTASY,
    MARTIAL_ARTS,
    ROMANCE_FANTASY,
    GAME_FANTASY,
    FANTASY,
    SCI_FI,
    HISTORY,
    XIANXIA,
    YANQING,
    SPORTS,
    GENERAL_NOVEL,
    PARODY,
    UNCLASSIFIED,
];

/// Taxonomy specificity of a genre label
///
/// Higher means more finely subdivided. Used to decide whether a later
/// source result may override an earlier one.
///
/// - 소설: 1 (generic bucket)
/// - 판타지: 2
/// - sub-genres: 3
/// - 역사, 스포츠: 4 (cut across the fantasy sub-genres)
pub fn specificity(genre: &str) -> u8 {
    match genre {
        GENERAL_NOVEL => 1,
        FANTASY => 2,
        MODERN_FANTASY | FUSION_FANTASY | GAME_FANTASY | MARTIAL_ARTS | XIANXIA
        | ROMANCE_FANTASY | YANQING | SCI_FI | PARODY => 3,
        HISTORY | SPORTS => 4,
        _ => 2,
    }
}

/// Returns true for the explicit unclassified label
pub fn is_unclassified(genre: &str) -> bool {
    genre.is_empty() || genre == UNCLASSIFIED
}

/// Confidence tier attached to a classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    None,
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::None => "none",
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        }
    }

    /// Whether a downstream confirmation step should be offered
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, ConfidenceTier::Medium)
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specificity_ordering() {
        assert!(specificity(GENERAL_NOVEL) < specificity(FANTASY));
        assert!(specificity(FANTASY) < specificity(MODERN_FANTASY));
        assert!(specificity(MODERN_FANTASY) < specificity(SPORTS));
        assert_eq!(specificity(HISTORY), specificity(SPORTS));
        assert_eq!(specificity("알수없음"), 2);
    }

    #[test]
    fn test_whitelist_contains_unclassified() {
        assert!(CANONICAL_GENRES.contains(&UNCLASSIFIED));
        assert!(is_unclassified(UNCLASSIFIED));
        assert!(is_unclassified(""));
        assert!(!is_unclassified(MARTIAL_ARTS));
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        let json = serde_json::to_string(&ConfidenceTier::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        let tier: ConfidenceTier = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(tier, ConfidenceTier::High);
        assert!(ConfidenceTier::Medium.needs_confirmation());
        assert!(!ConfidenceTier::High.needs_confirmation());
    }
}
