//! Genre Vocabulary Mapper
//!
//! Translates platform genre labels ("현대 판타지", "퓨전", "대체역사") into the
//! canonical set. Every output is either whitelisted or
//! [`UNCLASSIFIED`]; the mapper never invents labels.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};
use wnc_common::genre::{self, UNCLASSIFIED};
use wnc_common::{Error, Result};

/// Fuzzy threshold for typo-level label differences
const FUZZY_THRESHOLD: f64 = 0.85;

/// Built-in platform label → canonical genre
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("판타지", genre::FANTASY),
    ("정통판타지", genre::FANTASY),
    ("정통 판타지", genre::FANTASY),
    ("라이트노벨", genre::FANTASY),
    ("퓨전판타지", genre::FUSION_FANTASY),
    ("퓨전 판타지", genre::FUSION_FANTASY),
    ("퓨전물", genre::FUSION_FANTASY),
    ("퓨전", genre::FUSION_FANTASY),
    ("퓨판", genre::FUSION_FANTASY),
    ("현대판타지", genre::MODERN_FANTASY),
    ("현대 판타지", genre::MODERN_FANTASY),
    ("현대물", genre::MODERN_FANTASY),
    ("현대", genre::MODERN_FANTASY),
    ("현판", genre::MODERN_FANTASY),
    ("게임판타지", genre::GAME_FANTASY),
    ("게임 판타지", genre::GAME_FANTASY),
    ("게임", genre::GAME_FANTASY),
    ("겜판", genre::GAME_FANTASY),
    ("무협", genre::MARTIAL_ARTS),
    ("무협 소설", genre::MARTIAL_ARTS),
    ("전통 무협", genre::MARTIAL_ARTS),
    ("신무협", genre::MARTIAL_ARTS),
    ("선협", genre::XIANXIA),
    ("로맨스판타지", genre::ROMANCE_FANTASY),
    ("로맨스 판타지", genre::ROMANCE_FANTASY),
    ("로판", genre::ROMANCE_FANTASY),
    ("로맨스", genre::ROMANCE_FANTASY),
    ("BL", genre::ROMANCE_FANTASY),
    ("언정", genre::YANQING),
    ("SF", genre::SCI_FI),
    ("스포츠", genre::SPORTS),
    ("스포츠물", genre::SPORTS),
    ("역사", genre::HISTORY),
    ("역사물", genre::HISTORY),
    ("대체역사", genre::HISTORY),
    ("대체 역사물", genre::HISTORY),
    ("밀리터리", genre::HISTORY),
    ("전쟁 밀리터리", genre::HISTORY),
    ("소설", genre::GENERAL_NOVEL),
    ("해외 소설", genre::GENERAL_NOVEL),
    ("미스터리", genre::GENERAL_NOVEL),
    ("추리", genre::GENERAL_NOVEL),
    ("공포", genre::GENERAL_NOVEL),
    ("스릴러", genre::GENERAL_NOVEL),
    ("패러디", genre::PARODY),
    ("팬픽", genre::PARODY),
    ("팬픽션", genre::PARODY),
];

/// On-disk vocabulary (`genre_mapping.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
}

/// Platform label → canonical genre mapper
#[derive(Debug, Clone)]
pub struct GenreVocabulary {
    mappings: HashMap<String, String>,
    whitelist: Vec<String>,
    /// Mapping keys, longest first
    keys_by_length: Vec<String>,
}

impl Default for GenreVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl GenreVocabulary {
    pub fn new(mappings: HashMap<String, String>, whitelist: Vec<String>) -> Self {
        let mut keys_by_length: Vec<String> = mappings.keys().cloned().collect();
        keys_by_length.sort_by(|a, b| {
            b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b))
        });
        Self {
            mappings,
            whitelist,
            keys_by_length,
        }
    }

    /// Built-in mappings and the canonical whitelist
    pub fn builtin() -> Self {
        Self::new(
            DEFAULT_MAPPINGS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            genre::CANONICAL_GENRES.iter().map(|g| g.to_string()).collect(),
        )
    }

    /// Load from a JSON file; sections missing from the file keep defaults
    ///
    /// # Errors
    /// `NotFound` when the file is missing, `Json` when it does not parse
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("Vocabulary file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        let file: VocabularyFile = serde_json::from_str(&content)?;
        let builtin = Self::builtin();

        let mappings = file
            .mappings
            .map(|m| m.into_iter().collect())
            .unwrap_or(builtin.mappings);
        let whitelist = file.whitelist.unwrap_or(builtin.whitelist);

        info!(path = %path.display(), rules = mappings.len(), "Loaded genre vocabulary");
        Ok(Self::new(mappings, whitelist))
    }

    /// Load from `path`, falling back to built-in defaults on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::from_file(path) {
            Ok(vocabulary) => vocabulary,
            Err(Error::NotFound(_)) => {
                debug!(path = %path.display(), "No vocabulary file, using built-in mappings");
                Self::builtin()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed vocabulary file, using built-in mappings");
                Self::builtin()
            }
        }
    }

    /// Write the vocabulary as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = VocabularyFile {
            mappings: Some(self.mappings.clone().into_iter().collect()),
            whitelist: Some(self.whitelist.clone()),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Map a platform label, returning [`UNCLASSIFIED`] when nothing fits
    pub fn map_genre(&self, label: &str) -> String {
        self.map_known(label).unwrap_or_else(|| UNCLASSIFIED.to_string())
    }

    /// Map a platform label; `None` when it maps outside the whitelist
    ///
    /// Order: exact key, longest contained key, fuzzy key match.
    pub fn map_known(&self, label: &str) -> Option<String> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        // Direct match
        if let Some(mapped) = self.mappings.get(label) {
            return self.whitelisted(mapped);
        }

        // Longest key contained in the label
        if let Some(key) = self.keys_by_length.iter().find(|k| label.contains(k.as_str())) {
            if let Some(mapped) = self.mappings.get(key).and_then(|m| self.whitelisted(m)) {
                return Some(mapped);
            }
        }

        // Fuzzy match for typos
        for key in &self.keys_by_length {
            if strsim::normalized_levenshtein(label, key) > FUZZY_THRESHOLD {
                debug!(label = %label, key = %key, "Fuzzy matched genre label");
                return self.mappings.get(key).and_then(|m| self.whitelisted(m));
            }
        }

        None
    }

    /// Map only when `label` is exactly a vocabulary key
    pub fn map_exact(&self, label: &str) -> Option<String> {
        self.mappings.get(label.trim()).and_then(|m| self.whitelisted(m))
    }

    /// Longest vocabulary key found anywhere in `text`
    ///
    /// Returns `(key, canonical genre)`; keys mapping outside the whitelist
    /// are skipped.
    pub fn scan_text<'a>(&'a self, text: &str) -> Option<(&'a str, String)> {
        self.keys_by_length.iter().find_map(|key| {
            if !text.contains(key.as_str()) {
                return None;
            }
            let mapped = self.mappings.get(key).and_then(|m| self.whitelisted(m))?;
            Some((key.as_str(), mapped))
        })
    }

    fn whitelisted(&self, genre: &str) -> Option<String> {
        if genre::is_unclassified(genre) || !self.is_valid(genre) {
            None
        } else {
            Some(genre.to_string())
        }
    }

    /// Whether `genre` is in the whitelist
    pub fn is_valid(&self, genre: &str) -> bool {
        self.whitelist.iter().any(|g| g == genre)
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exact_mapping() {
        let vocabulary = GenreVocabulary::builtin();
        assert_eq!(vocabulary.map_genre("현대판타지"), "현판");
        assert_eq!(vocabulary.map_genre("퓨전 판타지"), "퓨판");
        assert_eq!(vocabulary.map_genre("대체역사"), "역사");
        assert_eq!(vocabulary.map_genre("팬픽"), "패러디");
    }

    #[test]
    fn test_longest_contained_key_wins() {
        let vocabulary = GenreVocabulary::builtin();
        // "판타지" and "게임" are both contained; "게임 판타지" is longer
        assert_eq!(vocabulary.map_genre("장르: 게임 판타지 웹소설"), "겜판");
        assert_eq!(vocabulary.map_genre("신무협 소설"), "무협");
    }

    #[test]
    fn test_unknown_label_unclassified() {
        let vocabulary = GenreVocabulary::builtin();
        assert_eq!(vocabulary.map_genre("요리"), UNCLASSIFIED);
        assert_eq!(vocabulary.map_genre(""), UNCLASSIFIED);
        assert!(vocabulary.map_known("   ").is_none());
    }

    #[test]
    fn test_whitelist_enforced() {
        let mut mappings = HashMap::new();
        mappings.insert("호러".to_string(), "공포".to_string());
        let vocabulary = GenreVocabulary::new(mappings, vec!["무협".to_string()]);
        assert_eq!(vocabulary.map_genre("호러"), UNCLASSIFIED);
    }

    #[test]
    fn test_scan_text_prefers_longest() {
        let vocabulary = GenreVocabulary::builtin();
        let (key, genre) = vocabulary.scan_text("장르 현대판타지 · 연재중").unwrap();
        assert_eq!(key, "현대판타지");
        assert_eq!(genre, "현판");
        assert!(vocabulary.scan_text("아무 내용 없음").is_none());
    }

    #[test]
    fn test_file_round_trip_and_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genre_mapping.json");
        std::fs::write(&path, r#"{"mappings": {"현대판타지": "현판"}}"#).unwrap();

        let loaded = GenreVocabulary::load_or_default(Some(&path));
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.map_genre("현대판타지"), "현판");
        assert!(loaded.is_valid("무협"));

        std::fs::write(&path, "{not json").unwrap();
        let fallback = GenreVocabulary::load_or_default(Some(&path));
        assert_eq!(fallback.len(), GenreVocabulary::builtin().len());
    }
}
