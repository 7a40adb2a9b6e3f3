//! Weighted keyword scorer

use super::table::KeywordTable;
use serde::Serialize;
use std::collections::HashMap;
use wnc_common::genre::UNCLASSIFIED;

/// Bonus for a matched compound pattern, on top of the pattern's own value
const COMPOUND_MATCH_BONUS: u32 = 8;

/// Cap on the top-vs-runner-up gap bonus
const MAX_GAP_BONUS: f64 = 0.3;

/// Keywords shorter than this never score
const MIN_KEYWORD_CHARS: usize = 2;

/// One genre's score for a text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreScore {
    pub genre: String,
    /// Raw score divided by the square root of the genre's table size
    pub score: f64,
    /// Matched keywords with their contribution, e.g. `천마(15)`
    pub matched: Vec<String>,
}

/// Top genre plus the ranking it was drawn from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordVerdict {
    /// Top genre, or 미분류 when nothing scored
    pub genre: String,
    /// 0.0-1.0
    pub confidence: f32,
    pub score: f64,
    pub ranked: Vec<GenreScore>,
}

impl KeywordVerdict {
    fn empty() -> Self {
        Self {
            genre: UNCLASSIFIED.to_string(),
            confidence: 0.0,
            score: 0.0,
            ranked: Vec::new(),
        }
    }

    pub fn is_unclassified(&self) -> bool {
        self.genre == UNCLASSIFIED
    }

    /// Matched keywords of the top genre
    pub fn matched(&self) -> &[String] {
        self.ranked.first().map(|g| g.matched.as_slice()).unwrap_or(&[])
    }
}

/// Prepared per-genre keyword list
#[derive(Debug, Clone)]
struct GenreKeywords {
    genre: String,
    /// `(lowercased keyword, weight)`, longest first
    keywords: Vec<(String, u32)>,
    table_size: usize,
}

/// Lexical genre classifier
///
/// Built once from a [`KeywordTable`]; classification is read-only and can
/// be shared across workers.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    table: KeywordTable,
    genres: Vec<GenreKeywords>,
    /// Lowercased keyword → number of genre tables containing it
    keyword_spread: HashMap<String, usize>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(KeywordTable::builtin())
    }
}

impl KeywordClassifier {
    pub fn new(table: KeywordTable) -> Self {
        let mut keyword_spread: HashMap<String, usize> = HashMap::new();
        let genres = table
            .single_keywords
            .iter()
            .map(|(genre, weights)| {
                let mut keywords: Vec<(String, u32)> =
                    weights.iter().map(|(k, w)| (k.to_lowercase(), *w)).collect();
                keywords.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
                keywords.dedup_by(|a, b| a.0 == b.0);
                for (keyword, _) in &keywords {
                    *keyword_spread.entry(keyword.clone()).or_insert(0) += 1;
                }
                GenreKeywords {
                    genre: genre.clone(),
                    table_size: keywords.len(),
                    keywords,
                }
            })
            .collect();

        Self {
            table,
            genres,
            keyword_spread,
        }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Bonus for keywords appearing in few genre tables
    fn specificity_bonus(&self, keyword: &str) -> u32 {
        match self.keyword_spread.get(keyword).copied().unwrap_or(0) {
            1 => 5,
            2 => 3,
            3 => 2,
            _ => 0,
        }
    }

    fn is_excluded(&self, keyword: &str, text: &str) -> bool {
        self.table
            .exclusions
            .iter()
            .filter(|(word, _)| word.to_lowercase() == keyword)
            .flat_map(|(_, longer)| longer.iter())
            .any(|longer| text.contains(&longer.to_lowercase()))
    }

    fn score_genre(&self, genre: &GenreKeywords, text: &str) -> GenreScore {
        let mut raw: u32 = 0;
        let mut matched = Vec::new();
        // Matched spans are blanked out, so "성기사" claims its own text
        // before "기사" is tried; a separate "기사" elsewhere still counts
        let mut remaining = text.to_string();

        for (keyword, weight) in &genre.keywords {
            if keyword.chars().count() < MIN_KEYWORD_CHARS || !remaining.contains(keyword.as_str()) {
                continue;
            }
            if self.is_excluded(keyword, text) {
                continue;
            }
            remaining = remaining.replace(keyword.as_str(), " ");
            let points = weight + self.specificity_bonus(keyword);
            raw += points;
            matched.push(format!("{}({})", keyword, points));
        }

        if let Some(patterns) = self.table.compound_patterns.get(&genre.genre) {
            for pattern in patterns {
                let first = pattern.first().to_lowercase();
                let second = pattern.second().to_lowercase();
                if text.contains(&first) && text.contains(&second) {
                    let points = COMPOUND_MATCH_BONUS + pattern.bonus();
                    raw += points;
                    matched.push(format!("{}+{}({})", first, second, points));
                }
            }
        }

        let score = if genre.table_size > 0 {
            raw as f64 / (genre.table_size as f64).sqrt()
        } else {
            raw as f64
        };

        GenreScore {
            genre: genre.genre.clone(),
            score,
            matched,
        }
    }

    /// Rank genres for `text`, highest first; only positive scores
    pub fn classify(&self, text: &str) -> Vec<GenreScore> {
        let text = text.to_lowercase();
        let mut ranked: Vec<GenreScore> = self
            .genres
            .iter()
            .map(|genre| self.score_genre(genre, &text))
            .filter(|s| s.score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Top genre with a confidence
    ///
    /// Confidence is the top share of all scores plus a gap bonus over the
    /// runner-up, capped at 1.0. A lone scoring genre gets 1.0.
    pub fn classify_with_confidence(&self, text: &str) -> KeywordVerdict {
        let ranked = self.classify(text);
        let Some(top) = ranked.first() else {
            return KeywordVerdict::empty();
        };

        let confidence = match ranked.get(1) {
            None => 1.0,
            Some(runner_up) => {
                let total: f64 = ranked.iter().map(|s| s.score).sum();
                let share = top.score / total;
                let gap_bonus = ((top.score - runner_up.score).abs() / top.score).min(MAX_GAP_BONUS);
                (share + gap_bonus).min(1.0)
            }
        };

        KeywordVerdict {
            genre: top.genre.clone(),
            confidence: confidence as f32,
            score: top.score,
            ranked,
        }
    }

    /// Validation keywords for `genre` found in `title`
    pub fn validation_matches(&self, genre: &str, title: &str) -> Vec<String> {
        let title = title.to_lowercase();
        self.table
            .validation_keywords(genre)
            .iter()
            .filter(|k| title.contains(&k.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Whether `genre` has a validation list at all
    pub fn has_validation(&self, genre: &str) -> bool {
        !self.table.validation_keywords(genre).is_empty()
    }

    /// Special-case title contained in `title`, with its genre
    ///
    /// Longest special-case title wins.
    pub fn special_case(&self, title: &str) -> Option<(&str, &str)> {
        self.table
            .special_cases
            .iter()
            .filter(|(special, _)| !special.is_empty() && title.contains(special.as_str()))
            .max_by_key(|(special, _)| special.chars().count())
            .map(|(special, genre)| (special.as_str(), genre.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::table::CompoundPattern;
    use std::collections::BTreeMap;
    use wnc_common::genre;

    fn table(entries: &[(&str, &[(&str, u32)])]) -> KeywordTable {
        let mut table = KeywordTable::builtin();
        table.single_keywords = entries
            .iter()
            .map(|(g, kws)| {
                let weights: BTreeMap<String, u32> =
                    kws.iter().map(|(k, w)| (k.to_string(), *w)).collect();
                (g.to_string(), weights)
            })
            .collect();
        table.compound_patterns = BTreeMap::new();
        table
    }

    #[test]
    fn test_martial_arts_title() {
        let classifier = KeywordClassifier::default();
        let verdict = classifier.classify_with_confidence("남궁세가 망나니는 천마의 제자였다");
        assert_eq!(verdict.genre, genre::MARTIAL_ARTS);
        assert!(verdict.confidence > 0.5);
    }

    #[test]
    fn test_nothing_matches_is_unclassified() {
        let classifier = KeywordClassifier::default();
        let verdict = classifier.classify_with_confidence("zzz");
        assert!(verdict.is_unclassified());
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.ranked.is_empty());
    }

    #[test]
    fn test_longer_keyword_subsumes_shorter() {
        let classifier = KeywordClassifier::new(table(&[("판타지", &[("성기사", 8), ("기사", 7)])]));
        let ranked = classifier.classify("성기사의 귀환");
        assert_eq!(ranked[0].matched.len(), 1);
        assert!(ranked[0].matched[0].starts_with("성기사"));
    }

    #[test]
    fn test_shorter_keyword_elsewhere_still_counts() {
        let classifier = KeywordClassifier::new(table(&[("판타지", &[("성기사", 8), ("기사", 7)])]));

        let ranked = classifier.classify("성기사와 흑기사");

        assert_eq!(ranked[0].matched.len(), 2);
        assert!(ranked[0].matched.iter().any(|m| m.starts_with("기사")));
    }

    #[test]
    fn test_single_char_keywords_ignored() {
        let classifier = KeywordClassifier::new(table(&[("로판", &[("공", 10), ("수", 10)])]));
        assert!(classifier.classify("공작가의 수호자").is_empty());
    }

    #[test]
    fn test_exclusion_suppresses_keyword() {
        let classifier = KeywordClassifier::new(table(&[
            ("무협", &[("무공", 9)]),
            ("역사", &[("충무공", 10)]),
        ]));
        let ranked = classifier.classify("충무공 이순신");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].genre, "역사");
    }

    #[test]
    fn test_specificity_bonus_and_normalization() {
        // One table of four keywords: "천마" is unique, so 10 + 5 = 15, / sqrt(4)
        let classifier = KeywordClassifier::new(table(&[(
            "무협",
            &[("천마", 10), ("무림", 10), ("강호", 10), ("검황", 10)],
        )]));
        let ranked = classifier.classify("천마");
        assert!((ranked[0].score - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_compound_pattern_bonus() {
        let mut t = table(&[("무협", &[("무림", 10)])]);
        t.compound_patterns.insert(
            "무협".to_string(),
            vec![CompoundPattern("무림".into(), "회귀".into(), 20)],
        );
        let classifier = KeywordClassifier::new(t);
        let ranked = classifier.classify("무림 회귀");
        // (10 + 5) + (8 + 20), table size 1
        assert!((ranked[0].score - 43.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_with_runner_up() {
        let classifier = KeywordClassifier::new(table(&[
            ("무협", &[("천마", 10)]),
            ("현판", &[("헌터", 5)]),
        ]));
        let verdict = classifier.classify_with_confidence("천마 헌터");
        // scores 15 and 10: share 0.6, gap bonus min(5/15, 0.3) = 0.3
        assert_eq!(verdict.genre, "무협");
        assert!((verdict.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_special_case_and_validation() {
        let classifier = KeywordClassifier::default();
        assert_eq!(classifier.special_case("화산귀환 1-1500 완"), Some(("화산귀환", "무협")));
        assert!(classifier.special_case("전혀 다른 제목").is_none());

        let matches = classifier.validation_matches(genre::FUSION_FANTASY, "회귀한 마법사의 환생");
        assert!(matches.contains(&"회귀".to_string()));
        assert!(classifier.has_validation(genre::GAME_FANTASY));
        assert!(!classifier.has_validation(genre::PARODY));
    }
}
