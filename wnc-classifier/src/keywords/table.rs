//! Keyword weight table (`genre_keywords.json`)
//!
//! Loaded once at startup. Any section the file omits falls back to the
//! built-in section; a missing or malformed file falls back entirely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use wnc_common::genre;
use wnc_common::{Error, Result};

const BUILTIN_VERSION: &str = "builtin-1";

// ============================================================================
// Built-in tables
// ============================================================================

const MODERN_FANTASY_KEYWORDS: &[(&str, u32)] = &[
    ("헌터", 10), ("게이트", 10), ("각성", 8), ("각성자", 8), ("S급", 7), ("A급", 5),
    ("길드", 8), ("협회", 9), ("레이드", 7), ("협회장", 10),
    ("아이돌", 10), ("작곡가", 10), ("연예인", 9), ("배우", 9), ("가수", 9),
    ("프로듀서", 8), ("매니저", 10), ("감독", 10), ("영화감독", 10), ("드라마감독", 10),
    ("애니메이션감독", 10), ("영화", 8), ("드라마", 8), ("애니메이션", 9), ("방송", 8),
    ("한의사", 10), ("의사", 8), ("변호사", 8), ("검사", 10), ("회계사", 10), ("교수", 10),
    ("도예가", 10), ("화가", 9), ("요리사", 8),
    ("재벌", 10), ("사장", 8), ("대표", 10), ("회사", 7), ("직장", 7), ("기업", 7),
    ("징수", 10), ("탐정", 8),
    ("현대", 9), ("도시", 7), ("서울", 7), ("편의점", 9), ("카페", 7), ("식당", 7),
    ("힐러", 7), ("서포터", 7), ("탱커", 7),
];

const FUSION_FANTASY_KEYWORDS: &[(&str, u32)] = &[
    ("귀환", 10), ("회귀", 10), ("환생", 9), ("빙의", 9), ("전생", 9), ("돌아왔다", 9),
    ("귀환한", 9), ("나 혼자", 7), ("혼자만", 9), ("독식", 9),
    ("시스템", 7), ("레벨업", 7), ("상태창", 8), ("스탯", 7), ("스킬", 6),
    ("이세계", 9), ("전이", 8), ("소환", 8),
    ("종말", 8), ("아포칼립스", 9), ("좀비", 9),
    ("힐러", 8), ("버퍼", 8), ("디버퍼", 8),
    ("소드마스터", 9), ("마도왕", 9), ("마신", 8), ("만렙", 7), ("최강", 6),
];

const MARTIAL_ARTS_KEYWORDS: &[(&str, u32)] = &[
    ("천마", 10), ("무림", 10), ("강호", 10), ("검황", 10), ("검성", 10), ("무공", 9),
    ("검법", 8), ("내공", 8), ("절세무공", 9), ("남궁세가", 10), ("제갈세가", 10),
    ("무당파", 9), ("소림", 9), ("화산파", 9), ("마교", 8), ("정파", 7), ("사파", 7),
    ("금의위", 7),
    ("화산", 10), ("무당", 10), ("아미", 9), ("곤륜", 9), ("청성", 9), ("종남", 9), ("개방", 9),
    ("남궁", 10), ("제갈", 10), ("사천당", 9), ("팽가", 9), ("백리", 9), ("황보", 9), ("모용", 9),
];

const ROMANCE_FANTASY_KEYWORDS: &[(&str, u32)] = &[
    ("악녀", 10), ("총애", 10), ("집착", 9), ("독점", 9), ("계약결혼", 10), ("정략결혼", 10),
    ("혼약", 9), ("사랑", 6), ("연애", 7),
    ("황제", 9), ("황후", 10), ("황태자", 9), ("공주", 9), ("공작", 9), ("후궁", 10),
    ("궁정", 10), ("귀족", 8), ("영애", 9), ("백작", 8),
    ("공", 10), ("수", 10), ("오메가버스", 10), ("알파", 8), ("오메가", 8),
    ("금리", 10), ("낭자", 10), ("공자", 8), ("소저", 9),
];

const FANTASY_KEYWORDS: &[(&str, u32)] = &[
    ("마법", 8), ("마법사", 9), ("대마법사", 10), ("마법학교", 9), ("마탑", 9), ("마력", 7),
    ("드래곤", 9), ("용", 8), ("던전", 6), ("몬스터", 6), ("마왕", 7), ("마물", 8),
    ("성기사", 8), ("기사", 7), ("검술", 7), ("왕국", 7), ("탑", 7), ("타워", 7),
    ("네크로맨서", 10), ("드루이드", 10), ("암살자", 8), ("용사", 8), ("용사파티", 9),
];

const GAME_FANTASY_KEYWORDS: &[(&str, u32)] = &[
    ("망겜", 10), ("갓겜", 10), ("게임", 7), ("VR", 10), ("MMORPG", 10), ("RPG", 9), ("MOBA", 9),
    ("NPC", 9), ("플레이어", 7), ("게이머", 7), ("캐릭터", 7), ("아바타", 8), ("접속", 8),
    ("힐러", 9), ("탱커", 9), ("딜러", 8), ("서포터", 8), ("야겜", 9), ("연애게임", 9),
];

const HISTORY_KEYWORDS: &[(&str, u32)] = &[
    ("조선", 10), ("고려", 10), ("삼국", 10), ("삼국지", 10), ("이성계", 10), ("연개소문", 10),
    ("황제", 7), ("왕", 7), ("세자", 8), ("왕세자", 9), ("대군", 8), ("태조", 9),
    ("단종", 10), ("영조", 10), ("정조", 10), ("세종", 10), ("태종", 10), ("고종", 10),
    ("선조", 10), ("대원군", 10), ("충무공", 10), ("이순신", 10),
    ("탐관오리", 10), ("탐관", 9), ("관리", 6), ("사또", 8), ("현감", 8), ("부사", 8), ("판서", 8),
    ("러일전쟁", 10), ("청일전쟁", 10), ("한일합방", 10), ("인조", 10), ("명군", 9),
    ("세계대전", 10), ("2차대전", 10), ("2차 대전", 10), ("2차세계대전", 10),
    ("1차대전", 10), ("1차 대전", 10),
    ("무솔리니", 10), ("히틀러", 10), ("스탈린", 10), ("처칠", 10), ("루즈벨트", 10),
    ("나폴레옹", 10), ("카이사르", 10), ("알렉산더", 10),
    ("부국강병", 9), ("왕자", 7), ("공주", 7), ("왕비", 7),
    ("전쟁", 7), ("전장", 7), ("참전", 9), ("참전군인", 9),
];

const XIANXIA_KEYWORDS: &[(&str, u32)] = &[
    ("선인", 10), ("수련", 8), ("도술", 9), ("법술", 9), ("영약", 8), ("단약", 8),
    ("승천", 9), ("선계", 10), ("상계", 9), ("하계", 8),
];

const SCI_FI_KEYWORDS: &[(&str, u32)] = &[
    ("우주", 10), ("외계", 10), ("외계인", 10), ("로봇", 9), ("AI", 9), ("인공지능", 9),
    ("우주선", 9), ("함선", 8), ("미래", 7),
];

const SPORTS_KEYWORDS: &[(&str, u32)] = &[
    ("축구", 10), ("골", 9), ("슛", 9), ("패스", 9), ("드리블", 9), ("발롱도르", 10),
    ("월드컵", 10), ("프리미어리그", 10), ("챔피언스리그", 10),
    ("스트라이커", 9), ("미드필더", 9), ("수비수", 9), ("골키퍼", 9),
    ("야구", 10), ("투수", 9), ("타자", 9), ("홈런", 9), ("마운드", 10), ("타석", 9),
    ("메이저리그", 10), ("강속구", 10), ("너클", 10), ("커브", 10), ("체인지업", 10),
    ("농구", 10), ("덩크", 9), ("3점슛", 10), ("3점 슛", 10), ("NBA", 10),
    ("리바운드", 9), ("어시스트", 9), ("코트", 8),
    ("선수", 8), ("감독", 8), ("코치", 8), ("올림픽", 10), ("국가대표", 9), ("게이머", 9),
];

/// `(first, second, bonus)` per genre
const COMPOUND_PATTERNS: &[(&str, &[(&str, &str, u32)])] = &[
    (genre::MARTIAL_ARTS, &[
        ("무공", "시스템", 22), ("무공", "레벨업", 22), ("무공", "자동사냥", 22),
        ("무림", "회귀", 20), ("무림", "귀환", 20), ("천마", "제자", 22),
        ("검법", "레벨업", 20), ("금의위", "무공", 20), ("금의위", "시스템", 20),
        ("남궁", "세가", 22), ("제갈", "세가", 22), ("화산", "귀환", 22),
        ("화산", "회귀", 22), ("소림", "귀환", 20), ("무당", "귀환", 20),
    ]),
    (genre::MODERN_FANTASY, &[
        ("헌터", "게이트", 22), ("헌터", "길드", 20), ("헌터", "협회", 22),
        ("각성", "헌터", 20), ("힐러", "헌터", 20), ("힐러", "길드", 18),
        ("아이돌", "회귀", 22), ("작곡가", "회귀", 22), ("재벌", "회귀", 20),
        ("회사", "회귀", 18), ("감독", "회귀", 22), ("배우", "회귀", 22),
        ("한의사", "고침", 22), ("도예가", "빚는", 22), ("징수", "달인", 22),
        ("매니저", "독식", 20), ("감독", "천재", 22), ("감독", "시작", 20),
        ("애니메이션", "감독", 22), ("영화", "감독", 22), ("드라마", "감독", 22),
        ("나 혼자", "게이머", 20), ("나 혼자", "징수", 22), ("나 혼자", "기연", 20),
        ("나 혼자", "연금술", 20),
    ]),
    (genre::ROMANCE_FANTASY, &[
        ("악녀", "황제", 22), ("총애", "황후", 22), ("계약", "결혼", 22), ("금리", "낭자", 22),
    ]),
    (genre::GAME_FANTASY, &[
        ("망겜", "속", 22), ("VR", "게임", 22), ("NPC", "플레이어", 20), ("야겜", "속", 22),
        ("힐러", "게임", 20), ("힐러", "RPG", 22), ("탱커", "힐러", 22),
    ]),
    (genre::FUSION_FANTASY, &[
        ("나 혼자", "레벨업", 18), ("나 혼자", "독식", 18), ("소드", "마스터", 18),
        ("마도", "왕", 18), ("이세계", "전이", 18),
        ("편의점", "종말", 20), ("편의점", "아포칼립스", 20), ("카페", "종말", 20),
        ("식당", "종말", 20),
    ]),
];

/// Keywords a refined label must find in the title
const VALIDATION_KEYWORDS: &[(&str, &[&str])] = &[
    (genre::FUSION_FANTASY, &[
        "나 혼자", "이세계", "회귀", "귀환", "환생", "빙의", "전생", "레벨업", "시스템", "상태창",
    ]),
    (genre::GAME_FANTASY, &[
        "망겜", "야겜", "npc", "vr", "게임 속", "게임속", "게임", "자동사냥", "방치",
        "mmorpg", "퀘스트", "플레이어",
    ]),
    (genre::HISTORY, &[
        "조선", "고려", "삼국지", "황제", "황가", "제국", "연개소문", "이성계", "세계대전",
        "참전", "전쟁", "전장", "2차대전", "2차 대전", "1차대전", "히틀러", "나폴레옹",
        "세자", "왕세자", "부국강병",
    ]),
    (genre::MARTIAL_ARTS, &["천마", "무림", "무공", "검법", "협객", "마교", "강호"]),
    (genre::MODERN_FANTASY, &[
        "헌터", "게이트", "각성", "협회장", "감독", "배우", "연예인", "아이돌",
    ]),
    (genre::SPORTS, &["축구", "야구", "농구", "배구", "투수", "타자", "골키퍼", "선수", "감독"]),
];

/// Titles whose genre is known regardless of lookups
const SPECIAL_CASES: &[(&str, &str)] = &[
    ("화산귀환", genre::MARTIAL_ARTS),
    ("전지적 독자 시점", genre::MODERN_FANTASY),
    ("나 혼자만 레벨업", genre::MODERN_FANTASY),
    ("재벌집 막내아들", genre::MODERN_FANTASY),
    ("템빨", genre::GAME_FANTASY),
];

/// Keyword → longer words that suppress it
const EXCLUSIONS: &[(&str, &[&str])] = &[("무공", &["충무공"])];

// ============================================================================
// Table
// ============================================================================

/// Two keywords that together point at one genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundPattern(pub String, pub String, pub u32);

impl CompoundPattern {
    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }

    pub fn bonus(&self) -> u32 {
        self.2
    }
}

/// Genre keyword data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTable {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_single_keywords")]
    pub single_keywords: BTreeMap<String, BTreeMap<String, u32>>,
    #[serde(default = "default_compound_patterns")]
    pub compound_patterns: BTreeMap<String, Vec<CompoundPattern>>,
    #[serde(default = "default_validation_keywords")]
    pub validation_keywords: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_special_cases")]
    pub special_cases: BTreeMap<String, String>,
    #[serde(default = "default_exclusions")]
    pub exclusions: BTreeMap<String, Vec<String>>,
}

fn default_version() -> String {
    BUILTIN_VERSION.to_string()
}

fn default_single_keywords() -> BTreeMap<String, BTreeMap<String, u32>> {
    let tables: [(&str, &[(&str, u32)]); 10] = [
        (genre::MODERN_FANTASY, MODERN_FANTASY_KEYWORDS),
        (genre::FUSION_FANTASY, FUSION_FANTASY_KEYWORDS),
        (genre::MARTIAL_ARTS, MARTIAL_ARTS_KEYWORDS),
        (genre::ROMANCE_FANTASY, ROMANCE_FANTASY_KEYWORDS),
        (genre::FANTASY, FANTASY_KEYWORDS),
        (genre::GAME_FANTASY, GAME_FANTASY_KEYWORDS),
        (genre::HISTORY, HISTORY_KEYWORDS),
        (genre::XIANXIA, XIANXIA_KEYWORDS),
        (genre::SCI_FI, SCI_FI_KEYWORDS),
        (genre::SPORTS, SPORTS_KEYWORDS),
    ];
    tables
        .iter()
        .map(|(genre, keywords)| {
            let weights = keywords.iter().map(|(k, w)| (k.to_string(), *w)).collect();
            (genre.to_string(), weights)
        })
        .collect()
}

fn default_compound_patterns() -> BTreeMap<String, Vec<CompoundPattern>> {
    COMPOUND_PATTERNS
        .iter()
        .map(|(genre, patterns)| {
            let patterns = patterns
                .iter()
                .map(|(a, b, bonus)| CompoundPattern(a.to_string(), b.to_string(), *bonus))
                .collect();
            (genre.to_string(), patterns)
        })
        .collect()
}

fn default_validation_keywords() -> BTreeMap<String, Vec<String>> {
    VALIDATION_KEYWORDS
        .iter()
        .map(|(genre, words)| (genre.to_string(), words.iter().map(|w| w.to_string()).collect()))
        .collect()
}

fn default_special_cases() -> BTreeMap<String, String> {
    SPECIAL_CASES
        .iter()
        .map(|(title, genre)| (title.to_string(), genre.to_string()))
        .collect()
}

fn default_exclusions() -> BTreeMap<String, Vec<String>> {
    EXCLUSIONS
        .iter()
        .map(|(word, longer)| (word.to_string(), longer.iter().map(|w| w.to_string()).collect()))
        .collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KeywordTable {
    pub fn builtin() -> Self {
        Self {
            version: default_version(),
            single_keywords: default_single_keywords(),
            compound_patterns: default_compound_patterns(),
            validation_keywords: default_validation_keywords(),
            special_cases: default_special_cases(),
            exclusions: default_exclusions(),
        }
    }

    /// Parse a keyword file
    ///
    /// # Errors
    /// `NotFound` when the file is missing, `Json` when it does not parse
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("Keyword file not found: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        let table: KeywordTable = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            version = %table.version,
            genres = table.single_keywords.len(),
            "Loaded keyword table"
        );
        Ok(table)
    }

    /// Load `path`, falling back to the built-in table on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::from_file(path) {
            Ok(table) => table,
            Err(Error::NotFound(_)) => {
                debug!(path = %path.display(), "No keyword file, using built-in table");
                Self::builtin()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed keyword file, using built-in table");
                Self::builtin()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Genres with a single-keyword table, in table order
    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.single_keywords.keys().map(String::as_str)
    }

    pub fn validation_keywords(&self, genre: &str) -> &[String] {
        self.validation_keywords
            .get(genre)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Words whose presence suppresses `keyword`
    pub fn exclusions_for(&self, keyword: &str) -> &[String] {
        self.exclusions.get(keyword).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_covers_core_genres() {
        let table = KeywordTable::builtin();
        for genre in [genre::MARTIAL_ARTS, genre::MODERN_FANTASY, genre::SPORTS, genre::HISTORY] {
            assert!(table.single_keywords.contains_key(genre), "missing {}", genre);
        }
        assert_eq!(table.single_keywords[genre::MARTIAL_ARTS]["천마"], 10);
        assert_eq!(table.exclusions_for("무공"), ["충무공".to_string()]);
    }

    #[test]
    fn test_compound_pattern_json_shape() {
        let pattern = CompoundPattern("무림".into(), "회귀".into(), 20);
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, r#"["무림","회귀",20]"#);
    }

    #[test]
    fn test_partial_file_keeps_default_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genre_keywords.json");
        std::fs::write(
            &path,
            r#"{"version": "2.0", "single_keywords": {"무협": {"천마": 12}}}"#,
        )
        .unwrap();

        let table = KeywordTable::load_or_default(Some(&path));

        assert_eq!(table.version, "2.0");
        assert_eq!(table.single_keywords.len(), 1);
        assert_eq!(table.single_keywords["무협"]["천마"], 12);
        assert!(!table.validation_keywords(genre::FUSION_FANTASY).is_empty());
        assert!(table.special_cases.contains_key("화산귀환"));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genre_keywords.json");
        std::fs::write(&path, "{\"single_keywords\": 3}").unwrap();

        assert_eq!(KeywordTable::load_or_default(Some(&path)), KeywordTable::builtin());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("genre_keywords.json");
        KeywordTable::builtin().save(&path).unwrap();
        assert_eq!(KeywordTable::from_file(&path).unwrap(), KeywordTable::builtin());
    }
}
