//! Characteristic title keywords
//!
//! A handful of words (sports, modern professions, historical periods) pin a
//! genre on their own. Checked in a fixed genre order; the first genre with
//! any hit wins.

use serde::Serialize;
use wnc_common::genre;

/// Confidence attached to a characteristic keyword hit
pub const TITLE_KEYWORD_CONFIDENCE: f32 = 0.90;

const TITLE_KEYWORDS: &[(&str, &[&str])] = &[
    (genre::SPORTS, &[
        "축구", "야구", "농구", "복싱", "복서", "격투기", "킥복싱", "무에타이", "MMA", "UFC",
        "태권도", "유도", "배구", "테니스", "골프", "수영", "마라톤", "풋볼", "베이스볼",
        "바스켓볼", "투수", "타자", "골키퍼", "스트라이커", "리베로", "세터", "스파이커",
        "호타", "준족",
    ]),
    (genre::MODERN_FANTASY, &[
        "아이돌", "작곡가", "가수", "배우", "연예인", "감독", "영화감독", "드라마감독",
        "애니메이션감독", "프로듀서", "매니저", "한의사", "의사", "변호사", "검사", "도예가",
        "화가", "요리사", "재벌", "회계사", "교수", "탐정", "징수",
    ]),
    (genre::HISTORY, &[
        "조선", "고려", "삼국", "삼국지", "고조선", "백제", "신라", "가야", "발해", "고구려",
        "임진왜란", "병자호란", "갑신정변", "동학농민운동", "광복", "독립운동", "항일",
        "세계대전", "2차대전", "1차대전", "나폴레옹", "히틀러", "무솔리니",
    ]),
];

/// Characteristic keyword hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleKeywordHit {
    pub genre: &'static str,
    pub confidence: f32,
    pub matched: Vec<&'static str>,
}

/// First genre whose characteristic keywords appear in `title`
pub fn analyze_title(title: &str) -> Option<TitleKeywordHit> {
    let lowered = title.to_lowercase();
    TITLE_KEYWORDS.iter().find_map(|(genre, keywords)| {
        let matched: Vec<&'static str> = keywords
            .iter()
            .copied()
            .filter(|k| lowered.contains(&k.to_lowercase()))
            .collect();
        (!matched.is_empty()).then(|| TitleKeywordHit {
            genre: *genre,
            confidence: TITLE_KEYWORD_CONFIDENCE,
            matched,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sports_checked_first() {
        // "감독" is a modern keyword but "야구" wins on genre order
        let hit = analyze_title("천재 야구 감독").unwrap();
        assert_eq!(hit.genre, genre::SPORTS);
        assert_eq!(hit.matched, vec!["야구"]);
    }

    #[test]
    fn test_case_insensitive_latin() {
        let hit = analyze_title("ufc 챔피언").unwrap();
        assert_eq!(hit.genre, genre::SPORTS);
    }

    #[test]
    fn test_history_and_miss() {
        assert_eq!(analyze_title("조선 재벌 회귀").unwrap().genre, genre::MODERN_FANTASY);
        assert_eq!(analyze_title("고구려의 검").unwrap().genre, genre::HISTORY);
        assert!(analyze_title("마법사의 탑").is_none());
    }
}
