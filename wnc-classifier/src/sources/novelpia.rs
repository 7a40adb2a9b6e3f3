//! 노벨피아
//!
//! Genres are hashtags. Compound tags ("#현대판타지") beat tag combinations
//! ("#현대 #판타지"), which beat single tags; bare "판타지" and "소설" are
//! too broad to trust until nothing else matched.

use super::page::{
    element_text_spaced, elements_with_class, page_text, GenreSignal, PageContext, PageRules,
};
use crate::types::SourceId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use wnc_common::genre;

static TITLE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^노벨피아\s*-\s*웹소설로\s*꿈꾸는\s*세상!\s*-\s*",
        r"\s*-\s*노벨피아$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").expect("valid regex"));

/// Tag phrases naming a sub-genre outright
const COMPOUND_TAGS: &[(&str, &str)] = &[
    ("현대판타지", genre::MODERN_FANTASY),
    ("현대 판타지", genre::MODERN_FANTASY),
    ("로맨스판타지", genre::ROMANCE_FANTASY),
    ("로맨스 판타지", genre::ROMANCE_FANTASY),
    ("퓨전판타지", genre::FUSION_FANTASY),
    ("퓨전 판타지", genre::FUSION_FANTASY),
    ("게임판타지", genre::GAME_FANTASY),
    ("게임 판타지", genre::GAME_FANTASY),
];

/// Two tags that together name a sub-genre
const TAG_COMBINATIONS: &[(&str, &str, &str)] = &[
    ("로맨스", "판타지", genre::ROMANCE_FANTASY),
    ("판타지", "퓨전", genre::FUSION_FANTASY),
    ("무협", "게임", genre::GAME_FANTASY),
    ("현대", "판타지", genre::MODERN_FANTASY),
];

/// Single tags, most telling first
const SINGLE_TAGS: &[&str] = &[
    "무협", "선협", "로판", "로맨스판타지", "로맨스 판타지", "로맨스", "현판", "현대판타지",
    "현대 판타지", "현대", "겜판", "게임판타지", "게임 판타지", "게임", "퓨판", "퓨전판타지",
    "퓨전 판타지", "퓨전", "스포츠", "스포츠물", "역사", "역사물", "SF", "BL",
];

const BROAD_TAGS: &[&str] = &["판타지", "소설"];

const TEXT_SCAN_CONFIDENCE: f32 = 0.80;

/// Characters kept on each side of a hashtag found in body text
const TAG_WINDOW: usize = 50;

fn has_tag(text: &str, tag: &str) -> bool {
    text.contains(&format!("#{}", tag)) || text.contains(&format!("# {}", tag))
}

/// Text around `#tag` occurrences when no tag container exists
fn hashtag_windows(text: &str) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut windows = Vec::new();
    for m in HASHTAG_RE.find_iter(text) {
        let at = chars.partition_point(|(i, _)| *i < m.start());
        let from = chars[at.saturating_sub(TAG_WINDOW)].0;
        let to = chars.get(at + TAG_WINDOW).map(|(i, _)| *i).unwrap_or(text.len());
        windows.push(&text[from..to.max(m.end())]);
    }
    windows.join(" ")
}

pub struct Novelpia;

impl Novelpia {
    fn tag_text(doc: &Html) -> String {
        let containers: Vec<String> =
            elements_with_class(doc, &["div", "span", "p"], &["tag", "hash"])
                .into_iter()
                .map(element_text_spaced)
                .collect();
        if containers.is_empty() {
            hashtag_windows(&page_text(doc))
        } else {
            containers.join(" ")
        }
    }

    fn signal(genre: &str, raw: &str, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        ctx.vocabulary.is_valid(genre).then(|| GenreSignal {
            genre: genre.to_string(),
            raw: raw.to_string(),
            confidence: ctx.confidence,
        })
    }

    fn from_tags(text: &str, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        if let Some((tag, g)) = COMPOUND_TAGS.iter().find(|(tag, _)| has_tag(text, tag)) {
            return Self::signal(g, tag, ctx);
        }

        if let Some((a, b, g)) = TAG_COMBINATIONS
            .iter()
            .find(|(a, b, _)| has_tag(text, a) && has_tag(text, b))
        {
            return Self::signal(g, &format!("{}+{}", a, b), ctx);
        }

        SINGLE_TAGS
            .iter()
            .chain(BROAD_TAGS.iter())
            .filter(|tag| has_tag(text, tag))
            .find_map(|tag| ctx.label(tag, ctx.confidence))
    }
}

impl PageRules for Novelpia {
    fn source(&self) -> SourceId {
        SourceId::Novelpia
    }

    fn clean_title(&self, title: &str) -> String {
        super::page::strip_all(title, &TITLE_RES)
    }

    fn genre_signal(&self, doc: &Html, ctx: &PageContext<'_>) -> Option<GenreSignal> {
        let tags = Self::tag_text(doc);
        Self::from_tags(&tags, ctx).or_else(|| ctx.scan(&page_text(doc), TEXT_SCAN_CONFIDENCE))
    }
}
