//! Author Registry
//!
//! Static author → genre hints. Consulted only after every other step has
//! failed to produce a genre.

use std::collections::HashMap;
use tracing::debug;
use wnc_common::genre;

/// Confidence of a registry hint
pub const AUTHOR_HINT_CONFIDENCE: f32 = 0.85;

/// Shortest name allowed to match by containment
const MIN_PARTIAL_CHARS: usize = 2;

const BUILTIN_AUTHORS: &[(&str, &str)] = &[
    // 무협
    ("고룡", genre::MARTIAL_ARTS),
    ("김용", genre::MARTIAL_ARTS),
    ("와룡생", genre::MARTIAL_ARTS),
    ("금강", genre::MARTIAL_ARTS),
    ("사마달", genre::MARTIAL_ARTS),
    ("황이", genre::MARTIAL_ARTS),
    ("야설록", genre::MARTIAL_ARTS),
    ("서효원", genre::MARTIAL_ARTS),
    ("좌백", genre::MARTIAL_ARTS),
    ("진산", genre::MARTIAL_ARTS),
    ("풍종호", genre::MARTIAL_ARTS),
    ("용대운", genre::MARTIAL_ARTS),
    ("한백림", genre::MARTIAL_ARTS),
    ("비가", genre::MARTIAL_ARTS),
    // 판타지
    ("이영도", genre::FANTASY),
    ("전민희", genre::FANTASY),
    ("이우혁", genre::FANTASY),
    ("김경진", genre::FANTASY),
    // 현판
    ("싱숑", genre::MODERN_FANTASY),
    ("추공", genre::MODERN_FANTASY),
    ("산경", genre::MODERN_FANTASY),
    // 로판
    ("김려령", genre::ROMANCE_FANTASY),
    ("박서련", genre::ROMANCE_FANTASY),
    // 역사
    ("김훈", genre::HISTORY),
    ("이문열", genre::HISTORY),
    ("박경리", genre::HISTORY),
    ("조정래", genre::HISTORY),
    ("황석영", genre::HISTORY),
];

/// Hint returned by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorHint {
    /// Registry name that matched
    pub author: String,
    pub genre: String,
    pub confidence: f32,
}

fn clean(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Author name → genre table
#[derive(Debug, Clone)]
pub struct AuthorRegistry {
    authors: HashMap<String, String>,
}

impl Default for AuthorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AuthorRegistry {
    pub fn empty() -> Self {
        Self {
            authors: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (author, genre) in BUILTIN_AUTHORS {
            registry.add(author, genre);
        }
        registry
    }

    /// Register or replace an author
    pub fn add(&mut self, author: &str, genre: &str) {
        let name = clean(author);
        if !name.is_empty() {
            self.authors.insert(name, genre.to_string());
        }
    }

    /// Look up a hint for `author`
    ///
    /// `author` may list several names separated by commas; the first name
    /// with a hint wins. Exact matches beat containment matches.
    pub fn lookup(&self, author: &str) -> Option<AuthorHint> {
        let names: Vec<String> = author
            .split(',')
            .map(clean)
            .filter(|n| !n.is_empty())
            .collect();

        for name in &names {
            if let Some(genre) = self.authors.get(name) {
                return Some(self.hint(name, genre));
            }
        }

        for name in names.iter().filter(|n| n.chars().count() >= MIN_PARTIAL_CHARS) {
            let partial = self
                .authors
                .iter()
                .filter(|(known, _)| known.chars().count() >= MIN_PARTIAL_CHARS)
                .filter(|(known, _)| known.contains(name.as_str()) || name.contains(known.as_str()))
                .max_by_key(|(known, _)| known.chars().count());
            if let Some((known, genre)) = partial {
                debug!(author = %name, registry = %known, "Author matched by containment");
                return Some(self.hint(known, genre));
            }
        }

        None
    }

    fn hint(&self, author: &str, genre: &str) -> AuthorHint {
        AuthorHint {
            author: author.to_string(),
            genre: genre.to_string(),
            confidence: AUTHOR_HINT_CONFIDENCE,
        }
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    pub fn authors_for(&self, genre: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .authors
            .iter()
            .filter(|(_, g)| g.as_str() == genre)
            .map(|(a, _)| a.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}
