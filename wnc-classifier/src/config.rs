//! Classifier configuration
//!
//! Sources, in priority order:
//! - command line (`--config`, `--data-dir`)
//! - environment (`WNC_CONFIG`, `WNC_DATA_DIR`, search credentials)
//! - TOML file
//! - built-in defaults
//!
//! A missing or malformed file never stops a run; the defaults are used.

use crate::matcher::MatchThresholds;
use crate::search::SearchCredentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use wnc_common::config::{load_toml_or_default, resolve_config_path, resolve_data_dir};

pub const CONFIG_ENV: &str = "WNC_CONFIG";
pub const DATA_DIR_ENV: &str = "WNC_DATA_DIR";
pub const CLIENT_ID_ENV: &str = "WNC_SEARCH_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "WNC_SEARCH_CLIENT_SECRET";

const CACHE_FILE: &str = "genre_cache.json";
const VOCABULARY_FILE: &str = "genre_mapping.json";
const KEYWORDS_FILE: &str = "genre_keywords.json";

/// `[paths]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
    pub vocabulary_file: Option<PathBuf>,
    pub keywords_file: Option<PathBuf>,
}

/// `[search]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub requests_per_second: u32,
    pub results_per_query: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            requests_per_second: 10,
            results_per_query: 10,
        }
    }
}

/// `[http]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Minimum spacing between requests to one source
    pub min_interval_ms: u64,
    pub max_pages_per_source: usize,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            min_interval_ms: 500,
            max_pages_per_source: 3,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// `[thresholds]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Keyword fallback must reach this confidence
    pub confidence_floor: f32,
    pub similarity: f64,
    pub author_similarity: f64,
    pub max_length_ratio: f64,
    pub author_length_ratio: f64,
    pub short_title_chars: usize,
    pub author_hint_confidence: f32,
    /// Characteristic title keywords are accepted at or above this
    pub title_keyword_confidence: f32,
    /// Source results below this do not resolve a title
    pub search_acceptance: f32,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let matching = MatchThresholds::default();
        Self {
            confidence_floor: 0.40,
            similarity: matching.similarity,
            author_similarity: matching.author_similarity,
            max_length_ratio: matching.max_length_ratio,
            author_length_ratio: matching.author_length_ratio,
            short_title_chars: matching.short_title_chars,
            author_hint_confidence: crate::authors::AUTHOR_HINT_CONFIDENCE,
            title_keyword_confidence: 0.80,
            search_acceptance: 0.80,
        }
    }
}

impl ThresholdsConfig {
    pub fn match_thresholds(&self) -> MatchThresholds {
        MatchThresholds {
            similarity: self.similarity,
            author_similarity: self.author_similarity,
            max_length_ratio: self.max_length_ratio,
            author_length_ratio: self.author_length_ratio,
            short_title_chars: self.short_title_chars,
        }
    }
}

/// `[batch]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 5 }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Also remember titles that resolved to 미분류
    pub cache_unclassified: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_unclassified: true,
        }
    }
}

/// Complete classifier configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub paths: PathsConfig,
    pub search: SearchConfig,
    pub http: HttpConfig,
    pub thresholds: ThresholdsConfig,
    pub batch: BatchConfig,
    pub cache: CacheConfig,
}

impl ClassifierConfig {
    /// Load from the resolved config location; never fails
    pub fn load(cli_path: Option<&Path>) -> Self {
        let path = resolve_config_path(cli_path, CONFIG_ENV);
        let config: Self = load_toml_or_default(path.as_deref());
        if let Some(path) = &path {
            info!(path = %path.display(), "Configuration resolved");
        }
        config
    }

    /// Data folder: CLI → ENV → TOML → OS default
    pub fn data_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_data_dir(cli_arg, DATA_DIR_ENV, self.paths.data_dir.as_deref())
    }

    pub fn cache_path(&self, data_dir: &Path) -> PathBuf {
        self.paths.cache_file.clone().unwrap_or_else(|| data_dir.join(CACHE_FILE))
    }

    pub fn vocabulary_path(&self, data_dir: &Path) -> PathBuf {
        self.paths
            .vocabulary_file
            .clone()
            .unwrap_or_else(|| data_dir.join(VOCABULARY_FILE))
    }

    pub fn keywords_path(&self, data_dir: &Path) -> PathBuf {
        self.paths
            .keywords_file
            .clone()
            .unwrap_or_else(|| data_dir.join(KEYWORDS_FILE))
    }

    /// Search API credentials: ENV → TOML
    ///
    /// `None` selects the web-scrape search mode.
    pub fn search_credentials(&self) -> Option<SearchCredentials> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let env_creds = env(CLIENT_ID_ENV).zip(env(CLIENT_SECRET_ENV));
        let toml_creds = self
            .search
            .client_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .zip(self.search.client_secret.clone().filter(|v| !v.trim().is_empty()));

        if env_creds.is_some() && toml_creds.is_some() {
            warn!("Search credentials found in multiple sources: environment, TOML. Using environment (highest priority).");
        }

        if let Some((client_id, client_secret)) = env_creds {
            info!("Search credentials loaded from environment");
            return Some(SearchCredentials {
                client_id,
                client_secret,
            });
        }
        if let Some((client_id, client_secret)) = toml_creds {
            info!("Search credentials loaded from TOML config");
            return Some(SearchCredentials {
                client_id,
                client_secret,
            });
        }
        None
    }
}
