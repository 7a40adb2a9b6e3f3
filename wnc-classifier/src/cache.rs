//! Result Cache
//!
//! Memoizes title → classification decisions. Keys are trimmed and
//! lower-cased. Entries never expire within a run; [`ResultCache::flush`] is
//! the only operation that touches disk and does nothing unless an entry
//! changed since the previous flush.

use crate::types::{ClassificationResult, Provenance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use wnc_common::{ConfidenceTier, Error, Result};

const CACHE_FORMAT_VERSION: &str = "1.0";

/// One memoized decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub genre: String,
    pub confidence: ConfidenceTier,
    pub source: Provenance,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub evidence: Vec<String>,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn from_result(result: &ClassificationResult) -> Self {
        Self {
            genre: result.genre.clone(),
            confidence: result.confidence,
            source: result.source,
            score: result.score,
            evidence: result.evidence.clone(),
            cached_at: wnc_common::time::now(),
        }
    }

    /// Rebuild the classification this entry was written from
    pub fn to_result(&self) -> ClassificationResult {
        ClassificationResult::new(
            self.genre.clone(),
            self.confidence,
            self.source,
            self.score,
            self.evidence.clone(),
        )
    }
}

/// On-disk layout of `genre_cache.json`
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    updated_at: DateTime<Utc>,
    entries: HashMap<String, CacheEntry>,
}

/// Normalize a title into a cache key
pub fn cache_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Thread-safe title → classification cache
///
/// Shared across batch workers behind an `Arc`. Concurrent writes to the
/// same key are last-writer-wins.
#[derive(Debug)]
pub struct ResultCache {
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    dirty: AtomicBool,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ResultCache {
    /// Cache with no backing file; `flush` is a no-op
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(HashMap::new()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Open the cache backed by `path`
    ///
    /// A missing file starts empty. A malformed file logs a warning and
    /// starts empty; it is overwritten on the next flush.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "Loaded genre cache");
                entries
            }
            Err(Error::NotFound(_)) => {
                debug!(path = %path.display(), "No genre cache file yet");
                HashMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed genre cache, starting empty");
                HashMap::new()
            }
        };

        Self {
            path: Some(path),
            entries: Mutex::new(entries),
            dirty: AtomicBool::new(false),
        }
    }

    fn read_entries(path: &Path) -> Result<HashMap<String, CacheEntry>> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let file: CacheFile = serde_json::from_str(&content)?;
        Ok(file
            .entries
            .into_iter()
            .map(|(key, entry)| (cache_key(&key), entry))
            .collect())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, title: &str) -> Option<CacheEntry> {
        self.lock().get(&cache_key(title)).cloned()
    }

    /// Store a classification for `title`
    pub fn set(&self, title: &str, result: &ClassificationResult) {
        let key = cache_key(title);
        if key.is_empty() {
            return;
        }
        self.lock().insert(key, CacheEntry::from_result(result));
        self.dirty.store(true, Ordering::Release);
    }

    pub fn contains(&self, title: &str) -> bool {
        self.lock().contains_key(&cache_key(title))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        if !entries.is_empty() {
            entries.clear();
            self.dirty.store(true, Ordering::Release);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Persist entries if anything changed since the last flush
    ///
    /// Writes to a sibling temp file and renames it over the cache file.
    ///
    /// # Returns
    /// `true` when a file was written
    pub fn flush(&self) -> Result<bool> {
        let Some(path) = self.path.as_ref() else {
            return Ok(false);
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }

        let snapshot = CacheFile {
            version: CACHE_FORMAT_VERSION.to_string(),
            updated_at: wnc_common::time::now(),
            entries: self.lock().clone(),
        };

        let written = Self::write_atomic(path, &snapshot);
        if written.is_err() {
            // Keep the entries pending for the next attempt
            self.dirty.store(true, Ordering::Release);
        }
        written?;

        info!(path = %path.display(), entries = snapshot.entries.len(), "Flushed genre cache");
        Ok(true)
    }

    fn write_atomic(path: &Path, snapshot: &CacheFile) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
