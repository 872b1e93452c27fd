//! Durable embedding cache keyed by content fingerprint.
//!
//! Maps a chunk-text fingerprint to a previously computed embedding vector
//! so that re-ingesting unchanged content performs zero provider calls.
//! Invalidation is automatic: any change to a chunk's text changes its
//! fingerprint, so stale vectors are simply never looked up again.
//!
//! The cache is persisted as a single JSON file after every successful
//! store. Writes are whole-file replacements (temp file + rename), so a
//! crash mid-write never leaves a corrupt cache behind. Persistence
//! failures are logged and non-fatal: the in-memory map stays authoritative
//! for the rest of the process lifetime.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A cached embedding with its refresh timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub embedding: Vec<f32>,
    pub refreshed_at: DateTime<Utc>,
}

/// Fingerprint-keyed embedding cache with whole-file JSON persistence.
pub struct EmbeddingCache {
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, CacheEntry>>,
}

impl EmbeddingCache {
    /// Open a cache backed by `path`, loading any previous contents.
    ///
    /// A missing file starts an empty cache; an unreadable or corrupt file
    /// is logged and discarded rather than failing startup.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding corrupt embedding cache");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read embedding cache");
                BTreeMap::new()
            }
        };

        if !entries.is_empty() {
            tracing::debug!(path = %path.display(), entries = entries.len(), "loaded embedding cache");
        }

        Self {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    /// Create a cache with no backing file. Used in tests and one-shot runs
    /// where durability is not wanted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up the embedding for a fingerprint.
    pub fn lookup(&self, fingerprint: &str) -> Option<Vec<f32>> {
        self.entries
            .read()
            .unwrap()
            .get(fingerprint)
            .map(|e| e.embedding.clone())
    }

    /// Store an embedding under a fingerprint and persist the cache.
    ///
    /// Storing is idempotent per fingerprint (last write wins), so no
    /// cross-process locking is needed. A failed persist is logged at
    /// `warn` and otherwise ignored.
    pub fn store(&self, fingerprint: &str, embedding: &[f32]) {
        self.entries.write().unwrap().insert(
            fingerprint.to_string(),
            CacheEntry {
                embedding: embedding.to_vec(),
                refreshed_at: Utc::now(),
            },
        );

        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "embedding cache not persisted; continuing with in-memory state");
        }
    }

    /// Number of cached fingerprints.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the full cache contents to disk as one file replacement.
    fn persist(&self) -> Result<(), EngineError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot = self.entries.read().unwrap().clone();
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| EngineError::CacheWrite(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| EngineError::CacheWrite(e.to_string()))?;
            }
        }

        let tmp = tmp_path(path);
        fs::write(&tmp, json).map_err(|e| EngineError::CacheWrite(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| EngineError::CacheWrite(e.to_string()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lookup_miss_then_hit() {
        let cache = EmbeddingCache::in_memory();
        assert!(cache.lookup("abc").is_none());

        cache.store("abc", &[0.1, 0.2, 0.3]);
        assert_eq!(cache.lookup("abc"), Some(vec![0.1, 0.2, 0.3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_is_idempotent_per_fingerprint() {
        let cache = EmbeddingCache::in_memory();
        cache.store("abc", &[1.0]);
        cache.store("abc", &[1.0]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");

        {
            let cache = EmbeddingCache::open(&path);
            cache.store("fp-1", &[0.5, -0.5]);
            cache.store("fp-2", &[1.0, 0.0]);
        }

        let reopened = EmbeddingCache::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.lookup("fp-1"), Some(vec![0.5, -0.5]));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = EmbeddingCache::open(&path);
        assert!(cache.is_empty());

        // And it recovers: the next store rewrites the file wholesale.
        cache.store("fp", &[0.25]);
        let reopened = EmbeddingCache::open(&path);
        assert_eq!(reopened.lookup("fp"), Some(vec![0.25]));
    }

    #[test]
    fn test_missing_parent_dir_is_created() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("cache.json");

        let cache = EmbeddingCache::open(&path);
        cache.store("fp", &[1.0, 2.0]);

        assert!(path.exists());
        assert_eq!(EmbeddingCache::open(&path).len(), 1);
    }

    #[test]
    fn test_unwritable_path_is_non_fatal() {
        // Persisting into a directory that is actually a file fails, but the
        // in-memory cache must keep working.
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not dir").unwrap();
        let path = blocker.join("cache.json");

        let cache = EmbeddingCache::open(&path);
        cache.store("fp", &[9.0]);
        assert_eq!(cache.lookup("fp"), Some(vec![9.0]));
    }
}
