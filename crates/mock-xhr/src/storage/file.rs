//! File-backed store.
//!
//! The whole store is kept in memory and flushed to a JSON file on every
//! write. Pairs are stored as an ordered array so enumeration order survives
//! a reload.

use std::fs;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, MemoryStore};
use crate::error::{MockError, Result};

/// A durable store persisted as a JSON array of `[key, value]` pairs.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: MemoryStore,
}

impl FileStore {
    /// Open a store at `path`, creating an empty one if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let raw = MockError::with_io_context(
                fs::read_to_string(&path),
                format!("reading mock store {}", path.display()),
            )?;
            let pairs: Vec<(String, String)> = if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            };
            MemoryStore::from_pairs(pairs)
        } else {
            MemoryStore::new()
        };

        tracing::debug!(path = %path.display(), keys = cache.len(), "Opened file store");
        Ok(Self { path, cache })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `staged` to disk, then adopt it. The cache is untouched when
    /// the write fails.
    fn commit(&mut self, staged: MemoryStore) -> Result<()> {
        Self::flush(&self.path, &staged)?;
        self.cache = staged;
        Ok(())
    }

    fn flush(path: &Path, state: &MemoryStore) -> Result<()> {
        let json = serde_json::to_string(&state.entries())?;
        let tmp = path.with_extension("tmp");
        MockError::with_io_context(
            fs::write(&tmp, json),
            format!("writing mock store {}", tmp.display()),
        )?;
        MockError::with_io_context(
            fs::rename(&tmp, path),
            format!("replacing mock store {}", path.display()),
        )
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut staged = self.cache.clone();
        staged.set(key, value)?;
        self.commit(staged)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if !self.cache.contains(key) {
            return Ok(());
        }
        let mut staged = self.cache.clone();
        staged.remove(key)?;
        self.commit(staged)
    }

    fn keys(&self) -> Vec<String> {
        self.cache.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("mock-xhr-store-{}-{n}.json", std::process::id()))
    }

    #[test]
    fn values_survive_reopen() {
        let path = temp_path();
        {
            let mut store = FileStore::open(&path).unwrap();
            store.set("z", "1").unwrap();
            store.set("a", "2").unwrap();
            store.remove("z").unwrap();
            store.set("m", "3").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.keys(), vec!["a", "m"]);
        assert_eq!(store.get("m").as_deref(), Some("3"));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_opens_empty() {
        let path = temp_path();
        let store = FileStore::open(&path).unwrap();
        assert!(store.keys().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn failed_write_leaves_cache_unchanged() {
        let path = std::env::temp_dir()
            .join(format!("mock-xhr-missing-dir-{}", std::process::id()))
            .join("store.json");
        let mut store = FileStore::open(&path).unwrap();

        let err = store.set("k", "v").unwrap_err();
        assert!(matches!(err, MockError::IoWithContext { .. }));
        assert!(store.get("k").is_none());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path();
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(MockError::Json(_))));

        fs::remove_file(path).unwrap();
    }
}
