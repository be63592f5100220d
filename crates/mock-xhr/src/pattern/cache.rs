//! Compiled regex cache.
//!
//! Every wrap cycle revives stored regexes and compiles parameterized URLs
//! again. The sources rarely change between cycles, so compiled regexes are
//! shared through a bounded cache.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;

/// Default maximum number of cached sources.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// A bounded cache of compiled regexes keyed by source.
///
/// The oldest source is evicted first when the cache is full.
pub struct PatternCache {
    inner: RwLock<Entries>,
    capacity: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

#[derive(Default)]
struct Entries {
    by_source: HashMap<String, Arc<Regex>>,
    insertion: VecDeque<String>,
}

impl PatternCache {
    /// Create a cache holding at most `capacity` sources.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Return the cached regex for `source`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not a valid regex.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Regex>, regex::Error> {
        {
            let entries = self
                .inner
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(regex) = entries.by_source.get(source) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(regex));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let regex = Arc::new(Regex::new(source)?);

        let mut entries = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(existing) = entries.by_source.get(source) {
            return Ok(Arc::clone(existing));
        }
        while entries.by_source.len() >= self.capacity {
            match entries.insertion.pop_front() {
                Some(oldest) => {
                    entries.by_source.remove(&oldest);
                }
                None => break,
            }
        }
        entries
            .by_source
            .insert(source.to_string(), Arc::clone(&regex));
        entries.insertion.push_back(source.to_string());

        Ok(regex)
    }

    /// Check if a source is cached.
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .by_source
            .contains_key(source)
    }

    /// Number of cached sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .by_source
            .len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that had to compile.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

/// Process-wide cache used by [`CompiledRegex::compile`](super::CompiledRegex::compile).
pub static GLOBAL_CACHE: LazyLock<PatternCache> = LazyLock::new(PatternCache::default);
