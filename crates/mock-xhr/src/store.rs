//! Persistent mock store.
//!
//! Installed mocks are written to a [`KeyValueStore`] under keys built by the
//! [`key`](crate::key) codec, with a JSON [`StoredMockEntry`] as the value.
//! Loading decodes every prefixed key, revives regex URLs and returns the
//! mocks in installation order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MockError, Result};
use crate::key::{self, DELAY_KEY, ENABLED_AT_KEY, ENABLED_KEY};
use crate::normalize::normalize_url;
use crate::storage::KeyValueStore;
use crate::types::{CodeStatus, HttpMethod, MockOptions, ResponseHeaders, Times, UrlPattern};

/// Value stored under a mock key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMockEntry {
    /// Response body.
    pub data: Value,
    /// Numeric status code.
    pub status: u16,
    /// Per-mock options.
    #[serde(default)]
    pub options: MockOptions,
    /// Whether the key's URL is a stringified regex.
    pub is_regex: bool,
    /// URL as declared, stringified.
    pub original_url: String,
    /// Status as declared.
    pub original_status: CodeStatus,
    /// Optional response headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<ResponseHeaders>,
}

/// A mock ready to be written to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRecord {
    /// HTTP method.
    pub method: HttpMethod,
    /// Repeat count.
    pub times: Times,
    /// Normalized URL or regex.
    pub url: UrlPattern,
    /// URL as declared.
    pub original_url: UrlPattern,
    /// Numeric status code.
    pub status: u16,
    /// Status as declared.
    pub original_status: CodeStatus,
    /// Response body.
    pub data: Value,
    /// Per-mock options.
    pub options: MockOptions,
    /// Optional response headers.
    pub headers: Option<ResponseHeaders>,
}

impl MockRecord {
    /// Storage key of this record.
    #[must_use]
    pub fn key(&self) -> String {
        key::encode(self.method, self.times, &self.url.to_string())
    }

    fn entry(&self) -> StoredMockEntry {
        StoredMockEntry {
            data: self.data.clone(),
            status: self.status,
            options: self.options,
            is_regex: self.url.is_regex(),
            original_url: self.original_url.to_string(),
            original_status: self.original_status,
            headers: self.headers.clone(),
        }
    }
}

/// A mock decoded from storage. Built fresh on every load.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMock {
    /// Storage key the mock was read from.
    pub key: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Repeat count.
    pub times: Times,
    /// Normalized URL or revived regex.
    pub url: UrlPattern,
    /// Numeric status code.
    pub status: u16,
    /// Response body.
    pub data: Value,
    /// Per-mock options.
    pub options: MockOptions,
    /// URL as declared.
    pub original_url: UrlPattern,
    /// Status as declared.
    pub original_status: CodeStatus,
    /// Optional response headers.
    pub headers: Option<ResponseHeaders>,
}

impl PreparedMock {
    fn decode(storage_key: &str, value: &str) -> Result<Self> {
        let decoded = key::decode(storage_key)?;
        let entry: StoredMockEntry = serde_json::from_str(value)?;

        Ok(Self {
            key: storage_key.to_string(),
            method: decoded.method,
            times: decoded.times,
            url: UrlPattern::from_stored(&decoded.url, entry.is_regex)?,
            status: entry.status,
            data: entry.data,
            options: entry.options,
            original_url: UrlPattern::from_stored(&entry.original_url, entry.is_regex)?,
            original_status: entry.original_status,
            headers: entry.headers,
        })
    }
}

/// Mocks, global delay and enabled markers over a key-value store.
#[derive(Debug, Default)]
pub struct MockStore<S> {
    storage: S,
}

impl<S: KeyValueStore> MockStore<S> {
    /// Wrap a key-value store.
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The underlying store.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// The underlying store, mutably.
    pub const fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Unwrap the underlying store.
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Write a mock, overwriting any mock with the same key.
    ///
    /// Returns the storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be serialized or written.
    pub fn save(&mut self, record: &MockRecord) -> Result<String> {
        let storage_key = record.key();
        let value = serde_json::to_string(&record.entry())?;
        self.storage.set(&storage_key, &value)?;
        tracing::debug!(key = %storage_key, status = record.status, "Mock saved");
        Ok(storage_key)
    }

    /// Load every stored mock, ordered by repeat count then key.
    ///
    /// # Errors
    ///
    /// Returns an error if a prefixed key does not follow the key grammar, a
    /// value is not a valid entry or a stored regex no longer compiles.
    pub fn load_all(&self) -> Result<Vec<PreparedMock>> {
        let mut mocks = self
            .storage
            .entries()
            .into_iter()
            .filter(|(storage_key, _)| key::is_mock_key(storage_key))
            .map(|(storage_key, value)| PreparedMock::decode(&storage_key, &value))
            .collect::<Result<Vec<_>>>()?;

        mocks.sort_by(|a, b| a.times.cmp(&b.times).then_with(|| a.key.cmp(&b.key)));
        Ok(mocks)
    }

    /// Check if at least one mock is stored.
    #[must_use]
    pub fn has_mocks(&self) -> bool {
        self.storage.keys().iter().any(|k| key::is_mock_key(k))
    }

    /// Remove mocks stored for a URL, optionally only for one method.
    ///
    /// Literal URLs are normalized before comparison. Returns the number of
    /// removed mocks.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidMethod`] for an unsupported method name,
    /// or a decoding error for corrupted keys.
    pub fn clear_by_url(&mut self, url: &UrlPattern, method: Option<&str>) -> Result<usize> {
        let method = method.map(str::parse::<HttpMethod>).transpose()?;
        let target = match url {
            UrlPattern::Literal(literal) => normalize_url(literal)?,
            UrlPattern::Regex(_) => url.to_string(),
        };

        let mut doomed = Vec::new();
        for storage_key in self.storage.keys() {
            if !key::is_mock_key(&storage_key) {
                continue;
            }
            let decoded = key::decode(&storage_key)?;
            if decoded.url == target && method.is_none_or(|m| m == decoded.method) {
                doomed.push(storage_key);
            }
        }

        for storage_key in &doomed {
            self.storage.remove(storage_key)?;
        }
        tracing::debug!(url = %target, removed = doomed.len(), "Mocks cleared by url");
        Ok(doomed.len())
    }

    /// Remove the `n`-th mock (1-based) in load order.
    ///
    /// A non-positive or out-of-range ordinal is logged and ignored. Returns
    /// whether a mock was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if stored mocks cannot be decoded.
    pub fn clear_by_ordinal(&mut self, n: usize) -> Result<bool> {
        if n < 1 {
            tracing::error!("Mock ordinal should be a positive number");
            return Ok(false);
        }

        let mocks = self.load_all()?;
        let Some(mock) = mocks.get(n - 1) else {
            tracing::warn!(ordinal = n, stored = mocks.len(), "No stored mock at ordinal");
            return Ok(false);
        };

        self.storage.remove(&mock.key)?;
        tracing::debug!(key = %mock.key, ordinal = n, "Mock cleared by ordinal");
        Ok(true)
    }

    /// Remove every stored mock.
    ///
    /// With `everything`, the global delay is removed and the system is
    /// disabled as well. Returns the number of removed keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a removal.
    pub fn clear_all(&mut self, everything: bool) -> Result<usize> {
        let doomed: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|k| key::is_mock_key(k) || (everything && k.starts_with(DELAY_KEY)))
            .collect();

        for storage_key in &doomed {
            self.storage.remove(storage_key)?;
        }
        if everything {
            self.clear_enabled_markers()?;
        }

        tracing::debug!(removed = doomed.len(), everything, "Mocks cleared");
        Ok(doomed.len())
    }

    /// Global response delay in milliseconds; 0 when unset.
    ///
    /// An unparseable value is logged and treated as unset.
    #[must_use]
    pub fn delay(&self) -> u64 {
        let Some(raw) = self.storage.get(DELAY_KEY) else {
            return 0;
        };
        raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "Stored delay is not a number, ignoring it");
            0
        })
    }

    /// Set the global response delay.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidDelay`] for 0.
    pub fn set_delay(&mut self, ms: u64) -> Result<()> {
        if ms == 0 {
            return Err(MockError::InvalidDelay);
        }
        self.storage.set(DELAY_KEY, &ms.to_string())
    }

    /// Remove the global response delay.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn clear_delay(&mut self) -> Result<()> {
        self.storage.remove(DELAY_KEY)
    }

    /// Check if the enabled marker is present.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.storage.contains(ENABLED_KEY)
    }

    /// Raw timestamp of the last enable, if any.
    #[must_use]
    pub fn enabled_at(&self) -> Option<String> {
        self.storage.get(ENABLED_AT_KEY)
    }

    /// Record the enabled marker and the enable timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a write.
    pub fn set_enabled_markers(&mut self, now_ms: u64) -> Result<()> {
        self.storage.set(ENABLED_KEY, "true")?;
        self.set_enabled_at(now_ms)
    }

    /// Overwrite the enable timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn set_enabled_at(&mut self, now_ms: u64) -> Result<()> {
        self.storage.set(ENABLED_AT_KEY, &now_ms.to_string())
    }

    /// Remove the enabled marker and the enable timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a removal.
    pub fn clear_enabled_markers(&mut self) -> Result<()> {
        self.storage.remove(ENABLED_KEY)?;
        self.storage.remove(ENABLED_AT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn record(url: &str, times: Times) -> MockRecord {
        MockRecord {
            method: HttpMethod::Get,
            times,
            url: UrlPattern::literal(url),
            original_url: UrlPattern::literal(url),
            status: 200,
            original_status: CodeStatus::Success,
            data: json!({"url": url}),
            options: MockOptions::default(),
            headers: None,
        }
    }

    #[test]
    fn entry_json_uses_camel_case() {
        let entry = record("/a", Times::Always).entry();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            json!({
                "data": {"url": "/a"},
                "status": 200,
                "options": {},
                "isRegex": false,
                "originalUrl": "/a",
                "originalStatus": "success"
            })
        );
    }

    #[test]
    fn ordering_puts_counts_before_always() {
        let mut store = MockStore::new(MemoryStore::new());
        store.save(&record("/abc/qwe", Times::Always)).unwrap();
        store.save(&record("/abc/qwe", Times::Count(2))).unwrap();
        store.save(&record("/abc/qwe", Times::Count(1))).unwrap();

        let times: Vec<Times> = store.load_all().unwrap().iter().map(|m| m.times).collect();
        assert_eq!(times, vec![Times::Count(1), Times::Count(2), Times::Always]);
    }

    #[test]
    fn overwrite_keeps_one_entry() {
        let mut store = MockStore::new(MemoryStore::new());
        store.save(&record("/abc", Times::Always)).unwrap();
        let mut second = record("/abc", Times::Always);
        second.data = json!({"second": true});
        store.save(&second).unwrap();

        let mocks = store.load_all().unwrap();
        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks[0].data, json!({"second": true}));
    }

    #[test]
    fn corrupt_value_is_an_error() {
        let mut storage = MemoryStore::new();
        storage.set("__MOCK_XHR__(get)[1]/a", "{oops").unwrap();
        let store = MockStore::new(storage);
        assert!(matches!(store.load_all(), Err(MockError::Json(_))));
    }

    #[test]
    fn foreign_keys_are_ignored() {
        let mut storage = MemoryStore::new();
        storage.set("theme", "dark").unwrap();
        let store = MockStore::new(storage);
        assert!(store.load_all().unwrap().is_empty());
        assert!(!store.has_mocks());
    }

    #[test]
    fn ordinal_out_of_range_is_noop() {
        let mut store = MockStore::new(MemoryStore::new());
        store.save(&record("/a", Times::Always)).unwrap();

        assert!(!store.clear_by_ordinal(0).unwrap());
        assert!(!store.clear_by_ordinal(2).unwrap());
        assert!(store.clear_by_ordinal(1).unwrap());
        assert!(!store.has_mocks());
    }

    #[test]
    fn delay_round_trip() {
        let mut store = MockStore::new(MemoryStore::new());
        assert_eq!(store.delay(), 0);
        assert!(matches!(store.set_delay(0), Err(MockError::InvalidDelay)));
        store.set_delay(1500).unwrap();
        assert_eq!(store.delay(), 1500);
        store.clear_delay().unwrap();
        assert_eq!(store.delay(), 0);
    }

    #[test]
    fn garbage_delay_reads_as_zero() {
        let mut storage = MemoryStore::new();
        storage.set(DELAY_KEY, "soon").unwrap();
        assert_eq!(MockStore::new(storage).delay(), 0);
    }
}
