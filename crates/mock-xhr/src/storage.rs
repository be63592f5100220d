//! Durable key-value storage.
//!
//! Mocks, the global delay and the enabled marker all live in a flat,
//! string-keyed store shared with the rest of the host application. The
//! system never locks it: access is single-owner and the last write wins.
//!
//! - [`MemoryStore`]: insertion-ordered, in-process store
//! - [`FileStore`]: JSON file that survives restarts

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// A string-keyed persistent map with enumerable keys.
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// All keys in enumeration order.
    fn keys(&self) -> Vec<String>;

    /// All key/value pairs in enumeration order.
    fn entries(&self) -> Vec<(String, String)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|value| (key, value)))
            .collect()
    }

    /// Check if a key is present.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }
}
