//! In-memory store.

use std::collections::HashMap;

use super::KeyValueStore;
use crate::error::Result;

/// An insertion-ordered in-memory store.
///
/// Overwriting a key keeps its original position, so enumeration order
/// matches the order in which keys were first written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with pairs, in order.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut store = Self::new();
        for (key, value) in pairs {
            store.insert(key.into(), value.into());
        }
        store
    }

    fn insert(&mut self, key: String, value: String) {
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value);
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.order.clear();
        self.values.clear();
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }
}
