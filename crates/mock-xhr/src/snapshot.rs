//! Snapshot export and import.
//!
//! A snapshot is the system's storage namespaces (mocks, global delay and the
//! enabled marker) as a JSON array of `{key, value}` objects, percent-encoded
//! so it survives being pasted through URLs and chat tools.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::{MockError, Result};
use crate::key::is_system_key;
use crate::storage::KeyValueStore;

/// Characters left unescaped, matching `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    value: String,
}

/// Export every system key of `storage`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn snapshot<S: KeyValueStore + ?Sized>(storage: &S) -> Result<String> {
    let entries: Vec<SnapshotEntry> = storage
        .entries()
        .into_iter()
        .filter(|(key, _)| is_system_key(key))
        .map(|(key, value)| SnapshotEntry { key, value })
        .collect();

    let json = serde_json::to_string(&entries)?;
    tracing::debug!(keys = entries.len(), "Snapshot taken");
    Ok(utf8_percent_encode(&json, COMPONENT).to_string())
}

/// Import a snapshot into `storage`.
///
/// Every key is checked before anything is written, so a rejected snapshot
/// leaves storage untouched. Returns the number of written keys.
///
/// # Errors
///
/// Returns [`MockError::Snapshot`] if the text cannot be decoded and
/// [`MockError::ForeignKey`] if it contains a key outside the system
/// namespaces.
pub fn apply_snapshot<S: KeyValueStore + ?Sized>(storage: &mut S, encoded: &str) -> Result<usize> {
    let json = percent_decode_str(encoded.trim())
        .decode_utf8()
        .map_err(|e| MockError::snapshot(format!("not valid utf-8 after decoding: {e}")))?;
    let entries: Vec<SnapshotEntry> = serde_json::from_str(&json)
        .map_err(|e| MockError::snapshot(format!("expected an array of key/value pairs: {e}")))?;

    if let Some(foreign) = entries.iter().find(|entry| !is_system_key(&entry.key)) {
        tracing::error!(key = %foreign.key, "Snapshot rejected");
        return Err(MockError::ForeignKey {
            key: foreign.key.clone(),
        });
    }

    for entry in &entries {
        storage.set(&entry.key, &entry.value)?;
    }
    tracing::info!(keys = entries.len(), "Snapshot applied");
    Ok(entries.len())
}
