//! Storage key codec.
//!
//! Every stored mock lives under a key of the form
//!
//! ```text
//! __MOCK_XHR__(<method>)[<times>]<url>
//! ```
//!
//! e.g. `__MOCK_XHR__(post)[always]/accounts/info`. Keys without the prefix
//! belong to someone else and are never decoded.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MockError, Result};
use crate::types::{HttpMethod, Times};

/// Prefix of every mock storage key.
pub const MOCK_PREFIX: &str = "__MOCK_XHR__";

/// Key holding the global response delay in milliseconds.
pub const DELAY_KEY: &str = "__MOCK_XHR_DELAY__";

/// Key whose presence marks the system as enabled.
pub const ENABLED_KEY: &str = "__MOCK_XHR_ENABLED__";

/// Key holding the epoch-millisecond timestamp of the last enable.
pub const ENABLED_AT_KEY: &str = "__MOCK_XHR_ENABLED_AT__";

static KEY_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{}\((\w+)\)\[(always|\d+)\](.+)$",
        regex::escape(MOCK_PREFIX)
    ))
    .expect("mock key grammar is valid")
});

/// A decoded storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockKey {
    /// HTTP method of the mock.
    pub method: HttpMethod,
    /// Repeat count.
    pub times: Times,
    /// Normalized URL, or a regex stringified as `/source/`.
    pub url: String,
}

impl MockKey {
    /// Create a new key.
    #[must_use]
    pub fn new(method: HttpMethod, times: Times, url: impl Into<String>) -> Self {
        Self {
            method,
            times,
            url: url.into(),
        }
    }

    /// Encode the key into its storage form.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self.method, self.times, &self.url)
    }
}

impl fmt::Display for MockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Encode a `(method, times, url)` triple into a storage key.
#[must_use]
pub fn encode(method: HttpMethod, times: Times, url: &str) -> String {
    format!("{MOCK_PREFIX}({method})[{times}]{url}")
}

/// Decode a storage key.
///
/// # Errors
///
/// Returns [`MockError::InvalidMockKey`] if the key does not follow the
/// grammar. Callers should treat this as corrupted storage.
pub fn decode(key: &str) -> Result<MockKey> {
    let caps = KEY_GRAMMAR
        .captures(key)
        .ok_or_else(|| MockError::invalid_key(key))?;

    let method = caps[1]
        .parse::<HttpMethod>()
        .map_err(|_| MockError::invalid_key(key))?;
    let times = caps[2]
        .parse::<Times>()
        .map_err(|_| MockError::invalid_key(key))?;

    Ok(MockKey {
        method,
        times,
        url: caps[3].to_string(),
    })
}

/// Check if a storage key belongs to a stored mock.
#[must_use]
pub fn is_mock_key(key: &str) -> bool {
    key.starts_with(MOCK_PREFIX)
}

/// Check if a storage key belongs to any of this system's namespaces.
#[must_use]
pub fn is_system_key(key: &str) -> bool {
    [MOCK_PREFIX, DELAY_KEY, ENABLED_KEY]
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_key_grammar() {
        assert_eq!(
            encode(HttpMethod::Post, Times::Always, "/accounts/info"),
            "__MOCK_XHR__(post)[always]/accounts/info"
        );
        assert_eq!(
            MockKey::new(HttpMethod::Get, Times::Count(2), "abc").to_string(),
            "__MOCK_XHR__(get)[2]abc"
        );
    }

    #[test]
    fn decodes_encoded_key() {
        let key = MockKey::new(HttpMethod::Patch, Times::Count(12), "/a/{{param}}?x=1");
        assert_eq!(decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn decodes_regex_url() {
        let decoded = decode(r"__MOCK_XHR__(get)[always]/abc\/\d+/").unwrap();
        assert_eq!(decoded.url, r"/abc\/\d+/");
    }

    #[test]
    fn rejects_keys_outside_grammar() {
        for key in [
            "__MOCK_XHR__abc",
            "__MOCK_XHR__(get)[once]/abc",
            "__MOCK_XHR__(get)[1]",
            "__MOCK_XHR__(head)[1]/abc",
            "__MOCK_XHR__(get)[99999999999]/abc",
        ] {
            assert!(
                matches!(decode(key), Err(MockError::InvalidMockKey { .. })),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn namespaces() {
        assert!(is_mock_key("__MOCK_XHR__(get)[1]/a"));
        assert!(!is_mock_key(DELAY_KEY));
        assert!(is_system_key(DELAY_KEY));
        assert!(is_system_key(ENABLED_KEY));
        assert!(!is_system_key(ENABLED_AT_KEY));
        assert!(!is_system_key("abc"));
    }
}
