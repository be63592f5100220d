//! Common types for mock-xhr.
//!
//! This module defines the vocabulary shared by every stage of the pipeline:
//! HTTP methods, repeat counts, status codes, response headers and the
//! literal-or-regex URL pattern carried from declaration to installation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MockError, Result};
use crate::pattern::CompiledRegex;

/// Response headers attached to a canned reply.
///
/// Values may be strings, numbers or booleans.
pub type ResponseHeaders = BTreeMap<String, serde_json::Value>;

/// HTTP methods a mock can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// All supported methods.
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete];

    /// Lowercase method name as used in storage keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }

    /// Comma-separated list of supported method names.
    #[must_use]
    pub fn names() -> String {
        Self::ALL.map(Self::as_str).join(", ")
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            _ => Err(MockError::invalid_method(s)),
        }
    }
}

/// How many times a stored mock fires.
///
/// Counts are one-shot handlers consumed in ascending order; `Always` repeats
/// and is ordered after every count for the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Times {
    /// Serve once, at the given position among same-endpoint mocks.
    Count(u32),
    /// Serve every matching request.
    #[default]
    Always,
}

/// Token used for [`Times::Always`] in storage keys.
pub const ALWAYS_TOKEN: &str = "always";

impl Times {
    /// Check if this is a repeating mock.
    #[must_use]
    pub const fn is_always(self) -> bool {
        matches!(self, Self::Always)
    }
}

impl Ord for Times {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) => a.cmp(b),
            (Self::Count(_), Self::Always) => Ordering::Less,
            (Self::Always, Self::Count(_)) => Ordering::Greater,
            (Self::Always, Self::Always) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Times {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Always => f.write_str(ALWAYS_TOKEN),
        }
    }
}

impl FromStr for Times {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == ALWAYS_TOKEN {
            Ok(Self::Always)
        } else {
            s.parse().map(Self::Count)
        }
    }
}

impl From<u32> for Times {
    fn from(n: u32) -> Self {
        Self::Count(n)
    }
}

/// A status as declared by the caller.
///
/// `Success` and `Error` resolve to the configured default codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeStatus {
    /// The configured success status (200 by default).
    Success,
    /// The configured error status (424 by default).
    Error,
    /// An explicit status code.
    Code(u16),
}

impl CodeStatus {
    /// Check if this is an explicit numeric code.
    #[must_use]
    pub const fn is_code(self) -> bool {
        matches!(self, Self::Code(_))
    }
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
            Self::Code(code) => write!(f, "{code}"),
        }
    }
}

impl From<u16> for CodeStatus {
    fn from(code: u16) -> Self {
        Self::Code(code)
    }
}

impl Serialize for CodeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success => serializer.serialize_str("success"),
            Self::Error => serializer.serialize_str("error"),
            Self::Code(code) => serializer.serialize_u16(*code),
        }
    }
}

impl<'de> Deserialize<'de> for CodeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Named(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(Self::Code(code)),
            Raw::Named(name) => match name.as_str() {
                "success" => Ok(Self::Success),
                "error" => Ok(Self::Error),
                other => Err(serde::de::Error::custom(format!(
                    "unknown status '{other}'"
                ))),
            },
        }
    }
}

/// Per-mock response options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockOptions {
    /// Response delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

impl MockOptions {
    /// Options with a response delay.
    #[must_use]
    pub const fn with_delay(delay: u64) -> Self {
        Self { delay: Some(delay) }
    }

    /// The delay as a duration, if set and non-zero.
    #[must_use]
    pub fn delay_duration(&self) -> Option<Duration> {
        self.delay.filter(|d| *d > 0).map(Duration::from_millis)
    }
}

/// A URL as carried through the pipeline: literal text or a caller-supplied regex.
#[derive(Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// A literal URL, possibly containing sentinel tokens after normalization.
    Literal(String),
    /// A regular expression supplied by the caller.
    Regex(CompiledRegex),
}

impl UrlPattern {
    /// Create a literal pattern.
    #[must_use]
    pub fn literal(url: impl Into<String>) -> Self {
        Self::Literal(url.into())
    }

    /// Create a regex pattern.
    pub fn regex(source: &str) -> Result<Self> {
        Ok(Self::Regex(CompiledRegex::compile(source)?))
    }

    /// Revive a pattern from its stringified form (`/source/` for regexes).
    pub fn from_stored(stored: &str, is_regex: bool) -> Result<Self> {
        if is_regex {
            let source = stored
                .strip_prefix('/')
                .and_then(|s| s.strip_suffix('/'))
                .unwrap_or(stored);
            Self::regex(source)
        } else {
            Ok(Self::Literal(stored.to_string()))
        }
    }

    /// Check if this is a regex pattern.
    #[must_use]
    pub const fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }

    /// Get the literal text, if this is a literal pattern.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            Self::Regex(_) => None,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Regex(r) => write!(f, "/{}/", r.pattern()),
        }
    }
}

impl fmt::Debug for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}
