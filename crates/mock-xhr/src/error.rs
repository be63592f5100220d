//! Error types for mock-xhr.
//!
//! This module defines all error types used throughout the library.
//! Declaration-time structural errors and storage corruption are returned as
//! [`MockError`]; bookkeeping problems (duplicate names, a missing base URL,
//! an out-of-range ordinal) are logged through `tracing` and never surface here.

use thiserror::Error;

use crate::key::MOCK_PREFIX;
use crate::types::HttpMethod;

/// The main error type for mock-xhr operations.
#[derive(Debug, Error)]
pub enum MockError {
    /// An empty URL was passed for normalization.
    #[error("url is empty")]
    EmptyUrl,

    /// An absolute URL could not be parsed.
    #[error("malformed url '{url}': {source}")]
    MalformedUrl {
        /// The URL that failed to parse.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// A storage key carries the mock prefix but does not follow the key grammar.
    #[error("mock key '{key}' is invalid")]
    InvalidMockKey {
        /// The offending storage key.
        key: String,
    },

    /// An HTTP method outside the supported set.
    #[error("unsupported http method '{method}', expected one of: {}", HttpMethod::names())]
    InvalidMethod {
        /// The method as given by the caller.
        method: String,
    },

    /// A response-builder URL that is neither absolute nor rooted.
    #[error("url '{url}' should start with http/https or /")]
    UnrootedUrl {
        /// The URL as given by the caller.
        url: String,
    },

    /// No registered declaration supplies data for a response builder call.
    #[error("data for mock {method} {url} was not found")]
    DataNotFound {
        /// The normalized URL that was looked up.
        url: String,
        /// The method that was looked up.
        method: HttpMethod,
    },

    /// A plain string was passed where structured response data is expected.
    #[error("response data should be JSON, use apply_ready to set a named mock")]
    StringResponseBody,

    /// A numeric status code was passed without response data.
    #[error("status should not be a number if data is missing")]
    StatusWithoutData,

    /// A non-positive response delay.
    #[error("delay should be greater than 0")]
    InvalidDelay,

    /// No registered declaration matches the given name.
    #[error("mock '{name}' was not found in registered mocks")]
    MockNotFound {
        /// The requested name.
        name: String,
    },

    /// A registered mock index outside `1..=len`.
    #[error("mock number {index} should be within registered mock indexes, not more than {len}")]
    MockIndexOutOfRange {
        /// The requested 1-based index.
        index: usize,
        /// Number of registered mocks.
        len: usize,
    },

    /// A snapshot contains a key outside the mock namespaces.
    #[error("snapshot key '{key}' is not accepted, only {MOCK_PREFIX}* and system keys are")]
    ForeignKey {
        /// The rejected key.
        key: String,
    },

    /// A snapshot could not be decoded.
    #[error("snapshot decoding failed: {message}")]
    Snapshot {
        /// Description of the failure.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid regex pattern.
    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No handler matched and the adapter is configured to fail.
    #[error("could not find mock for {method} {url}")]
    NoMatch {
        /// Method of the unmatched request.
        method: HttpMethod,
        /// URL of the unmatched request.
        url: String,
    },

    /// The passthrough transport failed or is missing.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

/// Result type alias for mock-xhr operations.
pub type Result<T> = std::result::Result<T, MockError>;

impl MockError {
    /// Create an invalid mock key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidMockKey { key: key.into() }
    }

    /// Create an invalid method error.
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod {
            method: method.into(),
        }
    }

    /// Create a snapshot error.
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this error indicates corrupted durable storage.
    #[must_use]
    pub const fn is_storage_corruption(&self) -> bool {
        matches!(self, Self::InvalidMockKey { .. } | Self::Json(_))
    }

    /// Check if this error was raised while validating a declaration.
    #[must_use]
    pub const fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyUrl
                | Self::MalformedUrl { .. }
                | Self::InvalidMethod { .. }
                | Self::UnrootedUrl { .. }
                | Self::StringResponseBody
                | Self::StatusWithoutData
        )
    }
}
