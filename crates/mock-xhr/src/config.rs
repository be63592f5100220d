//! Configuration types for mock-xhr.
//!
//! [`MockConfig`] holds the options fixed when the system is created: base
//! URL, auto-disable interval, default status codes, the adapter's no-match
//! policy and logging. Values can come from code, a TOML file
//! ([`file`]) or `MOCK_XHR_*` environment variables ([`env`]).

pub mod env;
pub mod file;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::adapter::NoMatchPolicy;
use crate::types::CodeStatus;

pub use env::EnvConfig;

/// Default base URL.
pub const DEFAULT_BASE_URL: &str = "/";

/// Default auto-disable interval (2 days).
pub const DEFAULT_AUTO_DISABLE: Duration = Duration::from_secs(60 * 60 * 24 * 2);

/// Default status code for [`CodeStatus::Success`].
pub const DEFAULT_SUCCESS_STATUS: u16 = 200;

/// Default status code for [`CodeStatus::Error`].
pub const DEFAULT_ERROR_STATUS: u16 = 424;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Base URL relative mocks are resolved against.
    pub base_url: String,

    /// When an enabled system switches itself off.
    pub auto_disable: AutoDisable,

    /// How the adapter settles unmatched requests.
    pub no_match: NoMatchPolicy,

    /// Codes used for `success` and `error` statuses.
    pub status_codes: StatusCodes,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auto_disable: AutoDisable::default(),
            no_match: NoMatchPolicy::default(),
            status_codes: StatusCodes::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MockConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the auto-disable behaviour.
    #[must_use]
    pub const fn auto_disable(mut self, auto_disable: AutoDisable) -> Self {
        self.auto_disable = auto_disable;
        self
    }

    /// Set the success status code.
    #[must_use]
    pub const fn success_status(mut self, code: u16) -> Self {
        self.status_codes.success = code;
        self
    }

    /// Set the error status code.
    #[must_use]
    pub const fn error_status(mut self, code: u16) -> Self {
        self.status_codes.error = code;
        self
    }

    /// Set the no-match policy.
    #[must_use]
    pub const fn no_match(mut self, policy: NoMatchPolicy) -> Self {
        self.no_match = policy;
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Auto-disable behaviour.
///
/// In files and environment variables this is written as `true` (default
/// interval), `false` (never) or a number of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoDisable {
    /// Never disable automatically.
    Off,
    /// Disable once this long has passed since the last enable.
    After(Duration),
}

impl Default for AutoDisable {
    fn default() -> Self {
        Self::After(DEFAULT_AUTO_DISABLE)
    }
}

impl AutoDisable {
    /// The interval, if auto-disable is on.
    #[must_use]
    pub const fn interval(self) -> Option<Duration> {
        match self {
            Self::Off => None,
            Self::After(interval) => Some(interval),
        }
    }

    /// Parse the `true` / `false` / milliseconds form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" => Some(Self::default()),
            "false" | "off" | "no" | "0" => Some(Self::Off),
            ms => ms.parse().ok().map(|ms| Self::After(Duration::from_millis(ms))),
        }
    }
}

impl fmt::Display for AutoDisable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::After(interval) => write!(f, "{}ms", interval.as_millis()),
        }
    }
}

impl Serialize for AutoDisable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Off => serializer.serialize_bool(false),
            Self::After(interval) => {
                serializer.serialize_u64(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX))
            }
        }
    }
}

impl<'de> Deserialize<'de> for AutoDisable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Millis(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Self::default(),
            Raw::Flag(false) | Raw::Millis(0) => Self::Off,
            Raw::Millis(ms) => Self::After(Duration::from_millis(ms)),
        })
    }
}

/// Codes substituted for named statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCodes {
    /// Code for [`CodeStatus::Success`].
    pub success: u16,
    /// Code for [`CodeStatus::Error`].
    pub error: u16,
}

impl Default for StatusCodes {
    fn default() -> Self {
        Self {
            success: DEFAULT_SUCCESS_STATUS,
            error: DEFAULT_ERROR_STATUS,
        }
    }
}

impl StatusCodes {
    /// Resolve a declared status to a numeric code.
    #[must_use]
    pub const fn resolve(self, status: CodeStatus) -> u16 {
        match status {
            CodeStatus::Success => self.success,
            CodeStatus::Error => self.error,
            CodeStatus::Code(code) => code,
        }
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Include the event target in output.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directive.
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set whether targets are printed.
    #[must_use]
    pub const fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Plain,
    /// Abbreviated single lines.
    Compact,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = crate::error::MockError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "full" => Ok(Self::Plain),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(crate::error::MockError::config(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}
