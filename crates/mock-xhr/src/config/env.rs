//! Environment-based configuration.
//!
//! Variables are read through an injectable source so tests never touch the
//! process environment.

use std::collections::HashMap;

use crate::adapter::NoMatchPolicy;
use crate::config::{AutoDisable, LogFormat, MockConfig};
use crate::error::{MockError, Result};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "MOCK_XHR";

/// Recognized variable names, without the prefix.
pub mod vars {
    /// Base URL.
    pub const BASE_URL: &str = "BASE_URL";
    /// Auto-disable: `true`, `false` or milliseconds.
    pub const AUTO_DISABLE: &str = "AUTO_DISABLE";
    /// Success status code.
    pub const SUCCESS_STATUS: &str = "SUCCESS_STATUS";
    /// Error status code.
    pub const ERROR_STATUS: &str = "ERROR_STATUS";
    /// No-match policy.
    pub const NO_MATCH: &str = "NO_MATCH";
    /// Log filter directive.
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    /// Log format.
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    /// Path of a TOML config file.
    pub const CONFIG: &str = "CONFIG";
}

enum Source {
    Process,
    Map(HashMap<String, String>),
}

/// Environment variable reader.
pub struct EnvConfig {
    prefix: String,
    source: Source,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            Source::Process => "process",
            Source::Map(_) => "map",
        };
        f.debug_struct("EnvConfig")
            .field("prefix", &self.prefix)
            .field("source", &source)
            .finish()
    }
}

impl EnvConfig {
    /// Read variables from the process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            source: Source::Process,
        }
    }

    /// Read variables from a fixed set of pairs (full names, prefix included).
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            source: Source::Map(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        match &self.source {
            Source::Process => std::env::var(&var_name).ok(),
            Source::Map(map) => map.get(&var_name).cloned(),
        }
    }

    /// Check if a variable is set.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    MockError::config(format!("{} has invalid value '{raw}'", self.var_name(name)))
                })
            })
            .transpose()
    }

    /// Overlay every set variable onto `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::Config`] if a variable is set to an invalid value.
    pub fn apply(&self, mut config: MockConfig) -> Result<MockConfig> {
        if let Some(base_url) = self.get(vars::BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(raw) = self.get(vars::AUTO_DISABLE) {
            config.auto_disable = AutoDisable::parse(&raw).ok_or_else(|| {
                MockError::config(format!(
                    "{} should be true, false or milliseconds, got '{raw}'",
                    self.var_name(vars::AUTO_DISABLE)
                ))
            })?;
        }
        if let Some(code) = self.parse::<u16>(vars::SUCCESS_STATUS)? {
            config.status_codes.success = code;
        }
        if let Some(code) = self.parse::<u16>(vars::ERROR_STATUS)? {
            config.status_codes.error = code;
        }
        if let Some(policy) = self.get(vars::NO_MATCH) {
            config.no_match = policy.parse::<NoMatchPolicy>()?;
        }
        if let Some(level) = self.get(vars::LOG_LEVEL) {
            config.logging.level = level;
        }
        if let Some(format) = self.get(vars::LOG_FORMAT) {
            config.logging.format = format.parse::<LogFormat>()?;
        }
        Ok(config)
    }

    /// Build a configuration: defaults, then the file named by
    /// `MOCK_XHR_CONFIG` if set, then the remaining variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or a variable is invalid.
    pub fn load(&self) -> Result<MockConfig> {
        let base = match self.get(vars::CONFIG) {
            Some(path) => super::file::load(path)?,
            None => MockConfig::default(),
        };
        self.apply(base)
    }
}
