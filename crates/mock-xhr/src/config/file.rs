//! File-based configuration loading.
//!
//! ```toml
//! base_url = "https://api.example.com/v1"
//! auto_disable = 86400000
//! no_match = "not-found"
//!
//! [status_codes]
//! error = 500
//!
//! [logging]
//! level = "mock_xhr=debug"
//! format = "json"
//! ```

use std::path::Path;

use crate::config::MockConfig;
use crate::error::{MockError, Result};

/// Parse a configuration from TOML text. Missing keys take their defaults.
///
/// # Errors
///
/// Returns [`MockError::Config`] if the text is not valid TOML or a value has
/// the wrong type.
pub fn from_toml_str(content: &str) -> Result<MockConfig> {
    toml::from_str(content).map_err(|e| MockError::config(e.to_string()))
}

/// Load a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: impl AsRef<Path>) -> Result<MockConfig> {
    let path = path.as_ref();
    let content = MockError::with_io_context(
        std::fs::read_to_string(path),
        format!("reading config {}", path.display()),
    )?;
    let config = from_toml_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

/// Render a configuration as TOML.
///
/// # Errors
///
/// Returns [`MockError::Config`] if serialization fails.
pub fn to_toml_string(config: &MockConfig) -> Result<String> {
    toml::to_string(config).map_err(|e| MockError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::NoMatchPolicy;
    use crate::config::{AutoDisable, LogFormat};

    #[test]
    fn parse_full_file() {
        let content = r#"
            base_url = "https://api.example.com/v1"
            auto_disable = false
            no_match = "error"

            [status_codes]
            error = 500

            [logging]
            level = "mock_xhr=debug"
            format = "compact"
        "#;

        let config = from_toml_str(content).unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.auto_disable, AutoDisable::Off);
        assert_eq!(config.no_match, NoMatchPolicy::Error);
        assert_eq!(config.status_codes.error, 500);
        assert_eq!(config.status_codes.success, 200);
        assert_eq!(config.logging.level, "mock_xhr=debug");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(from_toml_str("").unwrap(), MockConfig::default());
    }

    #[test]
    fn wrong_type_is_config_error() {
        assert!(matches!(
            from_toml_str("base_url = 3"),
            Err(MockError::Config { .. })
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = MockConfig::new().base_url("/api").auto_disable(AutoDisable::Off);
        let text = to_toml_string(&config).unwrap();
        assert_eq!(from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_has_context() {
        let err = load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
