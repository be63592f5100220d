//! Integration tests for configuration handling.

use std::time::Duration;

use mock_xhr::config::{env::vars, file};
use mock_xhr::{
    AutoDisable, EnvConfig, LogFormat, LoggingConfig, MockConfig, MockError, NoMatchPolicy,
};

#[test]
fn mock_config_default() {
    let config = MockConfig::default();
    assert_eq!(config.base_url, "/");
    assert_eq!(
        config.auto_disable.interval(),
        Some(Duration::from_secs(2 * 24 * 60 * 60))
    );
    assert_eq!(config.status_codes.success, 200);
    assert_eq!(config.status_codes.error, 424);
    assert_eq!(config.no_match, NoMatchPolicy::Passthrough);
    assert_eq!(config.logging.format, LogFormat::Plain);
}

#[test]
fn mock_config_builder_pattern() {
    let config = MockConfig::new()
        .base_url("https://api.test")
        .auto_disable(AutoDisable::Off)
        .success_status(201)
        .error_status(503)
        .no_match(NoMatchPolicy::Error)
        .logging(LoggingConfig::new().level("debug").format(LogFormat::Compact));

    assert_eq!(config.base_url, "https://api.test");
    assert_eq!(config.auto_disable.interval(), None);
    assert_eq!(config.status_codes.success, 201);
    assert_eq!(config.status_codes.error, 503);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn auto_disable_parsing() {
    assert_eq!(AutoDisable::parse("true"), Some(AutoDisable::default()));
    assert_eq!(AutoDisable::parse("off"), Some(AutoDisable::Off));
    assert_eq!(
        AutoDisable::parse("60000"),
        Some(AutoDisable::After(Duration::from_secs(60)))
    );
    assert_eq!(AutoDisable::parse("soon"), None);
}

#[test]
fn no_match_policy_parsing() {
    assert_eq!("throw".parse::<NoMatchPolicy>().unwrap(), NoMatchPolicy::Error);
    assert_eq!("404".parse::<NoMatchPolicy>().unwrap(), NoMatchPolicy::NotFound);
    assert!("ignore".parse::<NoMatchPolicy>().is_err());
}

#[test]
fn toml_round_trip() {
    let config = MockConfig::new()
        .base_url("/api")
        .auto_disable(AutoDisable::After(Duration::from_secs(3600)))
        .no_match(NoMatchPolicy::NotFound);

    let text = file::to_toml_string(&config).unwrap();
    assert_eq!(file::from_toml_str(&text).unwrap(), config);
}

#[test]
fn toml_with_partial_tables() {
    let config = file::from_toml_str(
        r#"
        auto_disable = false

        [status_codes]
        error = 500
        "#,
    )
    .unwrap();

    assert_eq!(config.base_url, "/");
    assert_eq!(config.auto_disable, AutoDisable::Off);
    assert_eq!(config.status_codes.success, 200);
    assert_eq!(config.status_codes.error, 500);
}

#[test]
fn invalid_toml_is_config_error() {
    assert!(matches!(
        file::from_toml_str("base_url = 3"),
        Err(MockError::Config { .. })
    ));
}

#[test]
fn env_overlays_file() {
    let path = std::env::temp_dir().join(format!("mock-xhr-config-{}.toml", std::process::id()));
    std::fs::write(&path, "base_url = \"/from-file\"\nno_match = \"error\"\n").unwrap();

    let env = EnvConfig::from_vars(
        "MOCK_XHR",
        [
            (format!("MOCK_XHR_{}", vars::CONFIG), path.display().to_string()),
            (format!("MOCK_XHR_{}", vars::SUCCESS_STATUS), "204".to_string()),
        ],
    );
    let config = env.load().unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.base_url, "/from-file");
    assert_eq!(config.no_match, NoMatchPolicy::Error);
    assert_eq!(config.status_codes.success, 204);
}

#[test]
fn invalid_env_value_is_reported() {
    let env = EnvConfig::from_vars("MOCK_XHR", [("MOCK_XHR_ERROR_STATUS", "teapot")]);
    let err = env.apply(MockConfig::default()).unwrap_err();
    assert!(err.to_string().contains("MOCK_XHR_ERROR_STATUS"));
}

#[test]
fn missing_config_file_has_context() {
    let err = file::load("/definitely/not/here/mock-xhr.toml").unwrap_err();
    assert!(matches!(err, MockError::IoWithContext { .. }));
    assert!(err.to_string().contains("reading config"));
}
