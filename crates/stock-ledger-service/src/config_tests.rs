//! Tests for configuration defaults and validation.

use super::*;

fn valid_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhook.secret = "shared-secret".to_string();
    config
}

#[test]
fn test_defaults_match_the_upstream_service() {
    let config = ServiceConfig::default();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.processing.concurrency, 8);
    assert_eq!(config.processing.reporting_utc_offset_hours, -8);
    assert_eq!(
        config.shiphero.api_url,
        "https://public-api.shiphero.com/graphql"
    );
    assert_eq!(
        config.shiphero.auth_url,
        "https://public-api.shiphero.com/auth/refresh"
    );
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json_format);
}

#[test]
fn test_default_config_fails_validation_without_a_secret() {
    let err = ServiceConfig::default().validate().unwrap_err();
    assert!(err.to_string().contains("webhook.secret"));
}

#[test]
fn test_valid_config_passes() {
    assert!(valid_config().validate().is_ok());
}

#[test]
fn test_zero_port_is_rejected() {
    let mut config = valid_config();
    config.server.port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let mut config = valid_config();
    config.processing.concurrency = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_out_of_range_reporting_offset_is_rejected() {
    let mut config = valid_config();
    config.processing.reporting_utc_offset_hours = 24;
    assert!(config.validate().is_err());
    config.processing.reporting_utc_offset_hours = -24;
    assert!(config.validate().is_err());
}

#[test]
fn test_bogus_log_level_is_rejected() {
    let mut config = valid_config();
    config.logging.level = "loud".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_fields_deserialize_with_defaults() {
    // An empty document must deserialize; operators configure by override.
    let config: ServiceConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.server.port, 8080);

    // Partial overrides keep sibling defaults.
    let config: ServiceConfig =
        serde_json::from_str(r#"{ "server": { "port": 9090 } }"#).unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
}
