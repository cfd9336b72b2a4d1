//! Unit tests for config module.

use super::*;
use std::collections::HashMap;

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_parse_full_config() {
    let toml_content = r#"
[broker]
host = "10.0.0.2"
port = 4001
client_id = 11
account = "DU123"
connect_timeout_secs = 5.0
request_timeout_secs = 20.0
market_data_type = 1

[sanitizer]
implied_volatility = [0.01, 4.0]

[data_quality]
iv_range = [0.05, 2.5]
max_spread_pct = 0.25
min_open_interest = 100

[circuit_breaker]
consecutive_failures_threshold = 5

[journal]
alerts_file = "/tmp/gate/alerts.json"
log_dir = "/tmp/gate/logs"
halt_file = "/tmp/gate/halt.json"
"#;

    let config = Config::parse(toml_content).expect("should parse");
    assert_eq!(config.broker.host, "10.0.0.2");
    assert_eq!(config.broker.port, 4001);
    assert_eq!(config.broker.client_id, 11);
    assert_eq!(config.broker.account, "DU123");
    assert_eq!(config.broker.market_data_type, 1);
    assert_eq!(config.broker.request_timeout(), Duration::from_secs(20));
    assert_eq!(config.sanitizer.implied_volatility, (0.01, 4.0));
    assert_eq!(config.sanitizer.delta, (0.0, 1.0));
    assert_eq!(config.data_quality.iv_range, (0.05, 2.5));
    assert_eq!(config.data_quality.max_spread_pct, 0.25);
    assert_eq!(config.data_quality.min_open_interest, 100);
    assert_eq!(config.data_quality.min_volume, 10);
    assert_eq!(config.circuit_breaker.consecutive_failures_threshold, 5);
    assert_eq!(config.journal.halt_file, PathBuf::from("/tmp/gate/halt.json"));
}

#[test]
fn test_parse_empty_uses_defaults() {
    let config = Config::parse("").expect("should parse");

    assert_eq!(config.broker.host, "127.0.0.1");
    assert_eq!(config.broker.port, 4002);
    assert_eq!(config.broker.client_id, 7);
    assert_eq!(config.broker.market_data_type, 4);
    assert_eq!(config.data_quality.delta_range_calls, (0.01, 1.0));
    assert_eq!(config.circuit_breaker.consecutive_failures_threshold, 3);
    assert_eq!(config.circuit_breaker.auto_reset_after_hours, 24);
    assert_eq!(config.journal.alerts_file, PathBuf::from("alerts.json"));
}

#[test]
fn test_parse_invalid_toml() {
    let result = Config::parse("[broker\nport = ");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_broker_url() {
    let config = Config::default();
    assert_eq!(config.broker.url(), "ws://127.0.0.1:4002");
}

#[test]
fn test_load_missing_file_yields_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = Config::load_or_default_with(&path, |_| None).unwrap();
    assert_eq!(config.broker.port, 4002);
    assert_eq!(config.circuit_breaker.consecutive_failures_threshold, 3);
}

#[test]
fn test_load_or_default_applies_overrides() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = Config::load_or_default_with(&path, |key| {
        (key == "BROKER_HOST").then(|| "gw.internal".to_string())
    })
    .unwrap();
    assert_eq!(config.broker.host, "gw.internal");
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("gate.toml");
    fs::write(&path, "[circuit_breaker]\nconsecutive_failures_threshold = 4\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.circuit_breaker.consecutive_failures_threshold, 4);
}

#[test]
fn test_shipped_config_matches_defaults() {
    let config = Config::parse(include_str!("../../config/gate.toml")).unwrap();
    let defaults = Config::default();

    assert_eq!(config.broker.port, defaults.broker.port);
    assert_eq!(config.sanitizer.theta, defaults.sanitizer.theta);
    assert_eq!(config.data_quality.iv_range, defaults.data_quality.iv_range);
    assert_eq!(
        config.circuit_breaker.consecutive_failures_threshold,
        defaults.circuit_breaker.consecutive_failures_threshold
    );
    assert_eq!(config.journal.halt_file, defaults.journal.halt_file);
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("BROKER_HOST", "gateway.local"),
        ("BROKER_PORT", "7497"),
        ("BROKER_CLIENT_ID", "21"),
        ("BROKER_ACCOUNT", "DU999"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config
        .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.broker.host, "gateway.local");
    assert_eq!(config.broker.port, 7497);
    assert_eq!(config.broker.client_id, 21);
    assert_eq!(config.broker.account, "DU999");
}

#[test]
fn test_env_override_bad_port() {
    let mut config = Config::default();
    let result = config.apply_env_overrides(|key| {
        (key == "BROKER_PORT").then(|| "not-a-port".to_string())
    });

    assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
}

#[test]
fn test_set_timeouts() {
    let mut config = Config::default();
    config.set_timeouts(2.5);

    assert_eq!(config.broker.connect_timeout(), Duration::from_millis(2500));
    assert_eq!(config.broker.request_timeout(), Duration::from_millis(2500));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_validation_default_ok() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_validation_port_zero() {
    let mut config = Config::default();
    config.broker.port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_non_positive_timeout() {
    let mut config = Config::default();
    config.broker.request_timeout_secs = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_unbounded_timeout() {
    let mut config = Config::default();
    config.set_timeouts(1e30);
    assert!(config.validate().is_err());

    config.set_timeouts(f64::NAN);
    assert!(config.validate().is_err());

    config.set_timeouts(MAX_TIMEOUT_SECS);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_infinite_timeout_rejected() {
    let result = Config::parse("[broker]\nrequest_timeout_secs = inf\n");

    let Err(ConfigError::InvalidValue(message)) = result else {
        panic!("infinite timeout accepted");
    };
    assert!(message.contains("broker.request_timeout_secs"));
}

#[test]
fn test_timeout_accessors_never_panic() {
    let mut config = Config::default();
    config.set_timeouts(1e30);
    assert_eq!(
        config.broker.request_timeout(),
        Duration::from_secs_f64(MAX_TIMEOUT_SECS)
    );

    config.set_timeouts(f64::INFINITY);
    assert_eq!(
        config.broker.connect_timeout(),
        Duration::from_secs_f64(MAX_TIMEOUT_SECS)
    );

    config.set_timeouts(f64::NAN);
    assert_eq!(config.broker.request_timeout(), Duration::ZERO);

    config.set_timeouts(-4.0);
    assert_eq!(config.broker.connect_timeout(), Duration::ZERO);
}

#[test]
fn test_validation_inverted_range() {
    let mut config = Config::default();
    config.data_quality.iv_range = (3.0, 0.1);

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("data_quality.iv_range"));
}

#[test]
fn test_validation_zero_threshold() {
    let mut config = Config::default();
    config.circuit_breaker.consecutive_failures_threshold = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_spread() {
    let mut config = Config::default();
    config.data_quality.max_spread_pct = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_journal_rooted_at() {
    let journal = JournalConfig::rooted_at(Path::new("/var/gate"));

    assert_eq!(journal.alerts_file, PathBuf::from("/var/gate/alerts.json"));
    assert_eq!(journal.log_dir, PathBuf::from("/var/gate/logs/data_quality"));
}
