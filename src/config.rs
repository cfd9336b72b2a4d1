//! Configuration module for loading and parsing TOML configuration files.
//!
//! Every section and key is optional; absent values take the defaults below.
//! A handful of broker settings can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Upper bound for any broker timeout, in seconds.
pub const MAX_TIMEOUT_SECS: f64 = 3600.0;

/// Inclusive `[min, max]` pair, written in TOML as a two element array.
pub type Range = (f64, f64);

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker gateway connection settings.
    pub broker: BrokerConfig,
    /// Plausibility ranges applied to raw greeks.
    pub sanitizer: SanitizerConfig,
    /// Validator thresholds.
    pub data_quality: DataQualityConfig,
    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Alert, log and halt file locations.
    pub journal: JournalConfig,
}

/// Broker gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// API client identity.
    pub client_id: i32,
    /// Account code (may be empty).
    pub account: String,
    /// Seconds to wait for the readiness handshake.
    pub connect_timeout_secs: f64,
    /// Seconds to wait for each market-data request.
    pub request_timeout_secs: f64,
    /// Feed selector sent before each request (1 live .. 4 delayed-frozen).
    pub market_data_type: u8,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4002,
            client_id: 7,
            account: String::new(),
            connect_timeout_secs: 10.0,
            request_timeout_secs: 10.0,
            market_data_type: 4,
        }
    }
}

impl BrokerConfig {
    /// WebSocket URL of the gateway.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    /// Handshake timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        bounded_duration(self.connect_timeout_secs)
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        bounded_duration(self.request_timeout_secs)
    }
}

/// Seconds clamped to `[0, MAX_TIMEOUT_SECS]`; NaN maps to zero.
fn bounded_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.clamp(0.0, MAX_TIMEOUT_SECS)).unwrap_or(Duration::ZERO)
}

/// Plausible ranges for raw greeks; values outside are discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Implied volatility.
    pub implied_volatility: Range,
    /// Delta.
    pub delta: Range,
    /// Gamma.
    pub gamma: Range,
    /// Vega.
    pub vega: Range,
    /// Theta.
    pub theta: Range,
    /// Model option price.
    pub option_price: Range,
    /// Underlying price.
    pub underlying_price: Range,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            implied_volatility: (0.05, 5.0),
            delta: (0.0, 1.0),
            gamma: (0.0, 1.0),
            vega: (0.0, 10.0),
            theta: (-10.0, 0.0),
            option_price: (0.0, 10_000.0),
            underlying_price: (0.0, 100_000.0),
        }
    }
}

/// Validator thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataQualityConfig {
    /// Accepted implied volatility.
    pub iv_range: Range,
    /// Accepted call delta.
    pub delta_range_calls: Range,
    /// Accepted long call theta.
    pub theta_range_long: Range,
    /// Accepted gamma, exclusive of the lower bound.
    pub gamma_range: Range,
    /// Accepted vega, exclusive of the lower bound.
    pub vega_range: Range,
    /// Maximum relative spread `(ask - bid) / mid`.
    pub max_spread_pct: f64,
    /// Minimum bid.
    pub min_bid: f64,
    /// Minimum ask.
    pub min_ask: f64,
    /// Minimum open interest.
    pub min_open_interest: u64,
    /// Minimum daily volume.
    pub min_volume: u64,
}

impl Default for DataQualityConfig {
    fn default() -> Self {
        Self {
            iv_range: (0.10, 3.00),
            delta_range_calls: (0.01, 1.00),
            theta_range_long: (-10.0, 0.0),
            gamma_range: (0.0, 1.0),
            vega_range: (0.0, 10.0),
            max_spread_pct: 0.15,
            min_bid: 0.01,
            min_ask: 0.01,
            min_open_interest: 50,
            min_volume: 10,
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub consecutive_failures_threshold: usize,
    /// Carried for compatibility; not enforced.
    pub timeout_threshold_per_hour: u32,
    /// Carried for compatibility; the breaker only resets manually.
    pub auto_reset_after_hours: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            consecutive_failures_threshold: 3,
            timeout_threshold_per_hour: 3,
            auto_reset_after_hours: 24,
        }
    }
}

/// File locations written by the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Alert document.
    pub alerts_file: PathBuf,
    /// Directory of daily quality logs.
    pub log_dir: PathBuf,
    /// Persisted halt flag.
    pub halt_file: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            alerts_file: PathBuf::from("alerts.json"),
            log_dir: PathBuf::from("logs/data_quality"),
            halt_file: PathBuf::from("logs/data_quality/circuit_breaker.json"),
        }
    }
}

impl JournalConfig {
    /// Places every journal file under `root`.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            alerts_file: root.join("alerts.json"),
            log_dir: root.join("logs/data_quality"),
            halt_file: root.join("logs/data_quality/circuit_breaker.json"),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Loads configuration from `path` if it exists, defaults otherwise, then
    /// applies environment overrides.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be parsed or validated.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_or_default_with(path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load_or_default`] with an explicit variable lookup.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be parsed or validated.
    pub fn load_or_default_with<P, F>(path: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `BROKER_HOST`, `BROKER_PORT`, `BROKER_CLIENT_ID` and
    /// `BROKER_ACCOUNT` overrides read through `lookup`.
    ///
    /// # Errors
    /// Returns error if a numeric override does not parse.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BROKER_HOST") {
            self.broker.host = host;
        }
        if let Some(port) = lookup("BROKER_PORT") {
            self.broker.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("BROKER_PORT '{}'", port)))?;
        }
        if let Some(client_id) = lookup("BROKER_CLIENT_ID") {
            self.broker.client_id = client_id.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("BROKER_CLIENT_ID '{}'", client_id))
            })?;
        }
        if let Some(account) = lookup("BROKER_ACCOUNT") {
            self.broker.account = account;
        }
        Ok(())
    }

    /// Overrides both broker timeouts.
    pub fn set_timeouts(&mut self, seconds: f64) {
        self.broker.connect_timeout_secs = seconds;
        self.broker.request_timeout_secs = seconds;
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns `InvalidValue` describing the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.port == 0 {
            return Err(ConfigError::InvalidValue(
                "broker.port must be non-zero".to_string(),
            ));
        }
        let timeouts = [
            ("broker.connect_timeout_secs", self.broker.connect_timeout_secs),
            ("broker.request_timeout_secs", self.broker.request_timeout_secs),
        ];
        for (name, seconds) in timeouts {
            if !(seconds > 0.0 && seconds <= MAX_TIMEOUT_SECS) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be in (0, {}], got {}",
                    name, MAX_TIMEOUT_SECS, seconds
                )));
            }
        }

        let s = &self.sanitizer;
        let q = &self.data_quality;
        let ranges = [
            ("sanitizer.implied_volatility", s.implied_volatility),
            ("sanitizer.delta", s.delta),
            ("sanitizer.gamma", s.gamma),
            ("sanitizer.vega", s.vega),
            ("sanitizer.theta", s.theta),
            ("sanitizer.option_price", s.option_price),
            ("sanitizer.underlying_price", s.underlying_price),
            ("data_quality.iv_range", q.iv_range),
            ("data_quality.delta_range_calls", q.delta_range_calls),
            ("data_quality.theta_range_long", q.theta_range_long),
            ("data_quality.gamma_range", q.gamma_range),
            ("data_quality.vega_range", q.vega_range),
        ];
        for (name, (min, max)) in ranges {
            if min > max || min.is_nan() || max.is_nan() {
                return Err(ConfigError::InvalidValue(format!(
                    "{} has min {} greater than max {}",
                    name, min, max
                )));
            }
        }

        if !(q.max_spread_pct > 0.0) {
            return Err(ConfigError::InvalidValue(
                "data_quality.max_spread_pct must be positive".to_string(),
            ));
        }
        if self.circuit_breaker.consecutive_failures_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "circuit_breaker.consecutive_failures_threshold must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
