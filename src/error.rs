//! Error types for the data-quality gate.

use crate::config::ConfigError;
use crate::models::FailureCategory;
use serde::{Deserialize, Serialize};


/// Error response body printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

/// Gate error types.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The gateway did not confirm readiness in time.
    #[error("Connection timeout: gateway not ready after {0:.1}s")]
    ConnectionTimeout(f64),

    /// The gateway socket could not be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport failure after the session was established.
    #[error("Transport error: {0}")]
    Transport(#[from] gateway_client::Error),

    /// No last trade, midpoint or override for the underlying.
    #[error("Missing underlying price for {0}")]
    MissingUnderlyingPrice(String),

    /// No candidate strike produced implied volatility.
    #[error("No options data available for {0}")]
    NoOptionsData(String),

    /// Historical bars did not finish before the deadline.
    #[error("Historical data timeout after {0:.1}s")]
    HistoricalTimeout(f64),

    /// A quote failed a data-quality check.
    #[error("Data quality validation failed ({category}): {reason}")]
    ValidationFailure {
        /// Failure classification.
        category: FailureCategory,
        /// Human-readable reason.
        reason: String,
    },

    /// The breaker is tripped; no broker I/O was attempted.
    #[error("Circuit breaker active: options trading halted until manual reset")]
    CircuitBreakerActive,

    /// This call tripped the breaker.
    #[error("OPTIONS TRADING HALTED: {reason}")]
    TradingHalted {
        /// Trip reason.
        reason: String,
    },

    /// Invalid caller input.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration problem.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl GateError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GateError::ConnectionTimeout(_) => "CONNECTION_TIMEOUT",
            GateError::ConnectionFailed(_) => "CONNECTION_FAILED",
            GateError::Transport(_) => "TRANSPORT_ERROR",
            GateError::MissingUnderlyingPrice(_) => "MISSING_UNDERLYING_PRICE",
            GateError::NoOptionsData(_) => "NO_OPTIONS_DATA",
            GateError::HistoricalTimeout(_) => "HISTORICAL_TIMEOUT",
            GateError::ValidationFailure { .. } => "VALIDATION_FAILURE",
            GateError::CircuitBreakerActive => "CIRCUIT_BREAKER_ACTIVE",
            GateError::TradingHalted { .. } => "TRADING_HALTED",
            GateError::InvalidRequest(_) => "INVALID_REQUEST",
            GateError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Returns true for errors raised by the circuit breaker.
    #[must_use]
    pub fn is_breaker(&self) -> bool {
        matches!(
            self,
            GateError::CircuitBreakerActive | GateError::TradingHalted { .. }
        )
    }

    /// Builds the error response body.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        }
    }
}
