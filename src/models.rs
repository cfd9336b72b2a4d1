//! Request and result models shared by the gate, the breaker and the CLI.

use chrono::{DateTime, Local, NaiveDate};
use gateway_client::{Bar, ErrorReport, Right};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Label attached to every quote produced by this crate.
pub const SOURCE_LABEL: &str = "broker-gateway";

/// Lower bound of the at-the-money delta band.
pub const ATM_DELTA_MIN: f64 = 0.40;
/// Upper bound of the at-the-money delta band.
pub const ATM_DELTA_MAX: f64 = 0.60;

/// Returns true when `delta` lies in the at-the-money band.
#[must_use]
pub fn is_atm_delta(delta: Option<f64>) -> bool {
    delta.is_some_and(|d| (ATM_DELTA_MIN..=ATM_DELTA_MAX).contains(&d))
}

/// Which tick-code family a quote was assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataSource {
    /// Live feed ticks were present.
    #[serde(rename = "real-time")]
    RealTime,
    /// Only delayed feed ticks were present.
    #[serde(rename = "delayed")]
    Delayed,
    /// No primary ticks arrived.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RealTime => write!(f, "real-time"),
            Self::Delayed => write!(f, "delayed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Option risk sensitivities after sentinel cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta.
    pub delta: Option<f64>,
    /// Gamma.
    pub gamma: Option<f64>,
    /// Vega.
    pub vega: Option<f64>,
    /// Theta.
    pub theta: Option<f64>,
    /// Implied volatility as a decimal (0.25 = 25%).
    pub implied_volatility: Option<f64>,
    /// Model option price.
    pub option_price: Option<f64>,
    /// Underlying price used by the model.
    pub underlying_price: Option<f64>,
}

/// A caller's request for an option quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    /// Underlying symbol.
    pub ticker: String,
    /// Strike; `None` selects the ATM strike.
    pub strike: Option<f64>,
    /// Expiration; `None` selects the next monthly expiration.
    pub expiration: Option<NaiveDate>,
    /// Call or put.
    pub right: Right,
    /// Per-request deadline; `None` uses the configured timeout.
    pub timeout: Option<Duration>,
}

impl QuoteRequest {
    /// Creates a CALL request for `ticker` with every other field defaulted.
    #[must_use]
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            strike: None,
            expiration: None,
            right: Right::Call,
            timeout: None,
        }
    }

    /// Sets the strike.
    #[must_use]
    pub fn with_strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    /// Sets the expiration.
    #[must_use]
    pub fn with_expiration(mut self, expiration: NaiveDate) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the option right.
    #[must_use]
    pub fn with_right(mut self, right: Right) -> Self {
        self.right = right;
        self
    }

    /// Sets the request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Underlying quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Symbol.
    pub ticker: String,
    /// Contract identifier override used for the request.
    pub conid: Option<i64>,
    /// Bid price.
    pub bid: Option<f64>,
    /// Ask price.
    pub ask: Option<f64>,
    /// Last trade price.
    pub last: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Feed classification.
    pub data_type: DataSource,
    /// Source label.
    pub source: String,
    /// Whether the request deadline elapsed before completion.
    pub timed_out: bool,
    /// Gateway error notices collected during the session.
    pub errors: Vec<ErrorReport>,
}

/// Daily bars for an underlying with its long-term moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBars {
    /// Symbol.
    pub ticker: String,
    /// Bars ordered by date, oldest first.
    pub bars: Vec<Bar>,
    /// Number of bars returned.
    pub count: usize,
    /// 200-bar moving average of the closes, when enough bars arrived.
    pub ma_200: Option<f64>,
    /// Source label.
    pub source: String,
    /// Gateway error notices collected during the session.
    pub errors: Vec<ErrorReport>,
}

/// Raw option quote with greeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Underlying symbol.
    pub ticker: String,
    /// Strike price.
    pub strike: f64,
    /// Expiration (`YYYY-MM-DD`).
    pub expiration: String,
    /// Option right.
    pub right: Right,
    /// Bid price.
    pub bid: Option<f64>,
    /// Ask price.
    pub ask: Option<f64>,
    /// Last trade price.
    pub last: Option<f64>,
    /// Midpoint of bid and ask when both are positive.
    pub mid_price: Option<f64>,
    /// Daily volume.
    pub volume: Option<f64>,
    /// Open interest.
    pub open_interest: Option<f64>,
    /// Delta.
    pub delta: Option<f64>,
    /// Theta.
    pub theta: Option<f64>,
    /// Gamma.
    pub gamma: Option<f64>,
    /// Vega.
    pub vega: Option<f64>,
    /// Implied volatility.
    pub implied_volatility: Option<f64>,
    /// Underlying price reported with the greeks.
    pub underlying_price: Option<f64>,
    /// Feed classification.
    pub data_type: DataSource,
    /// Source label.
    pub source: String,
    /// Whether the request deadline elapsed before completion.
    pub timed_out: bool,
    /// Gateway error notices collected during the session.
    pub errors: Vec<ErrorReport>,
}

impl OptionQuote {
    /// Greeks of this quote as a bundle.
    #[must_use]
    pub fn greeks(&self) -> Greeks {
        Greeks {
            delta: self.delta,
            gamma: self.gamma,
            vega: self.vega,
            theta: self.theta,
            implied_volatility: self.implied_volatility,
            option_price: None,
            underlying_price: self.underlying_price,
        }
    }
}

/// Result of at-the-money discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmResult {
    /// Underlying symbol.
    pub ticker: String,
    /// Selected strike.
    pub strike: f64,
    /// Expiration (`YYYY-MM-DD`).
    pub expiration: String,
    /// Always CALL.
    pub right: Right,
    /// Delta of the selected strike.
    pub delta: Option<f64>,
    /// Implied volatility of the selected strike.
    pub implied_volatility: f64,
    /// Underlying price the candidates were built around.
    pub underlying_price: f64,
    /// Whether delta lies in the ATM band.
    pub is_atm: bool,
    /// Feed classification of the selected candidate.
    pub data_type: DataSource,
    /// Source label.
    pub source: String,
    /// Number of candidate strikes requested.
    pub strikes_checked: usize,
    /// Gateway error notices collected during the session.
    pub errors: Vec<ErrorReport>,
}

/// An option quote that passed every data-quality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedQuote {
    /// The underlying quote fields.
    #[serde(flatten)]
    pub quote: OptionQuote,
    /// Liquidity and data-source warnings.
    pub warnings: Vec<String>,
    /// Always true on a returned value.
    pub data_quality_validated: bool,
    /// When validation completed.
    pub validated_at: DateTime<Local>,
}

/// Classification of a recorded data-quality failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// The gateway could not be reached.
    BrokerConnection,
    /// The gateway answered without usable data.
    BrokerResponse,
    /// The gateway did not answer in time.
    BrokerTimeout,
    /// Greeks failed validation.
    GreeksValidation,
    /// Bid/ask failed validation.
    PricingValidation,
    /// Anything else.
    UnexpectedError,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BrokerConnection => "broker_connection",
            Self::BrokerResponse => "broker_response",
            Self::BrokerTimeout => "broker_timeout",
            Self::GreeksValidation => "greeks_validation",
            Self::PricingValidation => "pricing_validation",
            Self::UnexpectedError => "unexpected_error",
        };
        f.write_str(name)
    }
}

/// A recorded data-quality failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// When the failure was recorded.
    pub timestamp: DateTime<Local>,
    /// Failure classification.
    pub category: FailureCategory,
    /// Human-readable reason.
    pub message: String,
    /// Ticker involved, if known.
    pub ticker: Option<String>,
}

/// Operator alert written once per breaker trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identifier (`alert-YYYYMMDD-HHMMSS-xxxxxxxx`).
    pub id: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Local>,
    /// Priority label.
    pub priority: String,
    /// Alert type.
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Subsystem that raised the alert.
    pub subsystem: String,
    /// Trip reason.
    pub reason: String,
    /// What the operator must do.
    pub action_required: String,
    /// Whether an operator acknowledged the alert.
    pub acknowledged: bool,
    /// Most recent failures leading to the trip.
    pub failures: Vec<FailureRecord>,
}

/// Snapshot of the breaker for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerStatus {
    /// Whether trading is halted.
    pub tripped: bool,
    /// Current consecutive failure count.
    pub consecutive_failures: usize,
    /// Failures that trip the breaker.
    pub threshold: usize,
    /// When the breaker tripped.
    pub tripped_at: Option<DateTime<Local>>,
    /// Why the breaker tripped.
    pub reason: Option<String>,
    /// Most recent failures, at most 100.
    pub failures: Vec<FailureRecord>,
}
