//! Wire types exchanged with the market-data gateway.
//!
//! Every frame is a JSON object tagged as `{"type": ..., "data": {...}}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;


/// Locally unique identifier of a market-data request.
pub type RequestId = i64;

/// Generic tick list that asks the gateway for option greeks.
pub const GREEKS_GENERIC_TICKS: &str = "106";

/// Tick type codes used by the gateway.
pub mod tick {
    /// Live bid price.
    pub const BID: i32 = 1;
    /// Live ask price.
    pub const ASK: i32 = 2;
    /// Live last trade price.
    pub const LAST: i32 = 4;
    /// Live session high.
    pub const HIGH: i32 = 6;
    /// Daily volume (size tick).
    pub const VOLUME: i32 = 8;
    /// Model option computation.
    pub const MODEL_OPTION: i32 = 13;
    /// Delayed bid price.
    pub const DELAYED_BID: i32 = 66;
    /// Delayed ask price.
    pub const DELAYED_ASK: i32 = 67;
    /// Delayed last trade price.
    pub const DELAYED_LAST: i32 = 68;
    /// Delayed session high.
    pub const DELAYED_HIGH: i32 = 72;
    /// Open interest (size tick).
    pub const OPEN_INTEREST: i32 = 86;

    /// Primary quote fields on the live feed.
    pub const LIVE_PRIMARY: [i32; 4] = [BID, ASK, LAST, HIGH];
    /// Primary quote fields on the delayed feed.
    pub const DELAYED_PRIMARY: [i32; 4] = [DELAYED_BID, DELAYED_ASK, DELAYED_LAST, DELAYED_HIGH];

    /// Returns true when a price tick completes a request.
    #[must_use]
    pub fn is_primary(tick_type: i32) -> bool {
        LIVE_PRIMARY.contains(&tick_type) || DELAYED_PRIMARY.contains(&tick_type)
    }
}

/// Security type of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecType {
    /// Common stock or ETF.
    #[serde(rename = "STK")]
    Stock,
    /// Listed option.
    #[serde(rename = "OPT")]
    Option,
}

impl fmt::Display for SecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stock => write!(f, "STK"),
            Self::Option => write!(f, "OPT"),
        }
    }
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Right {
    /// Call option.
    #[default]
    Call,
    /// Put option.
    Put,
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Error returned when parsing an option right fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid option right: {0} (expected CALL or PUT)")]
pub struct ParseRightError(pub String);

impl FromStr for Right {
    type Err = ParseRightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CALL" | "C" => Ok(Self::Call),
            "PUT" | "P" => Ok(Self::Put),
            _ => Err(ParseRightError(s.to_string())),
        }
    }
}

/// Contract description sent with market-data requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Underlying symbol.
    pub symbol: String,
    /// Security type.
    pub sec_type: SecType,
    /// Routing exchange.
    pub exchange: String,
    /// Primary listing exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_exchange: Option<String>,
    /// Currency.
    pub currency: String,
    /// Expiration in YYYYMMDD format (options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    /// Strike price (options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    /// Option right (options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Right>,
    /// Contract multiplier (options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<String>,
    /// Broker contract identifier override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub con_id: Option<i64>,
}

impl Contract {
    /// Builds a SMART-routed USD stock contract with a NASDAQ primary listing.
    #[must_use]
    pub fn stock(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            sec_type: SecType::Stock,
            exchange: "SMART".to_string(),
            primary_exchange: Some("NASDAQ".to_string()),
            currency: "USD".to_string(),
            expiration: None,
            strike: None,
            right: None,
            multiplier: None,
            con_id: None,
        }
    }

    /// Builds a SMART-routed USD option contract.
    ///
    /// # Arguments
    /// * `symbol` - Underlying ticker
    /// * `expiration` - Expiration as `YYYY-MM-DD` or `YYYYMMDD`
    /// * `strike` - Strike price
    /// * `right` - Call or put
    #[must_use]
    pub fn option(symbol: &str, expiration: &str, strike: f64, right: Right) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            sec_type: SecType::Option,
            exchange: "SMART".to_string(),
            primary_exchange: None,
            currency: "USD".to_string(),
            expiration: Some(expiration.replace('-', "")),
            strike: Some(strike),
            right: Some(right),
            multiplier: Some("100".to_string()),
            con_id: None,
        }
    }

    /// Sets the broker contract identifier.
    #[must_use]
    pub fn with_con_id(mut self, con_id: Option<i64>) -> Self {
        self.con_id = con_id;
        self
    }

    /// Stable human-readable key, e.g. `SPY` or `SPY 20260220 500 CALL`.
    #[must_use]
    pub fn key(&self) -> String {
        match self.sec_type {
            SecType::Stock => self.symbol.clone(),
            SecType::Option => format!(
                "{} {} {} {}",
                self.symbol,
                self.expiration.as_deref().unwrap_or("-"),
                self.strike.map_or_else(|| "-".to_string(), |s| s.to_string()),
                self.right.map_or_else(|| "-".to_string(), |r| r.to_string()),
            ),
        }
    }
}

/// Error notice reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Request the notice refers to (-1 for connection-level notices).
    pub req_id: RequestId,
    /// Gateway error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

/// One historical bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar date, `YYYYMMDD` for daily bars.
    pub date: String,
    /// Opening price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
    /// Volume-weighted average price.
    #[serde(default)]
    pub wap: f64,
    /// Number of trades in the bar.
    #[serde(default)]
    pub bar_count: i64,
}

/// Events pushed by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Readiness handshake carrying the next usable order id.
    NextValidId {
        /// Next valid order identifier.
        order_id: i64,
    },
    /// Price tick.
    TickPrice {
        /// Request identifier.
        req_id: RequestId,
        /// Tick type code.
        tick_type: i32,
        /// Price value.
        price: f64,
    },
    /// Size tick.
    TickSize {
        /// Request identifier.
        req_id: RequestId,
        /// Tick type code.
        tick_type: i32,
        /// Size value.
        size: f64,
    },
    /// Option risk-sensitivity computation. Raw values may carry sentinels.
    TickOptionComputation {
        /// Request identifier.
        req_id: RequestId,
        /// Tick type code.
        tick_type: i32,
        /// Implied volatility.
        implied_vol: Option<f64>,
        /// Delta.
        delta: Option<f64>,
        /// Option price.
        opt_price: Option<f64>,
        /// Present value of dividends.
        pv_dividend: Option<f64>,
        /// Gamma.
        gamma: Option<f64>,
        /// Vega.
        vega: Option<f64>,
        /// Theta.
        theta: Option<f64>,
        /// Underlying price.
        und_price: Option<f64>,
    },
    /// End of a snapshot request.
    TickSnapshotEnd {
        /// Request identifier.
        req_id: RequestId,
    },
    /// One bar of a historical data request.
    HistoricalData {
        /// Request identifier.
        req_id: RequestId,
        /// The bar.
        bar: Bar,
    },
    /// End of a historical data request.
    HistoricalDataEnd {
        /// Request identifier.
        req_id: RequestId,
        /// First bar date.
        #[serde(default)]
        start: String,
        /// Last bar date.
        #[serde(default)]
        end: String,
    },
    /// Error or informational notice.
    Error {
        /// Request identifier (-1 for connection-level notices).
        req_id: RequestId,
        /// Gateway error code.
        code: i32,
        /// Message text.
        message: String,
    },
}

impl GatewayEvent {
    /// Request identifier the event belongs to, if any.
    #[must_use]
    pub fn req_id(&self) -> Option<RequestId> {
        match self {
            Self::NextValidId { .. } => None,
            Self::TickPrice { req_id, .. }
            | Self::TickSize { req_id, .. }
            | Self::TickOptionComputation { req_id, .. }
            | Self::TickSnapshotEnd { req_id }
            | Self::HistoricalData { req_id, .. }
            | Self::HistoricalDataEnd { req_id, .. }
            | Self::Error { req_id, .. } => Some(*req_id),
        }
    }
}

/// Requests sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// Starts the API session.
    StartApi {
        /// Client identity.
        client_id: i32,
        /// Account code (may be empty).
        #[serde(default, skip_serializing_if = "String::is_empty")]
        account: String,
    },
    /// Selects the market data feed (1 live, 2 frozen, 3 delayed, 4 delayed-frozen).
    MarketDataType {
        /// Feed selector.
        market_data_type: u8,
    },
    /// Requests market data for a contract.
    ReqMktData {
        /// Request identifier.
        req_id: RequestId,
        /// Contract to quote.
        contract: Contract,
        /// Comma separated generic tick list.
        #[serde(default)]
        generic_ticks: String,
        /// One-shot snapshot instead of a stream.
        snapshot: bool,
    },
    /// Cancels a streaming request.
    CancelMktData {
        /// Request identifier.
        req_id: RequestId,
    },
    /// Requests historical bars ending now.
    ReqHistoricalData {
        /// Request identifier.
        req_id: RequestId,
        /// Contract to fetch.
        contract: Contract,
        /// Lookback, e.g. `210 D`.
        duration: String,
        /// Bar size, e.g. `1 day`.
        bar_size: String,
        /// Price series, e.g. `TRADES`.
        what_to_show: String,
        /// Regular trading hours only.
        use_rth: bool,
    },
}

impl GatewayRequest {
    /// Creates a start_api request.
    #[must_use]
    pub fn start_api(client_id: i32, account: &str) -> Self {
        Self::StartApi {
            client_id,
            account: account.to_string(),
        }
    }

    /// Creates a market_data_type request.
    #[must_use]
    pub fn market_data_type(market_data_type: u8) -> Self {
        Self::MarketDataType { market_data_type }
    }

    /// Creates a req_mkt_data request.
    #[must_use]
    pub fn req_mkt_data(
        req_id: RequestId,
        contract: Contract,
        generic_ticks: &str,
        snapshot: bool,
    ) -> Self {
        Self::ReqMktData {
            req_id,
            contract,
            generic_ticks: generic_ticks.to_string(),
            snapshot,
        }
    }

    /// Creates a cancel_mkt_data request.
    #[must_use]
    pub fn cancel_mkt_data(req_id: RequestId) -> Self {
        Self::CancelMktData { req_id }
    }

    /// Creates a req_historical_data request for `days` daily trade bars
    /// within regular trading hours.
    #[must_use]
    pub fn req_historical_data(req_id: RequestId, contract: Contract, days: u32) -> Self {
        Self::ReqHistoricalData {
            req_id,
            contract,
            duration: format!("{} D", days),
            bar_size: "1 day".to_string(),
            what_to_show: "TRADES".to_string(),
            use_rth: true,
        }
    }
}
