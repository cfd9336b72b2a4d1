//! Broker gateway session layer.
//!
//! Turns the gateway's push-based, multiplexed event stream into awaited
//! request/response calls.

pub mod accumulator;
pub mod connector;
pub mod mock;
pub mod sanitizer;
pub mod session;

pub use accumulator::{MarketTicks, TickAccumulator};
pub use connector::{GatewayConnector, WsConnector};
pub use mock::{MockGateway, OptionScript, StockScript};
pub use sanitizer::{RawComputation, Sanitizer};
pub use session::{BrokerSession, MarketDataReply};
