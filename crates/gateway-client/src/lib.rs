//! WebSocket client library for the market-data gateway bridge.
//!
//! This crate provides the wire types spoken by the gateway (contracts,
//! market-data requests and tick events) and a small async client that
//! connects over WebSocket and exposes the connection as a pair of channels.
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{Contract, GatewayClient, GatewayEvent, GatewayRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_client::Error> {
//!     let mut client = GatewayClient::connect("ws://127.0.0.1:4002").await?;
//!     client.send(GatewayRequest::start_api(7, "")).await?;
//!
//!     while let Some(event) = client.recv().await {
//!         if let GatewayEvent::NextValidId { .. } = event {
//!             break;
//!         }
//!     }
//!
//!     client
//!         .send(GatewayRequest::req_mkt_data(1, Contract::stock("SPY"), "", true))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;
mod websocket;

pub use client::{ClientConfig, DEFAULT_CHANNEL_CAPACITY, GatewayClient, GatewaySender};
pub use error::Error;
pub use types::*;
