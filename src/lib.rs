//! # Options Data Gate - Broker Market Data with a Data-Quality Gate
//!
//! Bridges an asynchronous, push-based broker market-data gateway to
//! request/response quote operations, locates the at-the-money option of an
//! underlying, and validates every option quote before it can be used for
//! trading. Repeated validation failures trip a circuit breaker that halts
//! all option-data requests until an operator resets it.
//!
//! ## Key Features
//!
//! - **Broker Session**: One WebSocket connection per command, a single
//!   dispatcher task applying tick events to per-request accumulators, and
//!   deadline-bounded waits for completion.
//!
//! - **ATM Discovery**: Seven candidate strikes around the underlying price,
//!   requested sequentially with early termination on the first delta in
//!   `[0.40, 0.60]`.
//!
//! - **Data-Quality Validation**: Configurable greeks, pricing and liquidity
//!   checks.
//!
//! - **Circuit Breaker**: Halts option data after consecutive failures,
//!   persists alerts and a halt flag, and only resets manually.
//!
//! ## Architecture
//!
//! ```text
//! CLI command
//!   └── QualityGate                  breaker check, validation, failure recording
//!         ├── CircuitBreaker          consecutive failures → alert + halt file
//!         ├── atm::discover           underlying price → candidate strikes → greeks
//!         └── BrokerSession           request ids, accumulators, completion signals
//!               └── GatewayConnector  WebSocket gateway or in-process mock
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`broker`] | Gateway session, tick accumulation, greeks sanitizing, mock gateway |
//! | [`atm`] | At-the-money strike discovery |
//! | [`strikes`] | Strike increments, rounding and candidates |
//! | [`calendar`] | Monthly expiration dates |
//! | [`history`] | Daily bars and the 200-day moving average |
//! | [`quality`] | Validator, circuit breaker, journal, quality gate, daily run |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`error`] | Error types and the `{error, code}` response body |
//! | [`models`] | Quotes, greeks, alerts and breaker status |
//! | [`state`] | Application state |
//! | [`cli`] / [`commands`] | Command-line interface |
//!
//! ## Commands
//!
//! | Command | Description | Breaker-gated |
//! |---------|-------------|---------------|
//! | `quote TICKER` | Underlying snapshot | no |
//! | `historical TICKER` | Daily bars and MA200 (`--days`, default 210) | no |
//! | `quote_option TICKER` | Validated option quote (`--raw` skips validation) | yes |
//! | `atm_iv TICKER` | ATM implied volatility | yes |
//! | `breaker_status` | Circuit breaker state | no |
//! | `reset_breaker --confirm` | Manual reset | no |
//! | `validate` | Daily data-quality run | yes |
//!
//! ## Example Usage
//!
//! ```bash
//! # Validated ATM call for the next monthly expiration
//! options-data-gate quote_option SPY
//!
//! # Raw quote for a specific contract
//! options-data-gate quote_option SPY --strike 500 --expiration 2026-02-20 --raw
//!
//! # After reviewing logs/data_quality/
//! options-data-gate reset_breaker --confirm
//! ```
//!
//! Exit codes: `0` success, `1` failure, `2` circuit breaker active or tripped.
//!
//! ## Dependencies
//!
//! - **tokio** (1.49): Async runtime
//! - **tokio-tungstenite** (0.28): WebSocket transport (via `gateway-client`)
//! - **dashmap** (6.1): Per-request accumulators
//! - **parking_lot** (0.12): Breaker and session locks
//! - **clap** (4.4): Command-line parsing
//! - **serde** (1.0) / **toml** (0.9): Configuration and JSON output
//! - **tracing** (0.1): Structured logging

pub mod atm;
pub mod broker;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod quality;
pub mod state;
pub mod strikes;
