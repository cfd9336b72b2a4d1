//! Options data-quality layer.
//!
//! - [`validator`]: stateless greeks, pricing and liquidity checks
//! - [`circuit_breaker`]: consecutive-failure tracking and the trading halt
//! - [`journal`]: alert, daily log and halt files
//! - [`gate`]: breaker-gated, validated access to option data
//! - [`daily`]: the daily validation run

pub mod circuit_breaker;
pub mod daily;
pub mod gate;
pub mod journal;
pub mod validator;

pub use circuit_breaker::{CircuitBreaker, FailureOutcome};
pub use daily::{DailyReport, run_daily_validation};
pub use gate::QualityGate;
pub use journal::{HaltState, Journal, JournalError, JournalEvent};
pub use validator::{Validator, Verdict};
