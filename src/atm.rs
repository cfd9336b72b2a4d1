//! At-the-money option discovery.
//!
//! Resolves the underlying price, builds seven candidate strikes around it and
//! requests them one at a time for greeks, stopping at the first strike whose
//! delta lies in the ATM band.

use crate::broker::BrokerSession;
use crate::error::GateError;
use crate::models::{AtmResult, DataSource, SOURCE_LABEL, is_atm_delta};
use crate::strikes::{candidate_strikes, increment_for, round_to_increment};
use gateway_client::{Contract, GREEKS_GENERIC_TICKS, Right};
use std::time::Duration;
use tracing::{debug, info, warn};


/// Parameters of one discovery run.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmQuery {
    /// Underlying symbol.
    pub ticker: String,
    /// Expiration (`YYYY-MM-DD`).
    pub expiration: String,
    /// Price to use when the gateway provides none.
    pub underlying_override: Option<f64>,
    /// Contract identifier override for the underlying.
    pub conid: Option<i64>,
    /// Per-request deadline; `None` uses the session default.
    pub deadline: Option<Duration>,
}

impl AtmQuery {
    /// Creates a query with no overrides.
    #[must_use]
    pub fn new(ticker: &str, expiration: &str) -> Self {
        Self {
            ticker: ticker.to_uppercase(),
            expiration: expiration.to_string(),
            underlying_override: None,
            conid: None,
            deadline: None,
        }
    }
}

/// Fetches the underlying reference price: last, then midpoint, then override.
///
/// # Errors
/// Returns `MissingUnderlyingPrice` if none resolves.
pub async fn underlying_price(
    session: &BrokerSession,
    query: &AtmQuery,
) -> Result<(f64, DataSource), GateError> {
    let contract = Contract::stock(&query.ticker).with_con_id(query.conid);
    let reply = session.fetch(contract, "", true, query.deadline).await?;

    if reply.timed_out {
        debug!("Underlying snapshot for {} timed out", query.ticker);
    }

    reply
        .ticks
        .reference_price()
        .or(query.underlying_override)
        .map(|price| (price, reply.ticks.source))
        .ok_or_else(|| GateError::MissingUnderlyingPrice(query.ticker.clone()))
}

/// Runs ATM discovery within an open session.
///
/// # Errors
/// Returns `MissingUnderlyingPrice` if no underlying price is available and
/// `NoOptionsData` if no candidate produced implied volatility.
pub async fn discover(session: &BrokerSession, query: &AtmQuery) -> Result<AtmResult, GateError> {
    let (price, _) = underlying_price(session, query).await?;

    let increment = increment_for(price);
    let base = round_to_increment(price, increment);
    let candidates = candidate_strikes(base, increment);
    debug!(
        "{} underlying {:.2}, increment {}, candidates {:?}",
        query.ticker, price, increment, candidates
    );

    let mut selected = None;
    let mut strikes_checked = 0;

    for strike in candidates {
        strikes_checked += 1;
        let contract = Contract::option(&query.ticker, &query.expiration, strike, Right::Call);
        let reply = session
            .fetch(contract, GREEKS_GENERIC_TICKS, false, query.deadline)
            .await?;

        let greeks = reply.ticks.greeks;
        let Some(implied_volatility) = greeks.implied_volatility else {
            debug!("No implied volatility at strike {}, skipping", strike);
            continue;
        };

        selected = Some((strike, greeks.delta, implied_volatility, reply.ticks.source));
        if is_atm_delta(greeks.delta) {
            break;
        }
    }

    let Some((strike, delta, implied_volatility, data_type)) = selected else {
        return Err(GateError::NoOptionsData(query.ticker.clone()));
    };

    let is_atm = is_atm_delta(delta);
    if !is_atm {
        warn!(
            "Delta {:?} outside ATM range for {} (strike {})",
            delta, query.ticker, strike
        );
    }
    if data_type == DataSource::Delayed {
        warn!(
            "Using delayed data for {} options (live subscription may be inactive)",
            query.ticker
        );
    }
    info!(
        "ATM {} {} strike {} delta {:?} IV {:.4} after {} strike(s)",
        query.ticker, query.expiration, strike, delta, implied_volatility, strikes_checked
    );

    Ok(AtmResult {
        ticker: query.ticker.clone(),
        strike,
        expiration: query.expiration.clone(),
        right: Right::Call,
        delta,
        implied_volatility,
        underlying_price: price,
        is_atm,
        data_type,
        source: SOURCE_LABEL.to_string(),
        strikes_checked,
        errors: session.errors(),
    })
}
