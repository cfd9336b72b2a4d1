//! Quality gate: the single entry point for option data.
//!
//! Every option-data operation checks the circuit breaker before any broker
//! I/O. The validated path records each failure with the breaker and clears
//! the failure count after a clean quote. Each operation opens its own
//! session and disconnects it before returning.

use super::circuit_breaker::{CircuitBreaker, FailureOutcome};
use super::validator::Validator;
use crate::atm::{self, AtmQuery};
use crate::broker::{BrokerSession, GatewayConnector};
use crate::calendar::{format_expiration, next_monthly_expiration};
use crate::config::{BrokerConfig, Config, SanitizerConfig};
use crate::error::GateError;
use crate::history;
use crate::models::{
    AtmResult, DataSource, FailureCategory, HistoricalBars, OptionQuote, QuoteRequest, SOURCE_LABEL,
    StockQuote, ValidatedQuote,
};
use chrono::{Local, NaiveDate};
use gateway_client::{Contract, GREEKS_GENERIC_TICKS, Right};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};


/// Relative strike-to-underlying distance above which ATM results are flagged.
pub const STRIKE_DISTANCE_WARNING: f64 = 0.05;

/// Breaker-gated access to broker market data.
pub struct QualityGate<C: GatewayConnector> {
    connector: C,
    broker: BrokerConfig,
    sanitizer: SanitizerConfig,
    validator: Validator,
    breaker: Arc<CircuitBreaker>,
}

impl<C: GatewayConnector> QualityGate<C> {
    /// Creates a gate over `connector` sharing `breaker`.
    pub fn new(connector: C, config: &Config, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            connector,
            broker: config.broker.clone(),
            sanitizer: config.sanitizer.clone(),
            validator: Validator::new(config.data_quality.clone()),
            breaker,
        }
    }

    /// Shared circuit breaker.
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Validator in use.
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Underlying connector.
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn ensure_armed(&self) -> Result<(), GateError> {
        if self.breaker.is_tripped() {
            warn!("Option data request rejected: circuit breaker active");
            return Err(GateError::CircuitBreakerActive);
        }
        Ok(())
    }

    async fn open(&self) -> Result<BrokerSession, GateError> {
        BrokerSession::connect(&self.connector, &self.broker, &self.sanitizer).await
    }

    /// Underlying snapshot. Not breaker-gated.
    ///
    /// # Errors
    /// Returns connection errors.
    pub async fn quote(&self, ticker: &str, conid: Option<i64>) -> Result<StockQuote, GateError> {
        let ticker = ticker.to_uppercase();
        let mut session = self.open().await?;
        let contract = Contract::stock(&ticker).with_con_id(conid);
        let result = session.fetch(contract, "", true, None).await;
        let errors = session.errors();
        session.disconnect();

        let reply = result?;
        let ticks = reply.ticks;
        Ok(StockQuote {
            ticker,
            conid,
            bid: ticks.bid,
            ask: ticks.ask,
            last: ticks.last,
            high: ticks.high,
            data_type: ticks.source,
            source: SOURCE_LABEL.to_string(),
            timed_out: reply.timed_out,
            errors,
        })
    }

    /// Daily bars and the 200-bar moving average. Not breaker-gated.
    ///
    /// # Errors
    /// Returns `HistoricalTimeout` when the bars do not finish within the
    /// request timeout, and connection errors.
    pub async fn historical(
        &self,
        ticker: &str,
        days: u32,
        conid: Option<i64>,
    ) -> Result<HistoricalBars, GateError> {
        let ticker = ticker.to_uppercase();
        let mut session = self.open().await?;
        let contract = Contract::stock(&ticker).with_con_id(conid);
        let result = session.fetch_historical(contract, days, None).await;
        let errors = session.errors();
        session.disconnect();

        let bars = history::sorted_by_date(&result?);
        let ma_200 = history::ma_200(&bars);
        info!(
            "{} historical: {} bars, MA200 {:?}",
            ticker,
            bars.len(),
            ma_200
        );
        Ok(HistoricalBars {
            ticker,
            count: bars.len(),
            bars,
            ma_200,
            source: SOURCE_LABEL.to_string(),
            errors,
        })
    }

    /// Raw option quote. Breaker-gated, not validated.
    ///
    /// # Errors
    /// Returns `CircuitBreakerActive` when tripped, `InvalidRequest` without a
    /// strike, and connection errors.
    pub async fn quote_option(&self, request: &QuoteRequest) -> Result<OptionQuote, GateError> {
        self.ensure_armed()?;
        let strike = request.strike.ok_or_else(|| {
            GateError::InvalidRequest("strike is required for an option quote".to_string())
        })?;
        let expiration = expiration_or_next(request.expiration);

        let mut session = self.open().await?;
        let result = fetch_option(
            &session,
            &request.ticker,
            strike,
            &expiration,
            request.right,
            request.timeout,
        )
        .await;
        session.disconnect();
        result
    }

    /// ATM implied volatility. Breaker-gated; failures are not counted.
    ///
    /// # Errors
    /// Returns `CircuitBreakerActive` when tripped, discovery errors, and a
    /// greeks `ValidationFailure` when the implied volatility is implausible.
    pub async fn atm_iv(
        &self,
        ticker: &str,
        expiration: Option<NaiveDate>,
        underlying_override: Option<f64>,
        conid: Option<i64>,
    ) -> Result<AtmResult, GateError> {
        self.ensure_armed()?;
        let mut query = AtmQuery::new(ticker, &expiration_or_next(expiration));
        query.underlying_override = underlying_override;
        query.conid = conid;

        let mut session = self.open().await?;
        let result = atm::discover(&session, &query).await;
        session.disconnect();
        let result = result?;

        let verdict = self.validator.validate_iv(result.implied_volatility);
        if !verdict.is_valid() {
            return Err(GateError::ValidationFailure {
                category: FailureCategory::GreeksValidation,
                reason: verdict.reason().to_string(),
            });
        }

        if result.underlying_price > 0.0 {
            let distance = (result.strike - result.underlying_price).abs() / result.underlying_price;
            if distance > STRIKE_DISTANCE_WARNING {
                warn!(
                    "Strike {} is {:.1}% from price {}",
                    result.strike,
                    distance * 100.0,
                    result.underlying_price
                );
            }
        }

        Ok(result)
    }

    /// Fetches an option quote and runs every data-quality check.
    ///
    /// Without a strike, ATM discovery picks one in the same session.
    /// Liquidity problems and delayed data are warnings only.
    ///
    /// # Errors
    /// Returns `CircuitBreakerActive` when tripped, `TradingHalted` when this
    /// call trips the breaker, otherwise the recorded failure.
    pub async fn fetch_validated_option(
        &self,
        request: &QuoteRequest,
    ) -> Result<ValidatedQuote, GateError> {
        self.ensure_armed()?;

        let mut session = match self.open().await {
            Ok(session) => session,
            Err(e) => return Err(self.record(e, &request.ticker)),
        };
        let result = self.validate_in(&session, request).await;
        session.disconnect();

        match result {
            Ok(validated) => {
                self.breaker.reset_failures();
                info!(
                    "Validated {} {} {} {}",
                    validated.quote.ticker,
                    validated.quote.expiration,
                    validated.quote.strike,
                    validated.quote.right
                );
                Ok(validated)
            }
            Err(e) => Err(self.record(e, &request.ticker)),
        }
    }

    async fn validate_in(
        &self,
        session: &BrokerSession,
        request: &QuoteRequest,
    ) -> Result<ValidatedQuote, GateError> {
        let expiration = expiration_or_next(request.expiration);
        let strike = match request.strike {
            Some(strike) => strike,
            None => {
                let mut query = AtmQuery::new(&request.ticker, &expiration);
                query.deadline = request.timeout;
                atm::discover(session, &query).await?.strike
            }
        };

        let quote = fetch_option(
            session,
            &request.ticker,
            strike,
            &expiration,
            request.right,
            request.timeout,
        )
        .await?;

        if quote.mid_price.is_none() {
            let wait = request.timeout.unwrap_or_else(|| session.request_timeout());
            let (category, reason) = if quote.timed_out {
                (
                    FailureCategory::BrokerTimeout,
                    format!("Gateway timeout after {:.1} seconds", wait.as_secs_f64()),
                )
            } else {
                (
                    FailureCategory::BrokerResponse,
                    "Gateway returned error or missing mid_price".to_string(),
                )
            };
            return Err(GateError::ValidationFailure { category, reason });
        }

        let greeks = self.validator.validate_greeks(&quote.greeks(), request.right);
        if !greeks.is_valid() {
            return Err(GateError::ValidationFailure {
                category: FailureCategory::GreeksValidation,
                reason: greeks.reason().to_string(),
            });
        }

        let pricing = self
            .validator
            .validate_pricing(quote.bid, quote.ask, quote.last);
        if !pricing.is_valid() {
            return Err(GateError::ValidationFailure {
                category: FailureCategory::PricingValidation,
                reason: pricing.reason().to_string(),
            });
        }

        let mut warnings = Vec::new();
        let liquidity = self
            .validator
            .validate_liquidity(quote.open_interest, quote.volume);
        if !liquidity.is_valid() {
            warn!("Liquidity warning for {}: {}", quote.ticker, liquidity.reason());
            warnings.push(liquidity.reason().to_string());
        }
        if quote.data_type == DataSource::Delayed {
            warnings.push("Using delayed market data".to_string());
        }

        Ok(ValidatedQuote {
            quote,
            warnings,
            data_quality_validated: true,
            validated_at: Local::now(),
        })
    }

    /// Records `error` with the breaker, escalating to `TradingHalted` on trip.
    fn record(&self, error: GateError, ticker: &str) -> GateError {
        let category = failure_category(&error);
        let message = match &error {
            GateError::ValidationFailure { reason, .. } => reason.clone(),
            other => other.to_string(),
        };

        match self.breaker.record_failure(category, &message, Some(ticker)) {
            FailureOutcome::Tripped(alert) => GateError::TradingHalted {
                reason: alert.reason,
            },
            FailureOutcome::Recorded { .. } => error,
        }
    }
}

/// Breaker category for a failed operation.
#[must_use]
pub fn failure_category(error: &GateError) -> FailureCategory {
    match error {
        GateError::ConnectionTimeout(_)
        | GateError::ConnectionFailed(_)
        | GateError::Transport(_) => FailureCategory::BrokerConnection,
        GateError::MissingUnderlyingPrice(_) | GateError::NoOptionsData(_) => {
            FailureCategory::BrokerResponse
        }
        GateError::ValidationFailure { category, .. } => *category,
        _ => FailureCategory::UnexpectedError,
    }
}

fn expiration_or_next(expiration: Option<NaiveDate>) -> String {
    let date = expiration.unwrap_or_else(|| next_monthly_expiration(Local::now().date_naive()));
    format_expiration(date)
}

async fn fetch_option(
    session: &BrokerSession,
    ticker: &str,
    strike: f64,
    expiration: &str,
    right: Right,
    deadline: Option<Duration>,
) -> Result<OptionQuote, GateError> {
    let contract = Contract::option(ticker, expiration, strike, right);
    let reply = session
        .fetch(contract, GREEKS_GENERIC_TICKS, false, deadline)
        .await?;
    let ticks = reply.ticks;

    if ticks.source == DataSource::Delayed {
        warn!(
            "Using delayed data for {} options (live subscription may be inactive)",
            ticker
        );
    }

    Ok(OptionQuote {
        ticker: ticker.to_uppercase(),
        strike,
        expiration: expiration.to_string(),
        right,
        bid: ticks.bid,
        ask: ticks.ask,
        last: ticks.last,
        mid_price: ticks.mid(),
        volume: ticks.volume,
        open_interest: ticks.open_interest,
        delta: ticks.greeks.delta,
        theta: ticks.greeks.theta,
        gamma: ticks.greeks.gamma,
        vega: ticks.greeks.vega,
        implied_volatility: ticks.greeks.implied_volatility,
        underlying_price: ticks.greeks.underlying_price,
        data_type: ticks.source,
        source: SOURCE_LABEL.to_string(),
        timed_out: reply.timed_out,
        errors: session.errors(),
    })
}
