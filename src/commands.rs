//! Command execution.
//!
//! Every command produces a JSON body and an exit code: 0 on success, 2 for
//! circuit-breaker conditions, 1 for anything else.

use crate::broker::GatewayConnector;
use crate::calendar::parse_expiration;
use crate::cli::Commands;
use crate::error::GateError;
use crate::models::QuoteRequest;
use crate::quality::circuit_breaker::MANUAL_RESET_NOTE;
use crate::quality::run_daily_validation;
use crate::state::AppState;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;


/// Successful command.
pub const EXIT_OK: i32 = 0;
/// Failed command.
pub const EXIT_FAILURE: i32 = 1;
/// Circuit breaker active or tripped by this command.
pub const EXIT_HALTED: i32 = 2;

/// Result of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// JSON printed to stdout.
    pub body: Value,
    /// Process exit code.
    pub exit_code: i32,
}

impl CommandOutput {
    fn success<T: Serialize>(value: &T) -> Result<Self, GateError> {
        Ok(Self {
            body: to_json(value)?,
            exit_code: EXIT_OK,
        })
    }

    /// Builds the `{error, code}` output for a failure.
    #[must_use]
    pub fn failure(err: &GateError) -> Self {
        let response = err.to_response();
        Self {
            body: json!({"error": response.error, "code": response.code}),
            exit_code: exit_code(err),
        }
    }
}

/// Exit code for an error.
#[must_use]
pub fn exit_code(err: &GateError) -> i32 {
    if err.is_breaker() {
        EXIT_HALTED
    } else {
        EXIT_FAILURE
    }
}

/// Runs `command` against `state`.
pub async fn execute<C: GatewayConnector>(state: &AppState<C>, command: &Commands) -> CommandOutput {
    match run(state, command).await {
        Ok(output) => output,
        Err(e) => {
            error!("{}", e);
            CommandOutput::failure(&e)
        }
    }
}

async fn run<C: GatewayConnector>(
    state: &AppState<C>,
    command: &Commands,
) -> Result<CommandOutput, GateError> {
    let gate = &state.gate;

    match command {
        Commands::Quote { ticker, conid } => {
            CommandOutput::success(&gate.quote(ticker, *conid).await?)
        }
        Commands::Historical {
            ticker,
            days,
            conid,
        } => CommandOutput::success(&gate.historical(ticker, *days, *conid).await?),
        Commands::QuoteOption {
            ticker,
            strike,
            expiration,
            right,
            raw,
        } => {
            let mut request = QuoteRequest::new(ticker).with_right(*right);
            if let Some(expiration) = parse_optional(expiration.as_deref())? {
                request = request.with_expiration(expiration);
            }
            if let Some(strike) = strike {
                request = request.with_strike(*strike);
            }

            if !*raw {
                return CommandOutput::success(&gate.fetch_validated_option(&request).await?);
            }
            if request.strike.is_none() {
                let atm = gate
                    .atm_iv(&request.ticker, request.expiration, None, None)
                    .await?;
                request = request.with_strike(atm.strike);
            }
            CommandOutput::success(&gate.quote_option(&request).await?)
        }
        Commands::AtmIv {
            ticker,
            expiration,
            underlying_price,
            conid,
        } => {
            let expiration = parse_optional(expiration.as_deref())?;
            CommandOutput::success(
                &gate
                    .atm_iv(ticker, expiration, *underlying_price, *conid)
                    .await?,
            )
        }
        Commands::BreakerStatus => CommandOutput::success(&state.breaker.status()),
        Commands::ResetBreaker { confirm } => {
            if !*confirm {
                return Err(GateError::InvalidRequest(
                    "refusing to reset the circuit breaker without --confirm; review logs/data_quality/ first"
                        .to_string(),
                ));
            }
            state.breaker.reset();
            Ok(CommandOutput {
                body: json!({
                    "status": "reset",
                    "note": MANUAL_RESET_NOTE,
                    "breaker": to_json(&state.breaker.status())?,
                }),
                exit_code: EXIT_OK,
            })
        }
        Commands::Validate { ticker } => {
            let report = run_daily_validation(gate, ticker).await;
            Ok(CommandOutput {
                body: to_json(&report)?,
                exit_code: if report.passed() {
                    EXIT_OK
                } else {
                    EXIT_FAILURE
                },
            })
        }
    }
}

fn parse_optional(input: Option<&str>) -> Result<Option<NaiveDate>, GateError> {
    input.map(parse_expiration).transpose()
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, GateError> {
    serde_json::to_value(value)
        .map_err(|e| GateError::InvalidRequest(format!("unserializable result: {}", e)))
}
