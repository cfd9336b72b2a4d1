//! Command-line interface definitions.

use crate::history::DEFAULT_HISTORY_DAYS;
use clap::{Parser, Subcommand};
use gateway_client::Right;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "options-data-gate")]
#[command(about = "Broker market data with an options data-quality gate")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "GATE_CONFIG", default_value = "config/gate.toml")]
    pub config: PathBuf,

    /// Override both broker timeouts (seconds)
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Snapshot quote for an underlying
    Quote {
        /// Underlying ticker
        ticker: String,

        /// Broker contract id
        #[arg(long)]
        conid: Option<i64>,
    },

    /// Daily bars with the 200-day moving average
    Historical {
        /// Underlying ticker
        ticker: String,

        /// Calendar days of history to request
        #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
        days: u32,

        /// Broker contract id
        #[arg(long)]
        conid: Option<i64>,
    },

    /// Option quote, validated unless --raw is given
    #[command(name = "quote_option")]
    QuoteOption {
        /// Underlying ticker
        ticker: String,

        /// Strike price (defaults to the ATM strike)
        #[arg(long)]
        strike: Option<f64>,

        /// Expiration as YYYY-MM-DD (defaults to the next monthly expiration)
        #[arg(long)]
        expiration: Option<String>,

        /// CALL or PUT
        #[arg(long, default_value = "CALL")]
        right: Right,

        /// Skip data-quality validation
        #[arg(long)]
        raw: bool,
    },

    /// Implied volatility of the at-the-money call
    #[command(name = "atm_iv")]
    AtmIv {
        /// Underlying ticker
        ticker: String,

        /// Expiration as YYYY-MM-DD (defaults to the next monthly expiration)
        #[arg(long)]
        expiration: Option<String>,

        /// Underlying price to use when the gateway provides none
        #[arg(long)]
        underlying_price: Option<f64>,

        /// Broker contract id of the underlying
        #[arg(long)]
        conid: Option<i64>,
    },

    /// Show circuit breaker state
    #[command(name = "breaker_status")]
    BreakerStatus,

    /// Manually reset the circuit breaker
    #[command(name = "reset_breaker")]
    ResetBreaker {
        /// Confirm the logs were reviewed
        #[arg(long)]
        confirm: bool,
    },

    /// Run the daily data-quality validation
    Validate {
        /// Underlying ticker
        #[arg(long, default_value = "SPY")]
        ticker: String,
    },
}

impl Cli {
    /// Parses arguments from the process environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("options-data-gate").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_quote_option_defaults() {
        let cli = parse(&["quote_option", "SPY"]);

        assert_eq!(
            cli.command,
            Commands::QuoteOption {
                ticker: "SPY".to_string(),
                strike: None,
                expiration: None,
                right: Right::Call,
                raw: false,
            }
        );
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn test_quote_option_full() {
        let cli = parse(&[
            "quote_option",
            "SPY",
            "--strike",
            "500",
            "--expiration",
            "2026-02-20",
            "--right",
            "put",
            "--raw",
            "--timeout",
            "5",
        ]);

        assert_eq!(cli.timeout, Some(5.0));
        match cli.command {
            Commands::QuoteOption {
                strike, right, raw, ..
            } => {
                assert_eq!(strike, Some(500.0));
                assert_eq!(right, Right::Put);
                assert!(raw);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_atm_iv_flags() {
        let cli = parse(&["atm_iv", "AAPL", "--underlying-price", "231.5", "--conid", "265598"]);

        assert_eq!(
            cli.command,
            Commands::AtmIv {
                ticker: "AAPL".to_string(),
                expiration: None,
                underlying_price: Some(231.5),
                conid: Some(265598),
            }
        );
    }

    #[test]
    fn test_breaker_commands() {
        assert_eq!(parse(&["breaker_status"]).command, Commands::BreakerStatus);
        assert_eq!(
            parse(&["reset_breaker"]).command,
            Commands::ResetBreaker { confirm: false }
        );
        assert_eq!(
            parse(&["reset_breaker", "--confirm"]).command,
            Commands::ResetBreaker { confirm: true }
        );
    }

    #[test]
    fn test_validate_default_ticker() {
        assert_eq!(
            parse(&["validate"]).command,
            Commands::Validate {
                ticker: "SPY".to_string()
            }
        );
    }

    #[test]
    fn test_historical_defaults_and_overrides() {
        assert_eq!(
            parse(&["historical", "SPY"]).command,
            Commands::Historical {
                ticker: "SPY".to_string(),
                days: 210,
                conid: None,
            }
        );
        assert_eq!(
            parse(&["historical", "QQQ", "--days", "400", "--conid", "320227571"]).command,
            Commands::Historical {
                ticker: "QQQ".to_string(),
                days: 400,
                conid: Some(320227571),
            }
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = parse(&["--config", "/etc/gate.toml", "breaker_status"]);
        assert_eq!(cli.config, PathBuf::from("/etc/gate.toml"));
    }

    #[test]
    fn test_invalid_right_rejected() {
        let result = Cli::try_parse_from(["options-data-gate", "quote_option", "SPY", "--right", "X"]);
        assert!(result.is_err());
    }
}
