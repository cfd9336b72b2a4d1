//! Circuit breaker behavior across sessions and process restarts.

use gate_tests::{ScriptedServer, test_config};
use gateway_client::{GatewayRequest, Right};
use options_data_gate::broker::{MockGateway, OptionScript, StockScript};
use options_data_gate::calendar::parse_expiration;
use options_data_gate::cli::Commands;
use options_data_gate::commands::{EXIT_FAILURE, EXIT_HALTED, EXIT_OK, execute};
use options_data_gate::error::GateError;
use options_data_gate::models::{FailureCategory, QuoteRequest};
use options_data_gate::state::AppState;
use tempfile::TempDir;

const EXP: &str = "2026-02-20";

/// 500 is a crossed market, 510 is healthy.
fn gateway() -> MockGateway {
    MockGateway::new()
        .with_stock("SPY", StockScript::at(500.0))
        .with_option(
            "SPY",
            EXP,
            500.0,
            Right::Call,
            OptionScript::liquid(9.70, 9.50, 0.52, 0.18),
        )
        .with_option(
            "SPY",
            EXP,
            510.0,
            Right::Call,
            OptionScript::liquid(5.10, 5.30, 0.41, 0.17),
        )
}

fn request(strike: f64) -> QuoteRequest {
    QuoteRequest::new("SPY")
        .with_expiration(parse_expiration(EXP).unwrap())
        .with_strike(strike)
}

fn handshakes(gateway: &MockGateway) -> usize {
    gateway
        .requests()
        .iter()
        .filter(|r| matches!(r, GatewayRequest::StartApi { .. }))
        .count()
}

// ============================================================================
// Trip Tests
// ============================================================================

#[tokio::test]
async fn test_three_failures_halt_trading() {
    let dir = TempDir::new().unwrap();
    let gateway = gateway();
    let server = ScriptedServer::start(gateway.clone()).await.unwrap();
    let state = AppState::with_connector(
        test_config(server.port(), dir.path()),
        server.connector(),
    );

    for _ in 0..2 {
        let result = state.gate.fetch_validated_option(&request(500.0)).await;
        assert!(matches!(
            result,
            Err(GateError::ValidationFailure {
                category: FailureCategory::PricingValidation,
                ..
            })
        ));
        assert!(!state.breaker.is_tripped());
    }

    let third = state.gate.fetch_validated_option(&request(500.0)).await;
    let Err(GateError::TradingHalted { reason }) = third else {
        panic!("expected TradingHalted, got {:?}", third.map(|_| ()));
    };
    assert!(reason.starts_with("3 consecutive data quality failures"));
    assert!(reason.contains("Crossed market"));
    assert!(state.breaker.is_tripped());

    let before = handshakes(&gateway);
    let fourth = state.gate.fetch_validated_option(&request(510.0)).await;
    assert!(matches!(fourth, Err(GateError::CircuitBreakerActive)));
    assert_eq!(handshakes(&gateway), before);

    let alerts = state.breaker.journal().alerts().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["type"], "circuit_breaker");
    assert_eq!(alerts[0]["failures"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_success_clears_failure_count() {
    let dir = TempDir::new().unwrap();
    let server = ScriptedServer::start(gateway()).await.unwrap();
    let state = AppState::with_connector(
        test_config(server.port(), dir.path()),
        server.connector(),
    );

    for strike in [500.0, 500.0, 510.0, 500.0, 500.0] {
        let _ = state.gate.fetch_validated_option(&request(strike)).await;
    }

    assert!(!state.breaker.is_tripped());
    assert_eq!(state.breaker.status().consecutive_failures, 2);
}

#[tokio::test]
async fn test_halt_survives_restart_until_reset() {
    let dir = TempDir::new().unwrap();
    let server = ScriptedServer::start(gateway()).await.unwrap();
    let config = test_config(server.port(), dir.path());

    {
        let state = AppState::with_connector(config.clone(), server.connector());
        for _ in 0..3 {
            let _ = state.gate.fetch_validated_option(&request(500.0)).await;
        }
        assert!(state.breaker.is_tripped());
    }

    let restarted = AppState::with_connector(config.clone(), server.connector());
    assert!(restarted.breaker.is_tripped());
    let blocked = restarted.gate.fetch_validated_option(&request(510.0)).await;
    assert!(matches!(blocked, Err(GateError::CircuitBreakerActive)));

    restarted.breaker.reset();
    let validated = restarted.gate.fetch_validated_option(&request(510.0)).await;
    assert!(validated.is_ok());

    let after_reset = AppState::with_connector(config, server.connector());
    assert!(!after_reset.breaker.is_tripped());
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test]
async fn test_breaker_commands_and_exit_codes() {
    let dir = TempDir::new().unwrap();
    let server = ScriptedServer::start(gateway()).await.unwrap();
    let state = AppState::with_connector(
        test_config(server.port(), dir.path()),
        server.connector(),
    );
    let crossed = Commands::QuoteOption {
        ticker: "SPY".to_string(),
        strike: Some(500.0),
        expiration: Some(EXP.to_string()),
        right: Right::Call,
        raw: false,
    };

    assert_eq!(execute(&state, &crossed).await.exit_code, EXIT_FAILURE);
    assert_eq!(execute(&state, &crossed).await.exit_code, EXIT_FAILURE);
    let halted = execute(&state, &crossed).await;
    assert_eq!(halted.exit_code, EXIT_HALTED);
    assert_eq!(halted.body["code"], "TRADING_HALTED");

    let status = execute(&state, &Commands::BreakerStatus).await;
    assert_eq!(status.exit_code, EXIT_OK);
    assert_eq!(status.body["tripped"], true);

    let refused = execute(&state, &Commands::ResetBreaker { confirm: false }).await;
    assert_eq!(refused.exit_code, EXIT_FAILURE);
    assert!(state.breaker.is_tripped());

    let reset = execute(&state, &Commands::ResetBreaker { confirm: true }).await;
    assert_eq!(reset.exit_code, EXIT_OK);
    assert_eq!(reset.body["status"], "reset");
    assert_eq!(reset.body["breaker"]["tripped"], false);
}
