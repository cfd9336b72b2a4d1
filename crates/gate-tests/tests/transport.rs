//! Transport and session tests over a real WebSocket.

use gate_tests::{ScriptedServer, test_config};
use gateway_client::{Contract, GatewayClient, GatewayEvent, GatewayRequest};
use options_data_gate::broker::mock::daily_bars;
use options_data_gate::broker::{BrokerSession, MockGateway, StockScript, WsConnector};
use options_data_gate::config::SanitizerConfig;
use options_data_gate::error::GateError;
use options_data_gate::models::DataSource;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_client_handshake() {
    let server = ScriptedServer::start(MockGateway::new()).await.unwrap();

    let mut client = assert_ok!(GatewayClient::connect(&server.url()).await);
    assert_ok!(client.send(GatewayRequest::start_api(7, "")).await);

    let event = tokio::time::timeout(Duration::from_secs(5), client.recv())
        .await
        .expect("Timeout waiting for handshake");
    assert_eq!(event, Some(GatewayEvent::NextValidId { order_id: 1 }));
}

#[tokio::test]
async fn test_client_stock_snapshot_frames() {
    let gateway = MockGateway::new().with_stock("SPY", StockScript::at(500.0));
    let server = ScriptedServer::start(gateway).await.unwrap();

    let mut client = GatewayClient::connect(&server.url()).await.unwrap();
    client
        .send(GatewayRequest::req_mkt_data(1, Contract::stock("SPY"), "", true))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(5), client.recv()).await {
        let done = matches!(event, GatewayEvent::TickSnapshotEnd { .. });
        events.push(event);
        if done {
            break;
        }
    }

    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.req_id() == Some(1)));
}

#[tokio::test]
async fn test_session_fetch_over_websocket() {
    let dir = TempDir::new().unwrap();
    let gateway = MockGateway::new()
        .delayed_feed()
        .with_stock("SPY", StockScript::at(501.25));
    let server = ScriptedServer::start(gateway).await.unwrap();
    let config = test_config(server.port(), dir.path());

    let mut session = assert_ok!(
        BrokerSession::connect(&server.connector(), &config.broker, &SanitizerConfig::default())
            .await
    );
    assert!(session.is_connected());

    let reply = session
        .fetch(Contract::stock("SPY"), "", true, None)
        .await
        .unwrap();
    session.disconnect();

    assert!(!reply.timed_out);
    assert_eq!(reply.ticks.last, Some(501.25));
    assert_eq!(reply.ticks.source, DataSource::Delayed);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_session_historical_over_websocket() {
    let dir = TempDir::new().unwrap();
    let closes: Vec<f64> = (1..=210).map(f64::from).collect();
    let gateway = MockGateway::new().with_history("SPY", daily_bars(&closes));
    let server = ScriptedServer::start(gateway).await.unwrap();
    let config = test_config(server.port(), dir.path());

    let mut session = assert_ok!(
        BrokerSession::connect(&server.connector(), &config.broker, &SanitizerConfig::default())
            .await
    );
    let bars = assert_ok!(
        session
            .fetch_historical(Contract::stock("SPY"), 210, None)
            .await
    );
    session.disconnect();

    assert_eq!(bars.len(), 210);
    assert_eq!(bars[209].close, 210.0);
    assert_eq!(
        options_data_gate::history::ma_200(&bars),
        Some(110.5)
    );
}

#[tokio::test]
async fn test_session_historical_timeout_over_websocket() {
    let dir = TempDir::new().unwrap();
    let server = ScriptedServer::start(MockGateway::new()).await.unwrap();
    let config = test_config(server.port(), dir.path());

    let mut session = assert_ok!(
        BrokerSession::connect(&server.connector(), &config.broker, &SanitizerConfig::default())
            .await
    );
    let result = session
        .fetch_historical(Contract::stock("SPY"), 210, Some(Duration::from_millis(200)))
        .await;
    session.disconnect();

    assert!(matches!(result, Err(GateError::HistoricalTimeout(_))));
}

#[tokio::test]
async fn test_session_handshake_timeout() {
    let dir = TempDir::new().unwrap();
    let server = ScriptedServer::start(MockGateway::new().silent()).await.unwrap();
    let mut config = test_config(server.port(), dir.path());
    config.broker.connect_timeout_secs = 0.2;

    let result =
        BrokerSession::connect(&server.connector(), &config.broker, &SanitizerConfig::default())
            .await;

    let Err(err) = result else {
        panic!("handshake should time out");
    };
    assert!(matches!(err, GateError::ConnectionTimeout(_)));
}

#[tokio::test]
async fn test_session_connection_refused() {
    let dir = TempDir::new().unwrap();
    let port = {
        let server = ScriptedServer::start(MockGateway::new()).await.unwrap();
        server.port()
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let config = test_config(port, dir.path());
    let connector = WsConnector::new("127.0.0.1", port);

    let result = BrokerSession::connect(&connector, &config.broker, &SanitizerConfig::default()).await;

    let Err(err) = result else {
        panic!("connection should be refused");
    };
    assert!(matches!(err, GateError::ConnectionFailed(_)));
}
