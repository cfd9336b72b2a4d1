//! Unit tests for client module.

use super::*;

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.url, "ws://127.0.0.1:4002");
    assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
}

#[test]
fn test_client_config_for_host() {
    let config = ClientConfig::for_host("10.0.0.5", 7497);

    assert_eq!(config.url, "ws://10.0.0.5:7497");
    let url = config.parsed_url().unwrap();
    assert_eq!(url.port(), Some(7497));
}

#[test]
fn test_client_config_rejects_http_scheme() {
    let config = ClientConfig {
        url: "http://localhost:4002".to_string(),
        ..Default::default()
    };

    assert!(matches!(
        config.parsed_url(),
        Err(Error::UnsupportedScheme(scheme)) if scheme == "http"
    ));
}

#[test]
fn test_client_config_rejects_garbage() {
    let config = ClientConfig {
        url: "not a url".to_string(),
        ..Default::default()
    };

    assert!(matches!(config.parsed_url(), Err(Error::InvalidUrl(_))));
}

// ============================================================================
// GatewayClient Tests
// ============================================================================

#[tokio::test]
async fn test_connect_invalid_url_fails_fast() {
    let result = GatewayClient::connect("ftp://example.com").await;
    assert!(matches!(result, Err(Error::UnsupportedScheme(_))));
}

#[tokio::test]
async fn test_from_channels_send_and_recv() {
    let (req_tx, mut req_rx) = mpsc::channel(4);
    let (evt_tx, evt_rx) = mpsc::channel(4);
    let mut client = GatewayClient::from_channels(req_tx, evt_rx);

    client
        .send(GatewayRequest::cancel_mkt_data(5))
        .await
        .unwrap();
    assert_eq!(
        req_rx.recv().await,
        Some(GatewayRequest::cancel_mkt_data(5))
    );

    evt_tx
        .send(GatewayEvent::NextValidId { order_id: 1 })
        .await
        .unwrap();
    assert_eq!(
        client.recv().await,
        Some(GatewayEvent::NextValidId { order_id: 1 })
    );
}

#[tokio::test]
async fn test_send_after_peer_dropped_is_connection_closed() {
    let (req_tx, req_rx) = mpsc::channel(1);
    let (_evt_tx, evt_rx) = mpsc::channel::<GatewayEvent>(1);
    let client = GatewayClient::from_channels(req_tx, evt_rx);
    drop(req_rx);

    let result = client.send(GatewayRequest::market_data_type(4)).await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));
    assert!(client.sender().is_closed());
}

#[tokio::test]
async fn test_into_parts_recv_none_when_gateway_gone() {
    let (req_tx, _req_rx) = mpsc::channel(1);
    let (evt_tx, evt_rx) = mpsc::channel::<GatewayEvent>(1);
    let client = GatewayClient::from_channels(req_tx, evt_rx);
    drop(evt_tx);

    let (_sender, mut rx) = client.into_parts();
    assert!(rx.recv().await.is_none());
}
