//! Connection seam between a session and the gateway transport.

use gateway_client::{ClientConfig, GatewayClient};
use std::future::Future;

/// Opens gateway connections for broker sessions.
pub trait GatewayConnector: Send + Sync {
    /// Opens a new connection.
    fn connect(&self) -> impl Future<Output = Result<GatewayClient, gateway_client::Error>> + Send;

    /// Human-readable endpoint, used in logs.
    fn endpoint(&self) -> String;
}

/// Connects to a WebSocket gateway.
#[derive(Debug, Clone)]
pub struct WsConnector {
    config: ClientConfig,
}

impl WsConnector {
    /// Creates a connector for `ws://{host}:{port}`.
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            config: ClientConfig::for_host(host, port),
        }
    }

    /// Creates a connector for an explicit URL.
    #[must_use]
    pub fn with_url(url: &str) -> Self {
        Self {
            config: ClientConfig {
                url: url.to_string(),
                ..Default::default()
            },
        }
    }
}

impl GatewayConnector for WsConnector {
    async fn connect(&self) -> Result<GatewayClient, gateway_client::Error> {
        GatewayClient::connect_with(self.config.clone()).await
    }

    fn endpoint(&self) -> String {
        self.config.url.clone()
    }
}
