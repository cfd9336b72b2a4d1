//! Gateway client handle.

use crate::error::Error;
use crate::types::{GatewayEvent, GatewayRequest};
use crate::websocket::spawn_transport;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use url::Url;

#[cfg(test)]
mod tests;

/// Default channel capacity between the caller and the transport tasks.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway WebSocket URL (e.g., "ws://127.0.0.1:4002").
    pub url: String,
    /// Capacity of the request and event channels.
    pub channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:4002".to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Builds a configuration pointing at `ws://{host}:{port}`.
    #[must_use]
    pub fn for_host(host: &str, port: u16) -> Self {
        Self {
            url: format!("ws://{}:{}", host, port),
            ..Default::default()
        }
    }

    /// Parses and checks the configured URL.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or its scheme is not `ws`/`wss`.
    pub fn parsed_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Cloneable request half of a gateway connection.
#[derive(Debug, Clone)]
pub struct GatewaySender {
    tx: mpsc::Sender<GatewayRequest>,
}

impl GatewaySender {
    /// Sends a request to the gateway.
    ///
    /// # Errors
    /// Returns error if the connection is closed.
    pub async fn send(&self, request: GatewayRequest) -> Result<(), Error> {
        self.tx
            .send(request)
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns true once the transport has stopped accepting requests.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Connection to the market-data gateway.
pub struct GatewayClient {
    sender: GatewaySender,
    rx: mpsc::Receiver<GatewayEvent>,
}

impl GatewayClient {
    /// Connects to the gateway with the default configuration for `url`.
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://127.0.0.1:4002")
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        Self::connect_with(ClientConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Connects to the gateway using the given configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect_with(config: ClientConfig) -> Result<Self, Error> {
        let url = config.parsed_url()?;
        let (ws_stream, _) = connect_async(url.as_str()).await.map_err(Box::new)?;
        tracing::debug!("Connected to gateway at {}", url);

        let (tx, rx) = spawn_transport(ws_stream, config.channel_capacity.max(1));
        Ok(Self::from_channels(tx, rx))
    }

    /// Builds a client over existing channels (in-process gateways and tests).
    #[must_use]
    pub fn from_channels(
        tx: mpsc::Sender<GatewayRequest>,
        rx: mpsc::Receiver<GatewayEvent>,
    ) -> Self {
        Self {
            sender: GatewaySender { tx },
            rx,
        }
    }

    /// Splits the client into its request and event halves.
    #[must_use]
    pub fn into_parts(self) -> (GatewaySender, mpsc::Receiver<GatewayEvent>) {
        (self.sender, self.rx)
    }

    /// Returns a clone of the request half.
    #[must_use]
    pub fn sender(&self) -> GatewaySender {
        self.sender.clone()
    }

    /// Sends a request to the gateway.
    ///
    /// # Errors
    /// Returns error if the connection is closed.
    pub async fn send(&self, request: GatewayRequest) -> Result<(), Error> {
        self.sender.send(request).await
    }

    /// Receives the next event from the gateway.
    ///
    /// Returns `None` if the connection is closed.
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        self.rx.recv().await
    }
}
