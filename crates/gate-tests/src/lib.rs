//! Integration test support for the options data gate.
//!
//! [`ScriptedServer`] runs a real WebSocket gateway on a loopback port and
//! answers every request through a [`MockGateway`] script, so the tests
//! exercise the production transport end to end.

use futures_util::{SinkExt, StreamExt};
use gateway_client::GatewayRequest;
use options_data_gate::broker::{MockGateway, WsConnector};
use options_data_gate::config::{Config, JournalConfig};
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// WebSocket gateway answering from a script.
pub struct ScriptedServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    /// Binds a loopback port and starts accepting connections.
    ///
    /// # Errors
    /// Returns error if the listener cannot be bound.
    pub async fn start(gateway: MockGateway) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, gateway.clone()));
            }
        });

        Ok(Self { addr, handle })
    }

    /// Gateway URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Listening port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connector pointing at this server.
    #[must_use]
    pub fn connector(&self) -> WsConnector {
        WsConnector::with_url(&self.url())
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(stream: TcpStream, gateway: MockGateway) {
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::debug!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    let (mut sink, mut source) = socket.split();

    while let Some(Ok(message)) = source.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(request) = serde_json::from_str::<GatewayRequest>(&text) else {
            continue;
        };
        for event in gateway.respond(&request) {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }
}

/// Configuration pointing at `port` with short timeouts and journal files
/// under `root`.
#[must_use]
pub fn test_config(port: u16, root: &Path) -> Config {
    let mut config = Config {
        journal: JournalConfig::rooted_at(root),
        ..Default::default()
    };
    config.broker.port = port;
    config.broker.connect_timeout_secs = 2.0;
    config.broker.request_timeout_secs = 0.5;
    config
}
