//! WebSocket transport tasks.
//!
//! A connected socket is split into a reader task that decodes
//! [`GatewayEvent`] frames and a writer task that encodes
//! [`GatewayRequest`] frames. Both talk to the caller over bounded channels.

use crate::types::{GatewayEvent, GatewayRequest};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

/// Spawns the reader and writer tasks for an established socket.
///
/// Returns the request sender and the event receiver. Dropping every clone of
/// the sender closes the socket; the receiver yields `None` once the gateway
/// side goes away.
pub(crate) fn spawn_transport<S>(
    stream: S,
    capacity: usize,
) -> (mpsc::Sender<GatewayRequest>, mpsc::Receiver<GatewayEvent>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Send
        + 'static,
{
    let (mut write, mut read) = stream.split();

    let (event_tx, event_rx) = mpsc::channel::<GatewayEvent>(capacity);
    let (request_tx, mut request_rx) = mpsc::channel::<GatewayRequest>(capacity);

    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<GatewayEvent>(&text) {
                    Ok(event) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Ignoring undecodable gateway frame: {}", e);
                    }
                },
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::debug!("Gateway socket read failed: {}", e);
                    break;
                }
                _ => {}
            }
        }
        tracing::debug!("Gateway reader task finished");
    });

    tokio::spawn(async move {
        while let Some(request) = request_rx.recv().await {
            match serde_json::to_string(&request) {
                Ok(json) => {
                    if write.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to encode gateway request: {}", e);
                }
            }
        }
        let _ = write.send(Message::Close(None)).await;
        tracing::debug!("Gateway writer task finished");
    });

    (request_tx, event_rx)
}
