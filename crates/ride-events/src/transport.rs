//! WebSocket transport: one `axum` upgrade per connection, pumping
//! `ride-events::Bus` outbound messages onto the socket and forwarding
//! inbound frames to a caller-supplied handler. Keepalive is 25s ping /
//! 60s pong per `spec.md` §4.8 and §5; a missed pong tears the connection
//! down and runs presence cleanup (§4.6) via the handler's disconnect hook.

use crate::bus::Bus;
use crate::connection::{ConnectionId, ConnectionIdentity};
use axum::extract::ws::{Message, WebSocket};
use ride_core::OutboundEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, warn};

pub const PING_INTERVAL: Duration = Duration::from_secs(25);
pub const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Implemented by `ride-rpc` to route a raw inbound frame to the JSON-RPC
/// dispatcher and to run presence cleanup on disconnect.
#[async_trait::async_trait]
pub trait ConnectionHandler: Send + Sync {
    async fn on_message(&self, connection_id: ConnectionId, raw: String);
    async fn on_disconnect(&self, connection_id: ConnectionId, identity: ConnectionIdentity);
}

pub async fn serve_connection(
    socket: WebSocket,
    bus: Arc<Bus>,
    identity: ConnectionIdentity,
    socket_id: String,
    handler: Arc<dyn ConnectionHandler>,
) {
    let (mut sink, mut stream) = futures::StreamExt::split(socket);
    let (connection_id, mut outbound_rx) = bus.register(identity, socket_id);

    let mut ping_timer = interval(PING_INTERVAL);
    let mut last_pong = tokio::time::Instant::now();

    loop {
        tokio::select! {
            _ = ping_timer.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    warn!(%connection_id, "pong timeout, closing connection");
                    break;
                }
                if futures::SinkExt::send(&mut sink, Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = futures::StreamExt::next(&mut stream) => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handler.on_message(connection_id, text).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%connection_id, %err, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    bus.unregister(connection_id);
    handler.on_disconnect(connection_id, identity).await;
}

async fn send_event(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &OutboundEvent,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).unwrap_or_default();
    futures::SinkExt::send(sink, Message::Text(payload)).await
}
