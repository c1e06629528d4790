//! Per-connection socket loop.
//!
//! The socket is split: a writer task drains the connection's outbound
//! channel into the sink, while the read loop feeds text frames to the
//! [`ConnectionHub`]. Nothing else ever touches the socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::ConnectionHub;

/// Runs one WebSocket connection until the client leaves or the socket
/// fails, then tears down its subscriptions.
pub async fn run_connection(socket: WebSocket, hub: ConnectionHub) {
    let (id, mut outbound) = hub.connect();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_tx.send(Message::text(frame)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => hub.handle_frame(id, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %id, error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            _ = &mut writer => {
                tracing::debug!(connection_id = %id, "ws writer stopped");
                break;
            }
        }
    }

    hub.disconnect(id);
}
