//! WebSocket Handler
//!
//! Per-connection loop: a spawned writer drains the connection's bounded queue
//! into the socket while the read loop dispatches one event at a time.

use axum::extract::ws::{Message, WebSocket};
use futures::{sink::SinkExt, stream::StreamExt};
use room_core::{Connection, EventRouter};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::metrics::ServerMetrics;

pub async fn handle_room_ws(
    socket: WebSocket,
    router: Arc<EventRouter>,
    server_config: Arc<ServerConfig>,
    metrics: Arc<ServerMetrics>,
) {
    let connection_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %connection_id, "New room WebSocket connection");
    metrics.connection_opened();

    let (connection, mut rx) = Connection::channel(
        connection_id.clone(),
        server_config.websocket.send_channel_capacity,
    );
    router.registry().register(&connection).await;

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Detached: a disconnect never cancels a write already in flight.
    let writer_metrics = metrics.clone();
    let writer_conn_id = connection_id.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(event.as_ref()) {
                Ok(j) => j,
                Err(e) => {
                    error!(conn_id = %writer_conn_id, "Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                debug!(conn_id = %writer_conn_id, "Socket closed while writing");
                break;
            }
            writer_metrics.message_sent();
        }
        let _ = ws_sender.close().await;
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics.event_received();
                let report = router.dispatch_text(&connection, text.as_str()).await;
                metrics.record_dispatch(&report);
            }
            Ok(Message::Binary(_)) => {
                debug!(conn_id = %connection_id, "Ignoring binary frame");
            }
            Ok(Message::Close(_)) => {
                debug!(conn_id = %connection_id, "Client closed connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %connection_id, "WebSocket error: {}", e);
                metrics.websocket_error();
                break;
            }
        }
    }

    let report = router.disconnect(&connection).await;
    metrics.record_dispatch(&report);

    let drops = connection.drop_count();
    // Last strong handle: dropping it closes the queue and lets the writer finish.
    drop(connection);

    metrics.connection_closed();
    if drops > 0 {
        warn!(
            conn_id = %connection_id,
            dropped = drops,
            "Room WebSocket closed with dropped deliveries"
        );
    } else {
        info!(conn_id = %connection_id, "Room WebSocket closed");
    }
}
