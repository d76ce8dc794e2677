use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::AppState;
use crate::ws;

/// Upgrade to the room socket. Rooms are joined with events, not by path.
pub async fn room_websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let router = state.router.clone();
    let server_config = state.server_config.clone();
    let metrics = state.metrics.clone();

    ws.on_upgrade(move |socket| ws::handle_room_ws(socket, router, server_config, metrics))
}
