//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use futures_util::StreamExt;

use crate::{
    domain::{RoomId, SessionToken},
    room::Connection,
    ui::state::AppState,
    usecase::ConnectError,
};

use super::http::SESSION_COOKIE;

/// `GET /ws/{room_id}`
///
/// The session cookie and the room id are checked before the upgrade, so an
/// unauthenticated client gets a plain 401 rather than a socket. The room is
/// only started once the upgrade is accepted.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    jar: CookieJar,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, StatusCode> {
    let token = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| SessionToken::new(cookie.value().to_string()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let room_id = match RoomId::new(room_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket for invalid room id: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let username = match state.connect_participant_usecase.authenticate(&token).await {
        Ok(username) => username,
        Err(ConnectError::Unauthenticated) => return Err(StatusCode::UNAUTHORIZED),
        Err(ConnectError::Repository(e)) => {
            tracing::error!("Session lookup failed: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // A refused upgrade must not start the room.
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let room = state
        .connect_participant_usecase
        .join_room(&username, &room_id)
        .await;

    let config = state.pump_config.clone();
    let clock = Arc::clone(&state.clock);
    tracing::info!("'{}' is joining room '{}'", username, room_id);

    Ok(ws
        .max_message_size(config.max_message_size)
        .on_upgrade(move |socket| async move {
            let (sink, stream) = socket.split();
            Connection::new(username, room, clock, config)
                .serve(stream, sink)
                .await;
        }))
}
