//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    domain::{RoomId, SessionToken, Username},
    infrastructure::dto::{
        http::{CredentialsForm, RoomDetailDto, RoomSummaryDto, SessionDto},
        websocket::ChatEventDto,
    },
    ui::state::AppState,
    usecase::{GetRoomDetailError, LogInError, SignUpError},
};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "SessionToken";

type ApiError = (StatusCode, String);

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn session_cookie(jar: CookieJar, token: SessionToken) -> CookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, token.as_str().to_string()))
            .path("/")
            .http_only(true),
    )
}

fn parse_room_id(room_id: String) -> Result<RoomId, ApiError> {
    RoomId::new(room_id).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn session_response(
    status: StatusCode,
    jar: CookieJar,
    username: Username,
    token: SessionToken,
) -> (StatusCode, CookieJar, Json<SessionDto>) {
    (
        status,
        session_cookie(jar, token),
        Json(SessionDto {
            username: username.into_string(),
        }),
    )
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Create an account and start a session
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(StatusCode, CookieJar, Json<SessionDto>), ApiError> {
    match state
        .sign_up_usecase
        .execute(form.username, form.password)
        .await
    {
        Ok((username, token)) => Ok(session_response(StatusCode::CREATED, jar, username, token)),
        Err(e @ (SignUpError::InvalidUsername(_) | SignUpError::EmptyPassword)) => {
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ SignUpError::UsernameTaken(_)) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err(internal_error(e)),
    }
}

/// Start a session for an existing account
pub async fn log_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(StatusCode, CookieJar, Json<SessionDto>), ApiError> {
    match state
        .log_in_usecase
        .execute(form.username, form.password)
        .await
    {
        Ok((username, token)) => Ok(session_response(StatusCode::OK, jar, username, token)),
        Err(e @ LogInError::InvalidCredentials) => Err((StatusCode::UNAUTHORIZED, e.to_string())),
        Err(e) => Err(internal_error(e)),
    }
}

/// Get list of rooms
pub async fn get_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummaryDto>>, ApiError> {
    let rooms = state
        .get_rooms_usecase
        .execute()
        .await
        .map_err(internal_error)?;

    // Domain Model から DTO への変換
    let room_summaries = rooms
        .into_iter()
        .map(|room| RoomSummaryDto {
            id: room.id.into_string(),
            user_count: room.user_count,
            active: room.active,
        })
        .collect();

    Ok(Json(room_summaries))
}

/// Get the live participants of a running room
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let room_id = parse_room_id(room_id)?;

    match state.get_room_detail_usecase.execute(&room_id).await {
        Ok(participants) => Ok(Json(RoomDetailDto {
            id: room_id.into_string(),
            participants: participants.into_iter().map(Into::into).collect(),
        })),
        Err(e @ GetRoomDetailError::NotRunning(_)) => Err((StatusCode::NOT_FOUND, e.to_string())),
        Err(e) => Err(internal_error(e)),
    }
}

/// Get the persisted history of a room
pub async fn get_room_history(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ChatEventDto>>, ApiError> {
    let room_id = parse_room_id(room_id)?;

    let history = state
        .get_room_history_usecase
        .execute(&room_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(history.iter().map(ChatEventDto::from).collect()))
}
