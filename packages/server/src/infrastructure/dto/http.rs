//! HTTP API DTOs.

use serde::{Deserialize, Serialize};

/// Form body of `POST /signup` and `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

/// Response of a successful sign-up or log-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDto {
    pub username: String,
}

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSummaryDto {
    pub id: String,
    /// Distinct authors in the room's history
    pub user_count: usize,
    /// Whether a coordinator is running for the room in this process
    pub active: bool,
}

/// Live participant in `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantDto {
    pub username: String,
    pub connections: usize,
}

/// Response of `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomDetailDto {
    pub id: String,
    pub participants: Vec<ParticipantDto>,
}
