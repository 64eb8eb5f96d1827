//! Conversion logic between DTOs and domain entities.

use crate::domain::{ChatEvent, EventKind};
use crate::infrastructure::dto::{http, websocket as dto};
use crate::room::Participant;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<EventKind> for dto::MessageType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Message => dto::MessageType::Message,
            EventKind::Join => dto::MessageType::Join,
            EventKind::Leave => dto::MessageType::Leave,
        }
    }
}

impl From<&ChatEvent> for dto::ChatEventDto {
    fn from(event: &ChatEvent) -> Self {
        Self {
            r#type: event.kind.into(),
            content: event.content.clone(),
            user: event.author.as_ref().map(|u| u.as_str().to_string()),
            timestamp: event.timestamp.clone(),
            rowid: event.sequence.clone(),
        }
    }
}

impl From<Participant> for http::ParticipantDto {
    fn from(participant: Participant) -> Self {
        Self {
            username: participant.username.into_string(),
            connections: participant.connections,
        }
    }
}
