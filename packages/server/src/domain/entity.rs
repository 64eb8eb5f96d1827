//! Domain entities.

use std::{fmt, str::FromStr};

use super::{RoomId, Username, error::ValueObjectError};

/// Content of the synthesized `join` event
pub const JOIN_CONTENT: &str = "has joined the chat";

/// Content of the synthesized `leave` event
pub const LEAVE_CONTENT: &str = "has left the chat";

/// Kind of a [`ChatEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    Join,
    Leave,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
        }
    }
}

impl FromStr for EventKind {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(EventKind::Message),
            "join" => Ok(EventKind::Join),
            "leave" => Ok(EventKind::Leave),
            other => Err(ValueObjectError::UnknownEventKind(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit broadcast to a room and persisted in its history.
///
/// Events are immutable once built. Their order within a room is the order in
/// which the room's coordinator accepted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: EventKind,
    pub content: String,
    /// Author, absent for system events that are not tied to a user
    pub author: Option<Username>,
    /// Display timestamp, e.g. "Monday 3:04PM"
    pub timestamp: String,
    /// Storage row identifier; only set on events read back from history
    pub sequence: Option<String>,
}

impl ChatEvent {
    /// A chat message written by `author`
    pub fn message(author: Username, content: String, timestamp: String) -> Self {
        Self {
            kind: EventKind::Message,
            content,
            author: Some(author),
            timestamp,
            sequence: None,
        }
    }

    /// Presence event for a user's first connection in a room
    pub fn join(user: Username, timestamp: String) -> Self {
        Self {
            kind: EventKind::Join,
            content: JOIN_CONTENT.to_string(),
            author: Some(user),
            timestamp,
            sequence: None,
        }
    }

    /// Presence event for a user's last connection leaving a room
    pub fn leave(user: Username, timestamp: String) -> Self {
        Self {
            kind: EventKind::Leave,
            content: LEAVE_CONTENT.to_string(),
            author: Some(user),
            timestamp,
            sequence: None,
        }
    }

    /// Attach the storage row identifier (used by repositories on replay)
    pub fn with_sequence(mut self, sequence: String) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: Username,
    pub hashed_password: String,
}

/// Room listing entry: id and number of distinct authors seen in its history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub user_count: usize,
}
