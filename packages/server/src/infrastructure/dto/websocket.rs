//! WebSocket message DTOs.
//!
//! Every outbound frame is one JSON object:
//!
//! ```json
//! {"type":"message","content":"hi","user":"alice","timestamp":"Monday 3:04PM","rowid":"12"}
//! ```
//!
//! `user` is omitted for system events without an author and `rowid` only
//! appears on events replayed from history. Inbound text frames are not JSON;
//! their payload is the message content as typed.

use serde::{Deserialize, Serialize};

/// Value of the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Message,
    Join,
    Leave,
}

/// A chat event as sent to WebSocket clients (and returned by the history API)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEventDto {
    pub r#type: MessageType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowid: Option<String>,
}
