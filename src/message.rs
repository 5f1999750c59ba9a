//! Message protocol definitions
//!
//! JSON text frames. Inbound frames are JSON objects decoded with Serde's
//! tagged enum keyed on `type`; outbound frames share one flat record for
//! every message kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Greeting sent to a connection right after it opens
pub const WELCOME_TEXT: &str =
    "Welcome to Chat WebSocket! Please join a room by sending a JOIN message.";

/// Wire message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// A user joined a room
    Join,
    /// A user left a room
    Leave,
    /// Regular chat message (also used for welcome and error replies)
    Chat,
}

/// Client → Hub frame
///
/// Fields the hub does not need for a given type are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ClientMessage {
    /// Join (or switch to) a room
    Join {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        room: Option<String>,
    },
    /// Leave the current room
    Leave,
    /// Send a chat message to the current room
    Chat {
        #[serde(default)]
        content: Option<String>,
    },
}

impl ClientMessage {
    /// Decode a raw text frame
    ///
    /// Only a JSON object is accepted; serde would otherwise also take the
    /// positional array form of a tagged enum.
    pub fn parse(raw: &str) -> Result<Self, HubError> {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value @ serde_json::Value::Object(_)) => {
                ClientMessage::deserialize(value).map_err(|_| HubError::Malformed)
            }
            _ => Err(HubError::Malformed),
        }
    }

    /// Decode any inbound frame; binary frames are never valid
    pub fn decode(frame: &InboundFrame) -> Result<Self, HubError> {
        match frame {
            InboundFrame::Text(raw) => Self::parse(raw),
            InboundFrame::Binary(_) => Err(HubError::Malformed),
        }
    }
}

/// Raw frame as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl From<String> for InboundFrame {
    fn from(raw: String) -> Self {
        InboundFrame::Text(raw)
    }
}

impl From<&str> for InboundFrame {
    fn from(raw: &str) -> Self {
        InboundFrame::Text(raw.to_string())
    }
}

/// Hub → Client frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// "<username> joined the room"
    pub fn join(id: u64, username: &str, room: &str) -> Self {
        Self::room_event(
            id,
            MessageType::Join,
            username,
            format!("{} joined the room", username),
            room,
        )
    }

    /// "<username> left the room"
    pub fn leave(id: u64, username: &str, room: &str) -> Self {
        Self::room_event(
            id,
            MessageType::Leave,
            username,
            format!("{} left the room", username),
            room,
        )
    }

    pub fn chat(id: u64, username: &str, content: String, room: &str) -> Self {
        Self::room_event(id, MessageType::Chat, username, content, room)
    }

    /// Direct greeting, never broadcast
    pub fn welcome() -> Self {
        Self::direct("welcome", WELCOME_TEXT.to_string())
    }

    /// Error reply for the originating connection only
    pub fn error(text: impl Into<String>) -> Self {
        Self::direct("error", text.into())
    }

    fn room_event(id: u64, kind: MessageType, username: &str, content: String, room: &str) -> Self {
        Self {
            id: id.to_string(),
            username: Some(username.to_string()),
            content,
            kind,
            room: Some(room.to_string()),
            created_at: Utc::now(),
        }
    }

    fn direct(prefix: &str, content: String) -> Self {
        let created_at = Utc::now();
        Self {
            id: format!("{}-{}", prefix, created_at.timestamp_millis()),
            username: None,
            content,
            kind: MessageType::Chat,
            room: None,
            created_at,
        }
    }
}

/// Convert HubError to an error reply for client notification
impl From<HubError> for ChatMessage {
    fn from(err: HubError) -> Self {
        ChatMessage::error(err.to_string())
    }
}
