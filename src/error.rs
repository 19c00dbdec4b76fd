//! Error types for the messaging hub
//!
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{MessageId, UserId};

/// Application-level errors
///
/// Transport variants are fatal to a single connection; everything else is
/// handled locally by the dispatcher (logged, event dropped).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal to the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal to the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Room id is not two integers joined by the delimiter
    #[error("Malformed room id: {0}")]
    MalformedRoomId(String),

    /// User is not one of the two participants encoded in the room id
    #[error("User {user} is not in room {room}")]
    UserNotInRoom { room: String, user: UserId },

    /// Message id does not exist in the store
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// Message persistence collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Attachment storage collaborator failure
    #[error("Attachment error: {0}")]
    Attachment(String),
}
