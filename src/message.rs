//! Wire protocol definitions
//!
//! JSON-based bidirectional event protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Envelope fields are
//! camelCase (`roomId`, `messageId`); the message DTO nested inside
//! broadcast events keeps its snake_case storage shape (see `dto`).

use serde::{Deserialize, Serialize};

use crate::dto::MessageDto;
use crate::ids::RoomId;
use crate::types::{MessageId, UserId};

/// Client → Hub event
///
/// A frame with an unknown `type` tag or a payload that does not match its
/// claimed shape fails to decode; the dispatcher logs and drops such frames
/// without affecting the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Enter a conversation room
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { room_id: RoomId },
    /// Send a new message to a room
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend {
        room_id: RoomId,
        #[serde(default)]
        content: String,
        #[serde(default)]
        message_type: String,
        #[serde(default)]
        attachment_url: Option<String>,
        #[serde(default)]
        attachment_object: Option<String>,
    },
    /// Edit a previously sent message
    #[serde(rename = "message:edit", rename_all = "camelCase")]
    MessageEdit {
        room_id: RoomId,
        message_id: MessageId,
        #[serde(default)]
        content: String,
    },
    /// Soft-delete a previously sent message
    #[serde(rename = "message:delete", rename_all = "camelCase")]
    MessageDelete {
        room_id: RoomId,
        message_id: MessageId,
    },
    /// Typing indicator on
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { room_id: RoomId },
    /// Typing indicator off
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { room_id: RoomId },
    /// Protocol-level keepalive; answered with `pong`
    #[serde(rename = "ping")]
    Ping,
}

/// Hub → Client event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A new message was persisted and is being relayed to the room
    #[serde(rename = "message:new", rename_all = "camelCase")]
    MessageNew { room_id: RoomId, message: MessageDto },
    /// An existing message was edited
    #[serde(rename = "message:updated", rename_all = "camelCase")]
    MessageUpdated { room_id: RoomId, message: MessageDto },
    /// An existing message was soft-deleted
    #[serde(rename = "message:deleted", rename_all = "camelCase")]
    MessageDeleted { room_id: RoomId, message: MessageDto },
    /// Updated roster of distinct user ids present in a room
    #[serde(rename = "presence:update", rename_all = "camelCase")]
    PresenceUpdate { room_id: RoomId, users: Vec<UserId> },
    /// A room member started typing
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { room_id: RoomId, user_id: UserId },
    /// A room member stopped typing
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { room_id: RoomId, user_id: UserId },
    /// Keepalive reply, sent to the pinging connection only
    #[serde(rename = "pong")]
    Pong,
    /// Room access was revoked (relationship no longer permits it)
    #[serde(rename = "room:revoked", rename_all = "camelCase")]
    RoomRevoked { room_id: RoomId },
    /// The account was suspended by an administrative action
    #[serde(rename = "account:suspended")]
    AccountSuspended {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ServerEvent {
    /// Serialize to the wire text form
    ///
    /// Serialization of these variants cannot realistically fail; errors
    /// are still surfaced so callers can log instead of panicking.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
