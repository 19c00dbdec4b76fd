//! Broadcast DTO for message events
//!
//! The wire shape of a message inside `message:new|updated|deleted`
//! broadcasts. Field names stay snake_case (storage shape) while the
//! surrounding event envelope is camelCase. Timestamps are RFC 3339.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::ids::RoomId;
use crate::store::MessageRecord;
use crate::types::{MessageId, UserId};

/// Message payload relayed to room members
#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub message_type: String,
    pub attachment_url: Option<String>,
    pub attachment_object: Option<String>,
    pub is_deleted: bool,
    pub is_read: bool,
    pub created_at: String,
    pub edited_at: Option<String>,
}

impl MessageDto {
    /// Build the broadcast shape from a stored record
    pub fn from_record(room_id: &RoomId, record: &MessageRecord) -> Self {
        Self {
            id: record.id,
            room_id: room_id.clone(),
            sender_id: record.sender_id,
            receiver_id: record.receiver_id,
            content: record.content.clone(),
            message_type: record.message_type.clone(),
            attachment_url: record.attachment_url.clone(),
            attachment_object: record.attachment_object.clone(),
            is_deleted: record.is_deleted,
            is_read: record.is_read,
            created_at: record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            edited_at: record
                .edited_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}
