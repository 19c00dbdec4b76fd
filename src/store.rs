//! Collaborator interfaces
//!
//! The hub never owns durable state. It drives three narrow collaborators:
//! message persistence, friendship authorization and attachment storage.
//! The traits are object-safe so the dispatcher can hold `Arc<dyn _>`.
//!
//! In-memory implementations back the bundled binary and the test suite;
//! a production deployment substitutes database/object-store versions.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::types::{MessageId, UserId};

/// A persisted chat message, owned by the message store
///
/// The hub only triggers creation/mutation of records and relays the
/// resulting state as a broadcast DTO.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    /// One of `text`, `sticker`, `image`
    pub message_type: String,
    pub attachment_url: Option<String>,
    /// Object-store key of the attachment, if any
    pub attachment_object: Option<String>,
    pub is_read: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields of a message about to be persisted
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub message_type: String,
    pub attachment_url: Option<String>,
    pub attachment_object: Option<String>,
}

/// Message persistence collaborator
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message, returning the stored record
    async fn create(&self, msg: NewMessage) -> Result<MessageRecord, AppError>;

    /// Look up a message by id
    async fn get(&self, id: MessageId) -> Result<Option<MessageRecord>, AppError>;

    /// Write back a mutated record (edit, soft delete)
    async fn update(&self, record: &MessageRecord) -> Result<(), AppError>;

    /// Upsert a read receipt for `user_id` on `message_id`
    async fn mark_read(&self, message_id: MessageId, user_id: UserId) -> Result<(), AppError>;
}

/// Friendship authorization collaborator
#[async_trait]
pub trait FriendshipChecker: Send + Sync {
    /// Are these two users currently connected as friends?
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, AppError>;
}

/// Attachment object storage collaborator
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Delete a stored object by key
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    messages: HashMap<MessageId, MessageRecord>,
    receipts: HashMap<(MessageId, UserId), DateTime<Utc>>,
    next_id: u64,
}

/// In-memory [`MessageStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, msg: NewMessage) -> Result<MessageRecord, AppError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let record = MessageRecord {
            id: MessageId(inner.next_id),
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id,
            content: msg.content,
            message_type: msg.message_type,
            attachment_url: msg.attachment_url,
            attachment_object: msg.attachment_object,
            is_read: false,
            is_deleted: false,
            created_at: Utc::now(),
            edited_at: None,
            deleted_at: None,
        };
        inner.messages.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: MessageId) -> Result<Option<MessageRecord>, AppError> {
        Ok(self.inner.lock().await.messages.get(&id).cloned())
    }

    async fn update(&self, record: &MessageRecord) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.messages.contains_key(&record.id) {
            return Err(AppError::MessageNotFound(record.id));
        }
        inner.messages.insert(record.id, record.clone());
        Ok(())
    }

    async fn mark_read(&self, message_id: MessageId, user_id: UserId) -> Result<(), AppError> {
        self.inner
            .lock()
            .await
            .receipts
            .insert((message_id, user_id), Utc::now());
        Ok(())
    }
}

/// In-memory [`FriendshipChecker`] with a mutable pair set
///
/// Pairs can be revoked mid-session, which is how live un-friend
/// revocation is exercised in tests and demos.
#[derive(Default)]
pub struct MemoryFriendships {
    pairs: Mutex<HashSet<(UserId, UserId)>>,
    allow_all: bool,
}

impl MemoryFriendships {
    pub fn new() -> Self {
        Self::default()
    }

    /// A checker that approves every pair
    pub fn allow_all() -> Self {
        Self {
            pairs: Mutex::new(HashSet::new()),
            allow_all: true,
        }
    }

    fn key(a: UserId, b: UserId) -> (UserId, UserId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub async fn befriend(&self, a: UserId, b: UserId) {
        self.pairs.lock().await.insert(Self::key(a, b));
    }

    pub async fn unfriend(&self, a: UserId, b: UserId) {
        self.pairs.lock().await.remove(&Self::key(a, b));
    }
}

#[async_trait]
impl FriendshipChecker for MemoryFriendships {
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, AppError> {
        if self.allow_all {
            return Ok(true);
        }
        Ok(self.pairs.lock().await.contains(&Self::key(a, b)))
    }
}

/// [`AttachmentStore`] that only records which keys were deleted
#[derive(Default)]
pub struct NullAttachmentStore {
    deleted: Mutex<Vec<String>>,
}

impl NullAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys deleted so far (test inspection)
    pub async fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl AttachmentStore for NullAttachmentStore {
    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.deleted.lock().await.push(key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_text_message(sender: u64, receiver: u64, content: &str) -> NewMessage {
        NewMessage {
            sender_id: UserId(sender),
            receiver_id: UserId(receiver),
            content: content.to_string(),
            message_type: "text".to_string(),
            attachment_url: None,
            attachment_object: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_create_and_get() {
        let store = MemoryStore::new();
        let record = store.create(new_text_message(3, 7, "hi")).await.unwrap();
        assert_eq!(record.sender_id, UserId(3));
        assert!(!record.is_deleted);

        let loaded = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "hi");

        assert!(store.get(MessageId(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_update() {
        let store = MemoryStore::new();
        let mut record = store.create(new_text_message(3, 7, "hi")).await.unwrap();
        record.content = "edited".to_string();
        record.edited_at = Some(Utc::now());
        store.update(&record).await.unwrap();

        let loaded = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.content, "edited");
        assert!(loaded.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_memory_store_update_missing() {
        let store = MemoryStore::new();
        let mut record = store.create(new_text_message(3, 7, "hi")).await.unwrap();
        record.id = MessageId(42);
        let err = store.update(&record).await.unwrap_err();
        assert!(matches!(err, AppError::MessageNotFound(MessageId(42))));
    }

    #[tokio::test]
    async fn test_friendships_symmetric_and_revocable() {
        let friends = MemoryFriendships::new();
        assert!(!friends.are_friends(UserId(3), UserId(7)).await.unwrap());

        friends.befriend(UserId(7), UserId(3)).await;
        assert!(friends.are_friends(UserId(3), UserId(7)).await.unwrap());
        assert!(friends.are_friends(UserId(7), UserId(3)).await.unwrap());

        friends.unfriend(UserId(3), UserId(7)).await;
        assert!(!friends.are_friends(UserId(3), UserId(7)).await.unwrap());
    }

    #[tokio::test]
    async fn test_null_attachment_store_records_deletes() {
        let store = NullAttachmentStore::new();
        store.delete("uploads/a.png").await.unwrap();
        assert_eq!(store.deleted_keys().await, vec!["uploads/a.png".to_string()]);
    }
}
