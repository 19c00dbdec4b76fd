//! Event dispatcher: protocol state machine over inbound frames
//!
//! Classifies each inbound frame, validates authorization and content
//! policy, drives the storage collaborators and emits outbound events
//! through the hub. Every failure is local: malformed, unauthorized and
//! policy-violating frames are logged and dropped without touching the
//! connection; only transport failures (handled in `client`) are fatal.
//!
//! Room membership alone is never trusted for mutating operations. Each
//! send/edit/delete/typing event re-derives the counterparty from the room
//! id and re-checks the friendship, so an un-friend mid-session revokes
//! access on the next event rather than lingering until reconnect.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::client::Client;
use crate::dto::MessageDto;
use crate::hub::HubHandle;
use crate::ids::RoomId;
use crate::message::{ClientEvent, ServerEvent};
use crate::store::{AttachmentStore, FriendshipChecker, MessageStore, NewMessage};
use crate::types::{MessageId, UserId};

/// Routes inbound client events
pub struct Dispatcher {
    store: Arc<dyn MessageStore>,
    friendships: Arc<dyn FriendshipChecker>,
    attachments: Arc<dyn AttachmentStore>,
    hub: HubHandle,
    max_message_chars: usize,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn MessageStore>,
        friendships: Arc<dyn FriendshipChecker>,
        attachments: Arc<dyn AttachmentStore>,
        hub: HubHandle,
        max_message_chars: usize,
    ) -> Self {
        Self {
            store,
            friendships,
            attachments,
            hub,
            max_message_chars,
        }
    }

    /// Decode and route one inbound frame
    pub async fn dispatch(&self, client: &Arc<Client>, raw: &str) {
        let event = match serde_json::from_str::<ClientEvent>(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("invalid frame from user {}: {e}", client.user_id);
                return;
            }
        };

        match event {
            ClientEvent::Join { room_id } => self.handle_join(client, room_id).await,
            ClientEvent::MessageSend {
                room_id,
                content,
                message_type,
                attachment_url,
                attachment_object,
            } => {
                self.handle_send(
                    client,
                    room_id,
                    content,
                    message_type,
                    attachment_url,
                    attachment_object,
                )
                .await
            }
            ClientEvent::MessageEdit {
                room_id,
                message_id,
                content,
            } => self.handle_edit(client, room_id, message_id, content).await,
            ClientEvent::MessageDelete {
                room_id,
                message_id,
            } => self.handle_delete(client, room_id, message_id).await,
            ClientEvent::TypingStart { room_id } => {
                self.handle_typing(client, room_id, true).await
            }
            ClientEvent::TypingStop { room_id } => {
                self.handle_typing(client, room_id, false).await
            }
            ClientEvent::Ping => client.send_event(&ServerEvent::Pong),
        }
    }

    async fn handle_join(&self, client: &Arc<Client>, room_id: RoomId) {
        if !room_id.is_member(client.user_id) {
            warn!(
                "unauthorized room access: user={} room={}",
                client.user_id, room_id
            );
            return;
        }
        if self.ensure_room_access(client, &room_id).await.is_none() {
            return;
        }
        info!("user {} joined {}", client.user_id, room_id);
        client.join_room(room_id).await;
    }

    async fn handle_send(
        &self,
        client: &Arc<Client>,
        room_id: RoomId,
        content: String,
        message_type: String,
        attachment_url: Option<String>,
        attachment_object: Option<String>,
    ) {
        if !room_id.is_member(client.user_id) {
            warn!("user {} is not part of room {}", client.user_id, room_id);
            return;
        }

        let mut message_type = message_type.trim().to_lowercase();
        if message_type.is_empty() {
            message_type = "text".to_string();
        }

        let content = content.trim().to_string();
        if content.chars().count() > self.max_message_chars {
            warn!("message from user {} too long, dropped", client.user_id);
            return;
        }

        let attachment_url = normalize_optional(attachment_url);
        let attachment_object = normalize_optional(attachment_object);

        match message_type.as_str() {
            "text" | "sticker" if content.is_empty() => {
                warn!("{message_type} content is empty");
                return;
            }
            "text" | "sticker" => {}
            "image" => {
                if attachment_url.is_none() {
                    warn!("image attachment missing");
                    return;
                }
            }
            other => {
                warn!("unsupported message type {other:?}");
                return;
            }
        }

        let Some(receiver_id) = self.ensure_room_access(client, &room_id).await else {
            return;
        };

        let record = match self
            .store
            .create(NewMessage {
                sender_id: client.user_id,
                receiver_id,
                content,
                message_type,
                attachment_url,
                attachment_object,
            })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!("failed to persist message: {e}");
                return;
            }
        };

        // Best-effort: the sender has trivially read their own message
        if let Err(e) = self.store.mark_read(record.id, client.user_id).await {
            warn!("failed to upsert read receipt: {e}");
        }

        let dto = MessageDto::from_record(&room_id, &record);
        self.hub
            .emit(
                room_id.clone(),
                &ServerEvent::MessageNew {
                    room_id: room_id.clone(),
                    message: dto,
                },
            )
            .await;
    }

    async fn handle_edit(
        &self,
        client: &Arc<Client>,
        room_id: RoomId,
        message_id: MessageId,
        content: String,
    ) {
        if !room_id.is_member(client.user_id) {
            warn!("user {} cannot edit in room {}", client.user_id, room_id);
            return;
        }
        if self.ensure_room_access(client, &room_id).await.is_none() {
            return;
        }

        let Some(mut record) = self.load_own_message(client, &room_id, message_id).await else {
            return;
        };
        if record.is_deleted {
            return;
        }

        let content = content.trim().to_string();
        if record.message_type != "image" {
            if content.is_empty() {
                warn!("empty edit content");
                return;
            }
            if content.chars().count() > self.max_message_chars {
                warn!("edit content too long");
                return;
            }
        }

        record.content = content;
        record.edited_at = Some(Utc::now());
        if let Err(e) = self.store.update(&record).await {
            error!("failed to update message {}: {e}", record.id);
            return;
        }

        let dto = MessageDto::from_record(&room_id, &record);
        self.hub
            .emit(
                room_id.clone(),
                &ServerEvent::MessageUpdated {
                    room_id: room_id.clone(),
                    message: dto,
                },
            )
            .await;
    }

    async fn handle_delete(&self, client: &Arc<Client>, room_id: RoomId, message_id: MessageId) {
        if !room_id.is_member(client.user_id) {
            return;
        }
        if self.ensure_room_access(client, &room_id).await.is_none() {
            return;
        }

        let Some(mut record) = self.load_own_message(client, &room_id, message_id).await else {
            return;
        };
        if record.is_deleted {
            return;
        }

        record.is_deleted = true;
        record.deleted_at = Some(Utc::now());
        record.content.clear();
        if let Some(key) = record.attachment_object.take() {
            if let Err(e) = self.attachments.delete(&key).await {
                warn!("failed to delete attachment {key:?}: {e}");
            }
        }
        record.attachment_url = None;

        if let Err(e) = self.store.update(&record).await {
            error!("failed to delete message {}: {e}", record.id);
            return;
        }

        let dto = MessageDto::from_record(&room_id, &record);
        self.hub
            .emit(
                room_id.clone(),
                &ServerEvent::MessageDeleted {
                    room_id: room_id.clone(),
                    message: dto,
                },
            )
            .await;
    }

    async fn handle_typing(&self, client: &Arc<Client>, room_id: RoomId, started: bool) {
        if !room_id.is_member(client.user_id) {
            return;
        }
        if self.ensure_room_access(client, &room_id).await.is_none() {
            return;
        }

        let event = if started {
            ServerEvent::TypingStart {
                room_id: room_id.clone(),
                user_id: client.user_id,
            }
        } else {
            ServerEvent::TypingStop {
                room_id: room_id.clone(),
                user_id: client.user_id,
            }
        };
        self.hub.emit(room_id, &event).await;
    }

    /// Load a message and verify it belongs to this room and this sender
    ///
    /// The room-correspondence check (`canonical(sender, receiver) == room`)
    /// blocks cross-room forgery: a valid message id cannot be edited or
    /// deleted through a different room the requester happens to be in.
    async fn load_own_message(
        &self,
        client: &Arc<Client>,
        room_id: &RoomId,
        message_id: MessageId,
    ) -> Option<crate::store::MessageRecord> {
        let record = match self.store.get(message_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!("message {message_id} not found");
                return None;
            }
            Err(e) => {
                error!("failed to load message {message_id}: {e}");
                return None;
            }
        };
        if &RoomId::canonical(record.sender_id, record.receiver_id) != room_id {
            warn!("message {} not in room {}", record.id, room_id);
            return None;
        }
        if record.sender_id != client.user_id {
            warn!(
                "user {} cannot modify message {} of user {}",
                client.user_id, record.id, record.sender_id
            );
            return None;
        }
        Some(record)
    }

    /// Re-validate that the requester may act in this room right now
    ///
    /// Returns the counterparty id on success. A failed friendship check
    /// revokes the room: the requester is notified and forcibly removed,
    /// so stale access cannot survive into later events. A checker error
    /// only denies the single operation (transient, no revocation).
    async fn ensure_room_access(&self, client: &Arc<Client>, room_id: &RoomId) -> Option<UserId> {
        let peer_id = match room_id.counterparty(client.user_id) {
            Ok(peer_id) => peer_id,
            Err(e) => {
                warn!("failed to resolve room {}: {e}", room_id);
                return None;
            }
        };
        match self.friendships.are_friends(client.user_id, peer_id).await {
            Ok(true) => Some(peer_id),
            Ok(false) => {
                info!(
                    "room {} revoked for user {} (no longer friends)",
                    room_id, client.user_id
                );
                client.send_event(&ServerEvent::RoomRevoked {
                    room_id: room_id.clone(),
                });
                client.leave_room(room_id).await;
                None
            }
            Err(e) => {
                warn!("friendship check failed: {e}");
                None
            }
        }
    }
}

/// Trim an optional field; blank values collapse to `None`
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Hub;
    use crate::registry::Registry;
    use crate::store::{MemoryFriendships, MemoryStore, NullAttachmentStore};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct TestEnv {
        hub: HubHandle,
        registry: Arc<Registry>,
        store: Arc<MemoryStore>,
        friendships: Arc<MemoryFriendships>,
        attachments: Arc<NullAttachmentStore>,
        dispatcher: Arc<Dispatcher>,
    }

    fn env() -> TestEnv {
        let (hub, actor) = Hub::new(64);
        tokio::spawn(actor.run());
        let registry = Arc::new(Registry::new());
        let store = Arc::new(MemoryStore::new());
        let friendships = Arc::new(MemoryFriendships::new());
        let attachments = Arc::new(NullAttachmentStore::new());
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            friendships.clone(),
            attachments.clone(),
            hub.clone(),
            2000,
        ));
        TestEnv {
            hub,
            registry,
            store,
            friendships,
            attachments,
            dispatcher,
        }
    }

    impl TestEnv {
        async fn connect(&self, user: u64) -> (Arc<Client>, mpsc::Receiver<String>) {
            let (client, rx) =
                Client::new(UserId(user), self.hub.clone(), self.registry.clone(), 64);
            self.registry.register(client.clone()).await;
            (client, rx)
        }

        async fn dispatch(&self, client: &Arc<Client>, frame: Value) {
            self.dispatcher.dispatch(client, &frame.to_string()).await;
        }
    }

    /// Read frames until one of the given type arrives
    async fn next_of(rx: &mut mpsc::Receiver<String>, event_type: &str) -> Value {
        loop {
            let frame = timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {event_type}"))
                .expect("queue closed");
            let json: Value = serde_json::from_str(&frame).unwrap();
            if json["type"] == event_type {
                return json;
            }
        }
    }

    async fn assert_no_frame_of(rx: &mut mpsc::Receiver<String>, event_type: &str) {
        tokio::time::sleep(Duration::from_millis(30)).await;
        while let Ok(frame) = rx.try_recv() {
            let json: Value = serde_json::from_str(&frame).unwrap();
            assert_ne!(json["type"], event_type, "unexpected {event_type}: {json}");
        }
    }

    #[tokio::test]
    async fn test_image_send_end_to_end() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        let (c7, mut rx7) = env.connect(7).await;

        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;
        env.dispatch(&c7, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({
                "type": "message:send",
                "roomId": "3-7",
                "content": "",
                "messageType": "image",
                "attachmentUrl": "http://x/y.png",
                "attachmentObject": "uploads/y.png",
            }),
        )
        .await;

        for rx in [&mut rx3, &mut rx7] {
            let event = next_of(rx, "message:new").await;
            assert_eq!(event["roomId"], "3-7");
            assert_eq!(event["message"]["message_type"], "image");
            assert_eq!(event["message"]["attachment_url"], "http://x/y.png");
            assert_eq!(event["message"]["sender_id"], 3);
            assert_eq!(event["message"]["receiver_id"], 7);
        }

        let record = env.store.get(MessageId(1)).await.unwrap().unwrap();
        assert_eq!(record.message_type, "image");
        assert_eq!(record.attachment_url.as_deref(), Some("http://x/y.png"));
    }

    #[tokio::test]
    async fn test_overlong_content_dropped_without_record() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;

        let long = "x".repeat(2001);
        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": long, "messageType": "text"}),
        )
        .await;
        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "ok", "messageType": "text"}),
        )
        .await;

        // Only the valid message was persisted and broadcast
        let event = next_of(&mut rx3, "message:new").await;
        assert_eq!(event["message"]["content"], "ok");
        assert_eq!(
            env.store.get(MessageId(1)).await.unwrap().unwrap().content,
            "ok"
        );
        assert!(env.store.get(MessageId(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_text_and_unsupported_type_dropped() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "   ", "messageType": "text"}),
        )
        .await;
        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "hi", "messageType": "video"}),
        )
        .await;
        // Image without an attachment url is also dropped
        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "", "messageType": "image"}),
        )
        .await;

        assert_no_frame_of(&mut rx3, "message:new").await;
        assert!(env.store.get(MessageId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_message_type_defaults_to_text() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "hello"}),
        )
        .await;

        let event = next_of(&mut rx3, "message:new").await;
        assert_eq!(event["message"]["message_type"], "text");
    }

    #[tokio::test]
    async fn test_delete_by_non_sender_is_noop() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        let (c7, _rx7) = env.connect(7).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;
        env.dispatch(&c7, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "keep me", "messageType": "text"}),
        )
        .await;
        next_of(&mut rx3, "message:new").await;

        env.dispatch(
            &c7,
            json!({"type": "message:delete", "roomId": "3-7", "messageId": 1}),
        )
        .await;

        assert_no_frame_of(&mut rx3, "message:deleted").await;
        let record = env.store.get(MessageId(1)).await.unwrap().unwrap();
        assert!(!record.is_deleted);
        assert_eq!(record.content, "keep me");
    }

    #[tokio::test]
    async fn test_delete_by_sender_soft_deletes_and_removes_attachment() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        let (c7, mut rx7) = env.connect(7).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;
        env.dispatch(&c7, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({
                "type": "message:send",
                "roomId": "3-7",
                "content": "",
                "messageType": "image",
                "attachmentUrl": "http://x/y.png",
                "attachmentObject": "uploads/y.png",
            }),
        )
        .await;
        next_of(&mut rx3, "message:new").await;

        env.dispatch(
            &c3,
            json!({"type": "message:delete", "roomId": "3-7", "messageId": 1}),
        )
        .await;

        for rx in [&mut rx3, &mut rx7] {
            let event = next_of(rx, "message:deleted").await;
            assert_eq!(event["message"]["is_deleted"], true);
            assert_eq!(event["message"]["content"], "");
        }

        let record = env.store.get(MessageId(1)).await.unwrap().unwrap();
        assert!(record.is_deleted);
        assert!(record.content.is_empty());
        assert!(record.attachment_url.is_none());
        assert!(record.attachment_object.is_none());
        assert!(record.deleted_at.is_some());
        assert_eq!(env.attachments.deleted_keys().await, vec!["uploads/y.png"]);

        // Deleting again is a no-op
        env.dispatch(
            &c3,
            json!({"type": "message:delete", "roomId": "3-7", "messageId": 1}),
        )
        .await;
        assert_no_frame_of(&mut rx3, "message:deleted").await;
    }

    #[tokio::test]
    async fn test_edit_by_sender_relays_update() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        let (c7, mut rx7) = env.connect(7).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;
        env.dispatch(&c7, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "drafty", "messageType": "text"}),
        )
        .await;
        next_of(&mut rx3, "message:new").await;

        env.dispatch(
            &c3,
            json!({"type": "message:edit", "roomId": "3-7", "messageId": 1, "content": "final"}),
        )
        .await;

        for rx in [&mut rx3, &mut rx7] {
            let event = next_of(rx, "message:updated").await;
            assert_eq!(event["message"]["content"], "final");
            assert!(event["message"]["edited_at"].is_string());
        }
        let record = env.store.get(MessageId(1)).await.unwrap().unwrap();
        assert_eq!(record.content, "final");
        assert!(record.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_edit_blocks_non_sender_and_cross_room_forgery() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        env.friendships.befriend(UserId(3), UserId(9)).await;
        let (c3, mut rx3) = env.connect(3).await;
        let (c7, _rx7) = env.connect(7).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "original", "messageType": "text"}),
        )
        .await;
        next_of(&mut rx3, "message:new").await;

        // Non-sender cannot edit
        env.dispatch(
            &c7,
            json!({"type": "message:edit", "roomId": "3-7", "messageId": 1, "content": "hijack"}),
        )
        .await;
        // Sender cannot edit through a different room they also belong to
        env.dispatch(
            &c3,
            json!({"type": "message:edit", "roomId": "3-9", "messageId": 1, "content": "smuggled"}),
        )
        .await;

        assert_no_frame_of(&mut rx3, "message:updated").await;
        assert_eq!(
            env.store.get(MessageId(1)).await.unwrap().unwrap().content,
            "original"
        );
    }

    #[tokio::test]
    async fn test_revoked_friendship_sends_room_revoked_and_stays_revoked() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, mut rx3) = env.connect(3).await;
        let (c7, mut rx7) = env.connect(7).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;
        env.dispatch(&c7, json!({"type": "join", "roomId": "3-7"})).await;
        next_of(&mut rx7, "presence:update").await;

        env.friendships.unfriend(UserId(3), UserId(7)).await;

        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "too late", "messageType": "text"}),
        )
        .await;

        let revoked = next_of(&mut rx3, "room:revoked").await;
        assert_eq!(revoked["roomId"], "3-7");
        // The requester was forcibly removed: the peer sees the shrunk roster
        let presence = next_of(&mut rx7, "presence:update").await;
        assert_eq!(presence["users"], json!([7]));

        // Not resurrected on retry
        env.dispatch(
            &c3,
            json!({"type": "message:send", "roomId": "3-7", "content": "again", "messageType": "text"}),
        )
        .await;
        next_of(&mut rx3, "room:revoked").await;
        assert!(env.store.get(MessageId(1)).await.unwrap().is_none());
        assert_no_frame_of(&mut rx7, "message:new").await;
    }

    #[tokio::test]
    async fn test_join_by_non_participant_is_ignored() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c9, mut rx9) = env.connect(9).await;

        env.dispatch(&c9, json!({"type": "join", "roomId": "3-7"})).await;

        assert_no_frame_of(&mut rx9, "presence:update").await;
        assert!(!c9.is_closed());
    }

    #[tokio::test]
    async fn test_typing_relays_acting_user() {
        let env = env();
        env.friendships.befriend(UserId(3), UserId(7)).await;
        let (c3, _rx3) = env.connect(3).await;
        let (c7, mut rx7) = env.connect(7).await;
        env.dispatch(&c3, json!({"type": "join", "roomId": "3-7"})).await;
        env.dispatch(&c7, json!({"type": "join", "roomId": "3-7"})).await;

        env.dispatch(&c3, json!({"type": "typing:start", "roomId": "3-7"})).await;
        let start = next_of(&mut rx7, "typing:start").await;
        assert_eq!(start["userId"], 3);

        env.dispatch(&c3, json!({"type": "typing:stop", "roomId": "3-7"})).await;
        let stop = next_of(&mut rx7, "typing:stop").await;
        assert_eq!(stop["userId"], 3);
    }

    #[tokio::test]
    async fn test_ping_replies_pong_to_sender_only() {
        let env = env();
        let (c3, mut rx3) = env.connect(3).await;
        let (_c7, mut rx7) = env.connect(7).await;

        env.dispatch(&c3, json!({"type": "ping"})).await;

        next_of(&mut rx3, "pong").await;
        assert_no_frame_of(&mut rx7, "pong").await;
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped_harmlessly() {
        let env = env();
        let (c3, mut rx3) = env.connect(3).await;

        env.dispatcher.dispatch(&c3, "not json at all").await;
        env.dispatch(&c3, json!({"type": "shout", "roomId": "3-7"})).await;
        env.dispatch(&c3, json!({"type": "message:edit", "roomId": "3-7"})).await;

        assert!(!c3.is_closed());
        // Connection still serves events normally
        env.dispatch(&c3, json!({"type": "ping"})).await;
        next_of(&mut rx3, "pong").await;
    }
}
