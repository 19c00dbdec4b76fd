//! Hub actor: the single owner of the room table
//!
//! All join/leave/broadcast traffic funnels through one mpsc queue into one
//! long-lived task, so room membership never needs a lock: mutual exclusion
//! is structural. Requests from the same connection are applied in
//! submission order, and presence is recomputed in the same command that
//! changed membership, so no observer sees a stale roster.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::client::Client;
use crate::ids::RoomId;
use crate::message::ServerEvent;
use crate::room::Room;
use crate::types::ConnId;

/// Requests processed by the hub actor
#[derive(Debug)]
pub enum HubCommand {
    /// Add a connection to a room (created lazily)
    Join { room_id: RoomId, client: Arc<Client> },
    /// Remove a connection from a room (room dropped when empty)
    Leave { room_id: RoomId, conn_id: ConnId },
    /// Fan a frame out to every member of a room (no-op if absent)
    Broadcast { room_id: RoomId, frame: String },
}

/// Cloneable handle for submitting hub requests
///
/// All operations are fire-and-forget: they enqueue the request and return.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn join(&self, room_id: RoomId, client: Arc<Client>) {
        let _ = self.tx.send(HubCommand::Join { room_id, client }).await;
    }

    pub async fn leave(&self, room_id: RoomId, conn_id: ConnId) {
        let _ = self.tx.send(HubCommand::Leave { room_id, conn_id }).await;
    }

    pub async fn broadcast(&self, room_id: RoomId, frame: String) {
        let _ = self.tx.send(HubCommand::Broadcast { room_id, frame }).await;
    }

    /// Serialize an event and broadcast it to a room
    pub async fn emit(&self, room_id: RoomId, event: &ServerEvent) {
        match event.to_json() {
            Ok(frame) => self.broadcast(room_id, frame).await,
            Err(e) => error!("failed to serialize broadcast event: {e}"),
        }
    }
}

/// The hub actor state: exclusively-owned room table plus request queue
pub struct Hub {
    rooms: HashMap<RoomId, Room>,
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Create the actor and its handle
    pub fn new(queue_capacity: usize) -> (HubHandle, Self) {
        let (tx, receiver) = mpsc::channel(queue_capacity);
        (
            HubHandle { tx },
            Self {
                rooms: HashMap::new(),
                receiver,
            },
        )
    }

    /// Run the hub event loop
    ///
    /// Processes one request at a time until all handles are dropped.
    pub async fn run(mut self) {
        info!("hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Join { room_id, client } => self.handle_join(room_id, client),
                HubCommand::Leave { room_id, conn_id } => self.handle_leave(room_id, conn_id),
                HubCommand::Broadcast { room_id, frame } => {
                    if let Some(room) = self.rooms.get(&room_id) {
                        room.broadcast(&frame);
                    }
                }
            }
        }

        info!("hub shutting down");
    }

    fn handle_join(&mut self, room_id: RoomId, client: Arc<Client>) {
        let room = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id));
        if room.add(client) {
            Self::emit_presence(room);
        }
    }

    fn handle_leave(&mut self, room_id: RoomId, conn_id: ConnId) {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        if room.remove(conn_id) {
            Self::emit_presence(room);
        }
        if room.is_empty() {
            self.rooms.remove(&room_id);
            debug!("room {} deleted (empty)", room_id);
        }
    }

    /// Broadcast the updated roster, atomically with the membership change
    fn emit_presence(room: &Room) {
        let event = ServerEvent::PresenceUpdate {
            room_id: room.id.clone(),
            users: room.user_ids(),
        };
        match event.to_json() {
            Ok(frame) => room.broadcast(&frame),
            Err(e) => error!("failed to serialize presence: {e}"),
        }
    }
}
