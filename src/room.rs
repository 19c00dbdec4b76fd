//! Room: the live member set of one conversation
//!
//! A room holds connections, not users: a user with two devices occupies
//! two slots. Broadcast is fire-and-forget per member; a member whose
//! outbound queue is saturated is disconnected by its own `enqueue` without
//! ever blocking delivery to the others. Rooms are owned exclusively by the
//! hub actor, so none of this needs locking.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::client::Client;
use crate::ids::RoomId;
use crate::types::{ConnId, UserId};

/// Live member set of a two-party conversation
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    clients: HashMap<ConnId, Arc<Client>>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            clients: HashMap::new(),
        }
    }

    /// Add a connection; returns whether membership actually changed
    pub fn add(&mut self, client: Arc<Client>) -> bool {
        self.clients.insert(client.conn_id, client).is_none()
    }

    /// Remove a connection; returns whether membership actually changed
    pub fn remove(&mut self, conn_id: ConnId) -> bool {
        self.clients.remove(&conn_id).is_some()
    }

    /// Deliver the same frame to every current member
    pub fn broadcast(&self, frame: &str) {
        for client in self.clients.values() {
            client.enqueue(frame.to_string());
        }
    }

    /// Deduplicated, ascending list of distinct user ids present
    pub fn user_ids(&self) -> Vec<UserId> {
        let seen: BTreeSet<UserId> = self.clients.values().map(|c| c.user_id).collect();
        seen.into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.clients.len()
    }
}
