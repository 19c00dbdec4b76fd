//! Registry: user → active connections index
//!
//! Decoupled from room logic: its only consumer is administrative forced
//! disconnect, which must find every connection of a user regardless of
//! which rooms they joined. Unlike the room table, this index is touched
//! from arbitrary tasks, so it is guarded by a lock rather than funneled
//! through the hub actor.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::client::Client;
use crate::message::ServerEvent;
use crate::types::{ConnId, UserId};

/// Process-wide index of live connections per user
#[derive(Default)]
pub struct Registry {
    clients: Mutex<HashMap<UserId, HashMap<ConnId, Arc<Client>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to its owner's set
    pub async fn register(&self, client: Arc<Client>) {
        self.clients
            .lock()
            .await
            .entry(client.user_id)
            .or_default()
            .insert(client.conn_id, client);
    }

    /// Remove a connection; empty per-user sets are dropped
    pub async fn unregister(&self, client: &Client) {
        let mut clients = self.clients.lock().await;
        if let Some(set) = clients.get_mut(&client.user_id) {
            set.remove(&client.conn_id);
            if set.is_empty() {
                clients.remove(&client.user_id);
            }
        }
    }

    /// Number of live connections for a user
    pub async fn connection_count(&self, user_id: UserId) -> usize {
        self.clients
            .lock()
            .await
            .get(&user_id)
            .map_or(0, |set| set.len())
    }

    /// Forcibly disconnect every connection of a user
    ///
    /// Snapshots the set under the lock, then notifies and closes each
    /// connection best-effort; slow sockets never block the caller.
    pub async fn disconnect_user(&self, user_id: UserId, reason: &str) {
        let targets: Vec<Arc<Client>> = {
            let clients = self.clients.lock().await;
            match clients.get(&user_id) {
                Some(set) => set.values().cloned().collect(),
                None => return,
            }
        };

        info!(
            "disconnecting user {} ({} connections): {}",
            user_id,
            targets.len(),
            reason
        );

        let event = ServerEvent::AccountSuspended {
            reason: (!reason.is_empty()).then(|| reason.to_string()),
        };
        for client in targets {
            client.send_event(&event);
            tokio::spawn(async move { client.close().await });
        }
    }
}
