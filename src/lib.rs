//! Real-time 1:1 chat messaging hub
//!
//! The WebSocket core of a direct-message backend: persistent connections
//! organized into two-party conversation rooms, with all membership and
//! broadcast state serialized through a single coordinating actor.
//!
//! # Features
//! - Canonical, order-independent room ids derived from user-id pairs
//! - Join / send / edit / delete / typing / ping protocol state machine
//! - Per-event authorization re-checks with live revocation (un-friend)
//! - Presence rosters recomputed atomically with membership changes
//! - Bounded outbound queues; slow consumers are disconnected, never waited on
//! - Administrative forced disconnect via a user → connections registry
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - The `Hub` actor exclusively owns the room table; join/leave/broadcast
//!   requests pass through its serialized queue, so room state needs no locks
//! - Each connection runs two tasks (read loop, write loop) and a bounded
//!   outbound queue between the hub and the socket
//! - Durable state lives behind collaborator traits (message store,
//!   friendship check, attachment storage)
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use pairchat::{AppState, Config, Dispatcher, Hub, Registry};
//! use pairchat::store::{MemoryFriendships, MemoryStore, NullAttachmentStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(Config::default());
//!     let (hub, actor) = Hub::new(config.hub_queue_capacity);
//!     tokio::spawn(actor.run());
//!
//!     let dispatcher = Arc::new(Dispatcher::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(MemoryFriendships::allow_all()),
//!         Arc::new(NullAttachmentStore::new()),
//!         hub.clone(),
//!         config.max_message_chars,
//!     ));
//!     let state = AppState {
//!         hub,
//!         registry: Arc::new(Registry::new()),
//!         dispatcher,
//!         config: config.clone(),
//!     };
//!
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(pairchat::handle_connection(stream, state.clone()));
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod event;
pub mod handler;
pub mod hub;
pub mod ids;
pub mod message;
pub mod registry;
pub mod room;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::Config;
pub use dto::MessageDto;
pub use error::AppError;
pub use event::Dispatcher;
pub use handler::{handle_connection, AppState};
pub use hub::{Hub, HubCommand, HubHandle};
pub use ids::RoomId;
pub use message::{ClientEvent, ServerEvent};
pub use registry::Registry;
pub use room::Room;
pub use types::{ConnId, MessageId, UserId};
