//! Messaging hub - entry point
//!
//! Starts the TCP listener and the hub actor, accepting connections.
//! The binary wires in the in-memory collaborators; a production
//! deployment substitutes database-backed implementations.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pairchat::store::{MemoryFriendships, MemoryStore, NullAttachmentStore};
use pairchat::{handle_connection, AppState, Config, Dispatcher, Hub, Registry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=pairchat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pairchat=info")),
        )
        .init();

    let config = Arc::new(Config::from_env());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("messaging hub listening on {}", config.bind_addr);

    // Start the hub actor
    let (hub, actor) = Hub::new(config.hub_queue_capacity);
    tokio::spawn(actor.run());

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryFriendships::allow_all()),
        Arc::new(NullAttachmentStore::new()),
        hub.clone(),
        config.max_message_chars,
    ));
    let state = AppState {
        hub,
        registry: Arc::new(Registry::new()),
        dispatcher,
        config: config.clone(),
    };

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("new connection from {addr}");
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        error!("connection handler error: {e}");
                    }
                });
            }
            Err(e) => {
                error!("failed to accept connection: {e}");
            }
        }
    }
}
