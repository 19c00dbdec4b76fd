//! WebSocket connection admission
//!
//! Upgrades an incoming TCP stream, extracts the authenticated user id
//! during the handshake and wires up a `Client` with its two loops.
//! Credential verification itself is an upstream concern; the bundled
//! admission hook trusts a `user_id` query parameter, which is where a
//! session-token check would slot in.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::Config;
use crate::error::AppError;
use crate::event::Dispatcher;
use crate::hub::HubHandle;
use crate::registry::Registry;
use crate::types::UserId;

/// Shared state cloned into every connection task
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub registry: Arc<Registry>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
}

/// Admit, upgrade and start one connection
///
/// Rejects the handshake with 401 when no user id can be derived from
/// the upgrade request.
pub async fn handle_connection(stream: TcpStream, state: AppState) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    debug!("new TCP connection from {peer_addr}");

    let mut admitted: Option<UserId> = None;
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        match admit(req) {
            Some(user_id) => {
                admitted = Some(user_id);
                Ok(resp)
            }
            None => {
                let mut reject = ErrorResponse::new(Some("unauthorized".to_string()));
                *reject.status_mut() = StatusCode::UNAUTHORIZED;
                Err(reject)
            }
        }
    })
    .await?;

    // The callback ran to completion, so admission succeeded
    let Some(user_id) = admitted else {
        return Ok(());
    };

    let (client, outbound_rx) = Client::new(
        user_id,
        state.hub.clone(),
        state.registry.clone(),
        state.config.outbound_queue_capacity,
    );
    info!(
        "client {} connected: user {} from {}",
        client.conn_id, user_id, peer_addr
    );

    state.registry.register(client.clone()).await;
    client.start(ws_stream, outbound_rx, state.dispatcher.clone(), &state.config);
    Ok(())
}

/// Extract the authenticated user id from the upgrade request
fn admit(req: &Request) -> Option<UserId> {
    let query = req.uri().query()?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "user_id" {
            value.parse().ok().map(UserId)
        } else {
            None
        }
    })
}
