//! Client: one live WebSocket connection
//!
//! Each client exclusively owns its transport and a bounded outbound frame
//! queue, and runs two independent tasks: a read loop feeding the dispatcher
//! and a write loop draining the queue. Teardown is idempotent; it may be
//! raced from a read error, a write error, queue overflow or an
//! administrative disconnect, and executes its effects exactly once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::event::Dispatcher;
use crate::hub::HubHandle;
use crate::ids::RoomId;
use crate::message::ServerEvent;
use crate::registry::Registry;
use crate::types::{ConnId, UserId};

/// A connected client
pub struct Client {
    /// Unique id of this connection (a user may hold several)
    pub conn_id: ConnId,
    /// Authenticated owner of this connection
    pub user_id: UserId,
    outbound: mpsc::Sender<String>,
    rooms: Mutex<HashSet<RoomId>>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    hub: HubHandle,
    registry: Arc<Registry>,
}

impl Client {
    /// Create a client and its outbound queue receiver
    ///
    /// The receiver is handed back separately so tests can drive the queue
    /// without a socket; [`Client::start`] consumes it for the write loop.
    pub fn new(
        user_id: UserId,
        hub: HubHandle,
        registry: Arc<Registry>,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (outbound, outbound_rx) = mpsc::channel(queue_capacity);
        let (shutdown, _) = watch::channel(false);
        let client = Arc::new(Self {
            conn_id: ConnId::new(),
            user_id,
            outbound,
            rooms: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            shutdown,
            hub,
            registry,
        });
        (client, outbound_rx)
    }

    /// Whether teardown has begun
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Non-blocking push onto the outbound queue
    ///
    /// A full queue means this consumer cannot keep up; the frame is
    /// abandoned and teardown is scheduled so the broadcaster never blocks.
    pub fn enqueue(self: &Arc<Self>, frame: String) {
        match self.outbound.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("client {} outbound queue full, disconnecting", self.conn_id);
                let client = self.clone();
                tokio::spawn(async move { client.close().await });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("client {} outbound queue closed, frame dropped", self.conn_id);
            }
        }
    }

    /// Serialize an event and enqueue it for this connection only
    pub fn send_event(self: &Arc<Self>, event: &ServerEvent) {
        match event.to_json() {
            Ok(json) => self.enqueue(json),
            Err(e) => error!("failed to serialize event: {e}"),
        }
    }

    /// Record room membership and ask the hub to add this connection
    ///
    /// No-op if this connection already joined the room.
    pub async fn join_room(self: &Arc<Self>, room_id: RoomId) {
        let added = self.rooms.lock().await.insert(room_id.clone());
        if added {
            self.hub.join(room_id, self.clone()).await;
        }
    }

    /// Drop room membership and ask the hub to remove this connection
    pub async fn leave_room(self: &Arc<Self>, room_id: &RoomId) {
        self.rooms.lock().await.remove(room_id);
        self.hub.leave(room_id.clone(), self.conn_id).await;
    }

    /// Idempotent teardown
    ///
    /// Exactly once: leave every joined room, unregister, then signal the
    /// write loop to close the transport. Concurrent callers race on the
    /// atomic swap; losers return immediately.
    pub async fn close(self: &Arc<Self>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("client {} (user {}) closing", self.conn_id, self.user_id);

        let rooms: Vec<RoomId> = self.rooms.lock().await.drain().collect();
        for room_id in rooms {
            self.hub.leave(room_id, self.conn_id).await;
        }
        self.registry.unregister(self).await;
        let _ = self.shutdown.send(true);
    }

    /// Start the read and write loops; returns immediately
    pub fn start(
        self: &Arc<Self>,
        ws_stream: WebSocketStream<TcpStream>,
        outbound_rx: mpsc::Receiver<String>,
        dispatcher: Arc<Dispatcher>,
        config: &Config,
    ) {
        // Subscribe before checking the flag so a concurrent close is
        // either observed here or caught by the watch in the write loop.
        let shutdown_rx = self.shutdown.subscribe();
        if self.is_closed() {
            return;
        }

        let (ws_sender, ws_receiver) = ws_stream.split();
        self.spawn_read_loop(ws_receiver, dispatcher, config.idle_timeout);
        self.spawn_write_loop(
            ws_sender,
            outbound_rx,
            shutdown_rx,
            config.write_timeout,
            config.ping_interval,
        );
    }

    fn spawn_read_loop(
        self: &Arc<Self>,
        mut ws_receiver: futures_util::stream::SplitStream<WebSocketStream<TcpStream>>,
        dispatcher: Arc<Dispatcher>,
        idle_timeout: std::time::Duration,
    ) {
        let client = self.clone();
        tokio::spawn(async move {
            loop {
                let frame = match timeout(idle_timeout, ws_receiver.next()).await {
                    Err(_) => {
                        debug!("client {} idle timeout", client.conn_id);
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        debug!("client {} read error: {e}", client.conn_id);
                        break;
                    }
                    Ok(Some(Ok(frame))) => frame,
                };
                match frame {
                    Message::Text(text) => dispatcher.dispatch(&client, &text).await,
                    Message::Close(_) => {
                        debug!("client {} sent close frame", client.conn_id);
                        break;
                    }
                    // Transport pings are answered by tungstenite; pongs
                    // just reset the idle deadline by arriving at all.
                    Message::Ping(_) | Message::Pong(_) => {}
                    _ => {}
                }
            }
            client.close().await;
        });
    }

    fn spawn_write_loop(
        self: &Arc<Self>,
        mut ws_sender: futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>,
        mut outbound_rx: mpsc::Receiver<String>,
        mut shutdown_rx: watch::Receiver<bool>,
        write_timeout: std::time::Duration,
        ping_interval: std::time::Duration,
    ) {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ping = tokio::time::interval(ping_interval);
            ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Swallow the immediate first tick
            ping.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        let _ = timeout(write_timeout, ws_sender.send(Message::Close(None))).await;
                        break;
                    }
                    maybe = outbound_rx.recv() => {
                        let Some(frame) = maybe else { break };
                        match timeout(write_timeout, ws_sender.send(Message::Text(frame.into()))).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                debug!("client {} write error: {e}", client.conn_id);
                                break;
                            }
                            Err(_) => {
                                warn!("client {} write deadline exceeded", client.conn_id);
                                break;
                            }
                        }
                    }
                    _ = ping.tick() => {
                        if timeout(write_timeout, ws_sender.send(Message::Ping(Vec::new().into())))
                            .await
                            .map_or(true, |r| r.is_err())
                        {
                            debug!("client {} transport ping failed", client.conn_id);
                            break;
                        }
                    }
                }
            }
            let _ = ws_sender.close().await;
            client.close().await;
        });
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("conn_id", &self.conn_id)
            .field("user_id", &self.user_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
