//! ChatHub Actor implementation
//!
//! The central actor that owns all shared state: the connection registry,
//! the room directory with its sessions, and the message id generator.
//! Every command runs to completion before the next one starts, so each
//! join, leave and chat is atomic with respect to all other operations.
//!
//! Per-connection protocol states:
//!
//! ```text
//! Disconnected --open--> Connected --JOIN--> InRoom(room, username)
//!                            ^                  |  ^
//!                            +------LEAVE-------+  +--CHAT / JOIN(other room)
//! any --close/error--> Disconnected (LEAVE broadcast if it was InRoom)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::connection::{Connection, ConnectionRegistry};
use crate::directory::{Broadcast, RoomDirectory};
use crate::error::{AppError, HubError};
use crate::id_generator::IdGenerator;
use crate::message::{ChatMessage, ClientMessage, InboundFrame};
use crate::types::ConnectionId;

/// Why a connection went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Orderly close by either side
    Closed,
    /// Transport failure
    Error(String),
}

/// Read-only view of hub state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    /// Registered connections
    pub connections: usize,
    /// Room name -> sorted member ids
    pub rooms: BTreeMap<String, Vec<ConnectionId>>,
    /// Last issued message id (0 if none)
    pub last_message_id: u64,
    /// Connections dropped because delivery to them failed
    pub evicted_total: u64,
}

/// Commands sent from connection handlers to the ChatHub actor
#[derive(Debug)]
pub enum HubCommand {
    /// New connection opened
    Open {
        conn_id: ConnectionId,
        sender: mpsc::Sender<ChatMessage>,
    },
    /// Raw inbound frame
    Frame {
        conn_id: ConnectionId,
        frame: InboundFrame,
    },
    /// Connection closed or failed
    Disconnect {
        conn_id: ConnectionId,
        reason: DisconnectReason,
    },
    /// Report current state
    Snapshot { reply: oneshot::Sender<HubSnapshot> },
    /// Close every connection, clear all state and stop
    Shutdown { reply: oneshot::Sender<()> },
}

/// The main ChatHub actor
pub struct ChatHub {
    /// All live connections: ConnectionId -> Connection
    registry: ConnectionRegistry,
    /// Rooms and sessions
    directory: RoomDirectory,
    /// Hub-wide message id source
    ids: Arc<IdGenerator>,
    /// Delivery failures that dropped a connection
    evicted_total: u64,
    /// Command receiver channel
    receiver: mpsc::Receiver<HubCommand>,
}

impl ChatHub {
    /// Create a new ChatHub with the given command receiver
    pub fn new(receiver: mpsc::Receiver<HubCommand>) -> Self {
        let ids = Arc::new(IdGenerator::new());
        Self {
            registry: ConnectionRegistry::new(),
            directory: RoomDirectory::new(Arc::clone(&ids)),
            ids,
            evicted_total: 0,
            receiver,
        }
    }

    /// Run the ChatHub event loop
    ///
    /// Processes commands until a shutdown is requested or all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatHub started");

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle_command(cmd) {
                break;
            }
        }

        self.clear();
        info!("ChatHub shutting down");
    }

    /// Process a single command; returns false once the hub should stop
    fn handle_command(&mut self, cmd: HubCommand) -> bool {
        match cmd {
            HubCommand::Open { conn_id, sender } => {
                self.handle_open(conn_id, sender);
            }
            HubCommand::Frame { conn_id, frame } => {
                self.handle_frame(conn_id, &frame);
            }
            HubCommand::Disconnect { conn_id, reason } => {
                self.handle_disconnect(conn_id, reason);
            }
            HubCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            HubCommand::Shutdown { reply } => {
                self.clear();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    /// Register the connection and greet it
    fn handle_open(&mut self, conn_id: ConnectionId, sender: mpsc::Sender<ChatMessage>) {
        info!("Connection {} opened", conn_id);
        self.registry.register(Connection::new(conn_id, sender));
        self.send_direct(conn_id, ChatMessage::welcome());
        debug!(
            "Total connections: {}, Total rooms: {}",
            self.registry.len(),
            self.directory.room_count()
        );
    }

    /// Decode a frame and drive the state machine
    fn handle_frame(&mut self, conn_id: ConnectionId, frame: &InboundFrame) {
        if !self.registry.contains(conn_id) {
            debug!("Dropping frame from unknown connection {}", conn_id);
            return;
        }
        debug!("Frame from {}: {:?}", conn_id, frame);

        let result = ClientMessage::decode(frame).and_then(|msg| self.apply(conn_id, msg));
        match result {
            Ok(broadcasts) => {
                for b in &broadcasts {
                    self.fan_out(b);
                }
            }
            Err(err) => {
                warn!("Rejected frame from {}: {}", conn_id, err);
                self.send_direct(conn_id, err.into());
            }
        }
    }

    /// Apply a decoded message, returning what to broadcast in order
    fn apply(
        &mut self,
        conn_id: ConnectionId,
        msg: ClientMessage,
    ) -> Result<Vec<Broadcast>, HubError> {
        match msg {
            ClientMessage::Join { username, room } => {
                let out = self.directory.join(
                    conn_id,
                    username.as_deref().unwrap_or_default(),
                    room.as_deref().unwrap_or_default(),
                )?;
                if let Some(session) = self.directory.session(conn_id) {
                    info!(
                        "Connection {} joined room {} as '{}'",
                        conn_id, session.room, session.username
                    );
                }
                Ok(out)
            }
            ClientMessage::Leave => {
                let out = self.directory.leave(conn_id)?;
                info!("Connection {} left room {}", conn_id, out.room);
                Ok(vec![out])
            }
            ClientMessage::Chat { content } => {
                let out = self
                    .directory
                    .chat(conn_id, content.as_deref().unwrap_or_default())?;
                Ok(vec![out])
            }
        }
    }

    /// Forced leave on close or error; runs once per connection
    fn handle_disconnect(&mut self, conn_id: ConnectionId, reason: DisconnectReason) {
        let was_registered = self.registry.unregister(conn_id).is_some();
        let left = self.directory.force_leave(conn_id);

        if !was_registered && left.is_none() {
            debug!("Disconnect for {} already handled", conn_id);
            return;
        }

        match &reason {
            DisconnectReason::Closed => info!("Connection {} closed", conn_id),
            DisconnectReason::Error(e) => warn!("Connection {} failed: {}", conn_id, e),
        }

        if let Some(b) = left {
            info!("Connection {} removed from room {}", conn_id, b.room);
            self.fan_out(&b);
        }

        debug!(
            "Total connections: {}, Total rooms: {}",
            self.registry.len(),
            self.directory.room_count()
        );
    }

    /// Broadcast to a room and account for evicted members
    fn fan_out(&mut self, b: &Broadcast) {
        let report = broadcast(&mut self.registry, &mut self.directory, b);
        self.evicted_total += report.evicted.len() as u64;
    }

    /// Send a frame to one connection only
    fn send_direct(&mut self, conn_id: ConnectionId, msg: ChatMessage) {
        let Some(conn) = self.registry.lookup(conn_id) else {
            return;
        };
        if let Err(e) = conn.try_deliver(msg) {
            warn!("Dropping connection {}: {}", conn_id, e);
            self.registry.unregister(conn_id);
            self.directory.evict(conn_id);
            self.evicted_total += 1;
        }
    }

    fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            connections: self.registry.len(),
            rooms: self.directory.rooms_view(),
            last_message_id: self.ids.last_issued(),
            evicted_total: self.evicted_total,
        }
    }

    /// Drop every connection and all room state
    fn clear(&mut self) {
        if !self.registry.is_empty() {
            info!("Closing {} connections", self.registry.len());
        }
        self.registry.clear();
        self.directory.clear();
    }
}

/// Cloneable handle to a running ChatHub
///
/// This is the connection-event interface the transport drives.
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub fn new(sender: mpsc::Sender<HubCommand>) -> Self {
        Self { sender }
    }

    /// Create a hub, spawn its actor task and return a handle to it
    pub fn spawn(buffer: usize) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
        tokio::spawn(ChatHub::new(cmd_rx).run());
        Self::new(cmd_tx)
    }

    /// Transport opened; the hub greets the connection through `sender`
    pub async fn on_open(
        &self,
        conn_id: ConnectionId,
        sender: mpsc::Sender<ChatMessage>,
    ) -> Result<(), AppError> {
        self.send(HubCommand::Open { conn_id, sender }).await
    }

    /// Inbound frame; text is decoded as JSON, binary is always rejected
    pub async fn on_message(
        &self,
        conn_id: ConnectionId,
        frame: impl Into<InboundFrame>,
    ) -> Result<(), AppError> {
        self.send(HubCommand::Frame {
            conn_id,
            frame: frame.into(),
        })
        .await
    }

    pub async fn on_close(&self, conn_id: ConnectionId) -> Result<(), AppError> {
        self.send(HubCommand::Disconnect {
            conn_id,
            reason: DisconnectReason::Closed,
        })
        .await
    }

    pub async fn on_error(&self, conn_id: ConnectionId, error: String) -> Result<(), AppError> {
        self.send(HubCommand::Disconnect {
            conn_id,
            reason: DisconnectReason::Error(error),
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<HubSnapshot, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    /// Close every connection, clear all registries and stop the actor
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), AppError> {
        self.sender.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }
}
