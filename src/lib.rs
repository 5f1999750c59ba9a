//! Multi-room WebSocket Chat Hub Library
//!
//! A real-time messaging hub built with tokio-tungstenite using the Actor
//! pattern for state management.
//!
//! # Features
//! - WebSocket connection handling with a welcome frame on open
//! - Named rooms created on first JOIN and deleted when empty
//! - JOIN / LEAVE / CHAT protocol over JSON text frames
//! - Room switching with an automatic LEAVE of the previous room
//! - Fan-out that never waits on a slow member
//! - Forced leave on disconnect
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatHub` is the central actor owning connections, rooms and sessions
//! - Each connection has a `handler` task pair talking to the hub through `HubHandle`
//! - Every hub command is applied atomically; no locks are needed
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use room_hub::{handle_connection, HubHandle};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let hub = HubHandle::spawn(256);
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, hub.clone(), 32));
//!     }
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod handler;
pub mod id_generator;
pub mod message;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{broadcast, BroadcastReport};
pub use config::Config;
pub use connection::{Connection, ConnectionRegistry};
pub use directory::{Broadcast, RoomDirectory, MAX_CONTENT_CHARS};
pub use error::{AppError, HubError, SendError};
pub use handler::handle_connection;
pub use id_generator::IdGenerator;
pub use message::{ChatMessage, ClientMessage, InboundFrame, MessageType};
pub use room::Room;
pub use server::{ChatHub, DisconnectReason, HubCommand, HubHandle, HubSnapshot};
pub use session::Session;
pub use types::{ConnectionId, RoomName};
