//! Connection handle and registry
//!
//! A `Connection` is the hub's only view of a transport: an id plus the
//! sending half of that connection's bounded outbound queue.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ChatMessage;
use crate::types::ConnectionId;

/// Live connection handle
///
/// Dropping the last handle closes the outbound queue, which ends the
/// connection's writer task.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Hub → Client message queue
    sender: mpsc::Sender<ChatMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ChatMessage>) -> Self {
        Self { id, sender }
    }

    /// Queue a message without waiting
    ///
    /// Fails if the writer is gone or its queue is full; a full queue means
    /// the consumer is too slow and must not hold up anyone else.
    pub fn try_deliver(&self, msg: ChatMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

/// Registry of live connections by id
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any stale handle with the same id
    pub fn register(&mut self, connection: Connection) -> ConnectionId {
        let id = connection.id;
        self.connections.insert(id, connection);
        id
    }

    /// Remove a connection; returns the handle if it was registered
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn lookup(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop every handle, closing all outbound queues
    pub fn clear(&mut self) {
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_lookup_unregister() {
        let (tx, _rx) = mpsc::channel(4);
        let mut registry = ConnectionRegistry::new();
        let id = registry.register(Connection::new(ConnectionId::new(), tx));

        assert!(registry.lookup(id).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(id).is_some());
        assert!(registry.lookup(id).is_none());
        assert!(registry.unregister(id).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_try_deliver_queue_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let conn = Connection::new(ConnectionId::new(), tx);

        assert!(conn.try_deliver(ChatMessage::welcome()).is_ok());
        assert_eq!(
            conn.try_deliver(ChatMessage::welcome()),
            Err(SendError::QueueFull)
        );

        // Draining frees a slot again
        assert!(rx.recv().await.is_some());
        assert!(conn.try_deliver(ChatMessage::welcome()).is_ok());
    }

    #[tokio::test]
    async fn test_try_deliver_closed() {
        let (tx, rx) = mpsc::channel(4);
        let conn = Connection::new(ConnectionId::new(), tx);
        drop(rx);

        assert_eq!(
            conn.try_deliver(ChatMessage::welcome()),
            Err(SendError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_unregister_closes_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut registry = ConnectionRegistry::new();
        let id = registry.register(Connection::new(ConnectionId::new(), tx));

        registry.unregister(id);
        assert!(rx.recv().await.is_none());
    }
}
