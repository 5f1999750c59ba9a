//! Room fan-out
//!
//! Delivery takes a snapshot of the room's members and queues the message
//! on each member's outbound channel with `try_send`, so a slow or dead
//! member never holds up the rest. Failed members are evicted: their
//! registry entry is dropped (closing their socket writer) and their
//! membership and session are removed without a LEAVE announcement.

use tracing::{debug, warn};

use crate::connection::ConnectionRegistry;
use crate::directory::{Broadcast, RoomDirectory};
use crate::error::SendError;
use crate::types::ConnectionId;

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members whose queue accepted the message
    pub delivered: usize,
    /// Members that failed and were evicted
    pub evicted: Vec<(ConnectionId, SendError)>,
}

/// Deliver `broadcast` to every current member of its room
pub fn broadcast(
    registry: &mut ConnectionRegistry,
    directory: &mut RoomDirectory,
    broadcast: &Broadcast,
) -> BroadcastReport {
    let members = directory.members(&broadcast.room);
    let mut report = BroadcastReport::default();

    for member in members {
        let result = match registry.lookup(member) {
            Some(conn) => conn.try_deliver(broadcast.message.clone()),
            None => Err(SendError::ChannelClosed),
        };
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => report.evicted.push((member, e)),
        }
    }

    for (member, reason) in &report.evicted {
        warn!("Evicting {} from room {}: {}", member, broadcast.room, reason);
        registry.unregister(*member);
        directory.evict(*member);
    }

    debug!(
        "Broadcast {:?} {} to room {}: {} delivered, {} evicted",
        broadcast.message.kind,
        broadcast.message.id,
        broadcast.room,
        report.delivered,
        report.evicted.len()
    );

    report
}
