//! Per-connection session binding

use crate::types::RoomName;

/// Binding of one connection to a username and the room it is in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub room: RoomName,
}

impl Session {
    pub fn new(username: String, room: RoomName) -> Self {
        Self { username, room }
    }
}
