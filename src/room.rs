//! Room struct definition
//!
//! Represents a named chat room and its current members.

use std::collections::HashSet;

use crate::types::{ConnectionId, RoomName};

/// Chat room
///
/// Holds the set of member connection ids. The directory deletes a room
/// as soon as its last member leaves.
#[derive(Debug)]
pub struct Room {
    /// Room name for identification
    pub name: RoomName,
    /// Current members
    members: HashSet<ConnectionId>,
}

impl Room {
    /// Create a new empty room
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: HashSet::new(),
        }
    }

    /// Add a member; returns false if already present
    pub fn add_member(&mut self, id: ConnectionId) -> bool {
        self.members.insert(id)
    }

    /// Remove a member
    ///
    /// Returns true if the room should be deleted (no members left).
    pub fn remove_member(&mut self, id: ConnectionId) -> bool {
        self.members.remove(&id);
        self.members.is_empty()
    }

    /// Copy of the current member set, used as a broadcast snapshot
    pub fn members(&self) -> Vec<ConnectionId> {
        self.members.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> Room {
        Room::new(RoomName::parse(name).unwrap())
    }

    #[test]
    fn test_room_creation() {
        let room = room("general");
        assert_eq!(room.name.as_str(), "general");
        assert!(room.members().is_empty());
    }

    #[test]
    fn test_room_add_member_once() {
        let mut room = room("general");
        let id = ConnectionId::new();

        assert!(room.add_member(id));
        assert!(!room.add_member(id));
        assert_eq!(room.members(), vec![id]);
    }

    #[test]
    fn test_room_last_member_leaves() {
        let mut room = room("general");
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        room.add_member(a);
        room.add_member(b);

        assert!(!room.remove_member(a));
        assert_eq!(room.members(), vec![b]);
        assert!(room.remove_member(b));
    }
}
