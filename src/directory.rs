//! Room directory and session store
//!
//! Rooms and sessions are kept together because every join, leave and
//! chat must observe and update both in one step. The directory is plain
//! synchronous state; the hub actor provides the mutual exclusion.
//!
//! Invariants held after every operation:
//! - a connection is a member of at most one room
//! - a room exists iff it has at least one member
//! - a connection has a session iff it is a member of the session's room

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::error::HubError;
use crate::id_generator::IdGenerator;
use crate::message::ChatMessage;
use crate::room::Room;
use crate::session::Session;
use crate::types::{ConnectionId, RoomName};

/// Maximum CHAT content length in characters, after trimming
pub const MAX_CONTENT_CHARS: usize = 1000;

/// A message to fan out to the current members of a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub room: RoomName,
    pub message: ChatMessage,
}

/// Rooms by name plus sessions by connection
#[derive(Debug)]
pub struct RoomDirectory {
    rooms: HashMap<RoomName, Room>,
    sessions: HashMap<ConnectionId, Session>,
    ids: Arc<IdGenerator>,
}

impl RoomDirectory {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            ids,
        }
    }

    /// Join `room` as `username`
    ///
    /// Both names are only checked for blankness and stored as given.
    ///
    /// Switching rooms leaves the old one first, so the returned list holds
    /// the old room's LEAVE (if any) followed by the new room's JOIN.
    pub fn join(
        &mut self,
        conn_id: ConnectionId,
        username: &str,
        room: &str,
    ) -> Result<Vec<Broadcast>, HubError> {
        let room = RoomName::parse(room)
            .ok_or(HubError::Validation("Room name is required for JOIN"))?;
        if username.trim().is_empty() {
            return Err(HubError::Validation("Username is required for JOIN"));
        }

        let mut broadcasts = Vec::with_capacity(2);

        let switching = self
            .sessions
            .get(&conn_id)
            .is_some_and(|session| session.room != room);
        if switching {
            broadcasts.extend(self.remove_member(conn_id));
        }

        self.rooms
            .entry(room.clone())
            .or_insert_with(|| {
                debug!("Room {} created", room);
                Room::new(room.clone())
            })
            .add_member(conn_id);
        self.sessions
            .insert(conn_id, Session::new(username.to_string(), room.clone()));

        let message = ChatMessage::join(self.ids.next_id(), username, room.as_str());
        broadcasts.push(Broadcast { room, message });
        Ok(broadcasts)
    }

    /// Leave the current room
    pub fn leave(&mut self, conn_id: ConnectionId) -> Result<Broadcast, HubError> {
        self.remove_member(conn_id)
            .ok_or(HubError::NotInRoom("You are not in any room"))
    }

    /// Build a CHAT message for the connection's room
    pub fn chat(&self, conn_id: ConnectionId, content: &str) -> Result<Broadcast, HubError> {
        let session = self
            .sessions
            .get(&conn_id)
            .ok_or(HubError::NotInRoom("Please join a room first"))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(HubError::Validation("Message content cannot be empty"));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(HubError::Validation("Message too large (max 1000 characters)"));
        }

        let message = ChatMessage::chat(
            self.ids.next_id(),
            &session.username,
            content.to_string(),
            session.room.as_str(),
        );
        Ok(Broadcast {
            room: session.room.clone(),
            message,
        })
    }

    /// Leave on connection teardown; a no-op without a session
    pub fn force_leave(&mut self, conn_id: ConnectionId) -> Option<Broadcast> {
        self.remove_member(conn_id)
    }

    /// Drop membership and session without announcing anything
    ///
    /// Used for members whose delivery failed. Returns true if the
    /// connection had a session.
    pub fn evict(&mut self, conn_id: ConnectionId) -> bool {
        let Some(session) = self.sessions.remove(&conn_id) else {
            return false;
        };
        self.detach(conn_id, &session.room);
        true
    }

    /// Snapshot of a room's members; empty if the room does not exist
    pub fn members(&self, room: &RoomName) -> Vec<ConnectionId> {
        self.rooms.get(room).map(Room::members).unwrap_or_default()
    }

    pub fn session(&self, conn_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Sorted view of every room and its members
    pub fn rooms_view(&self) -> BTreeMap<String, Vec<ConnectionId>> {
        self.rooms
            .values()
            .map(|room| {
                let mut members = room.members();
                members.sort();
                (room.name.to_string(), members)
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
        self.sessions.clear();
    }

    /// Remove the session and membership, producing the LEAVE message
    fn remove_member(&mut self, conn_id: ConnectionId) -> Option<Broadcast> {
        let session = self.sessions.remove(&conn_id)?;
        self.detach(conn_id, &session.room);

        let message = ChatMessage::leave(
            self.ids.next_id(),
            &session.username,
            session.room.as_str(),
        );
        Some(Broadcast {
            room: session.room,
            message,
        })
    }

    fn detach(&mut self, conn_id: ConnectionId, room: &RoomName) {
        let should_delete = self
            .rooms
            .get_mut(room)
            .is_some_and(|r| r.remove_member(conn_id));

        if should_delete {
            self.rooms.remove(room);
            debug!("Room {} deleted (empty)", room);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;

    fn directory() -> RoomDirectory {
        RoomDirectory::new(Arc::new(IdGenerator::new()))
    }

    fn room(name: &str) -> RoomName {
        RoomName::parse(name).unwrap()
    }

    /// Check the membership/session invariants for every known connection
    fn assert_consistent(dir: &RoomDirectory, conns: &[ConnectionId]) {
        for &c in conns {
            let rooms_with_c: Vec<_> = dir
                .rooms_view()
                .into_iter()
                .filter(|(_, members)| members.contains(&c))
                .map(|(name, _)| name)
                .collect();
            assert!(rooms_with_c.len() <= 1, "{} in several rooms", c);
            match dir.session(c) {
                Some(s) => assert_eq!(rooms_with_c, vec![s.room.to_string()]),
                None => assert!(rooms_with_c.is_empty()),
            }
        }
        assert!(dir.rooms_view().values().all(|m| !m.is_empty()));
    }

    #[test]
    fn test_join_creates_room_and_session() {
        let mut dir = directory();
        let c = ConnectionId::new();

        let out = dir.join(c, "alice", "general").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].room, room("general"));
        assert_eq!(out[0].message.kind, MessageType::Join);
        assert_eq!(out[0].message.username.as_deref(), Some("alice"));
        assert_eq!(out[0].message.id, "1");

        assert_eq!(dir.room_count(), 1);
        assert_eq!(dir.members(&room("general")), vec![c]);
        assert_eq!(dir.session(c).unwrap().username, "alice");
    }

    #[test]
    fn test_join_validation() {
        let mut dir = directory();
        let c = ConnectionId::new();

        assert_eq!(
            dir.join(c, "alice", "  "),
            Err(HubError::Validation("Room name is required for JOIN"))
        );
        assert_eq!(
            dir.join(c, "", "general"),
            Err(HubError::Validation("Username is required for JOIN"))
        );
        assert_eq!(dir.room_count(), 0);
        assert!(dir.session(c).is_none());
    }

    #[test]
    fn test_join_keeps_names_verbatim() {
        let mut dir = directory();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();

        let out = dir.join(c1, " alice ", " R ").unwrap();
        assert_eq!(out[0].message.content, " alice  joined the room");
        assert_eq!(out[0].message.username.as_deref(), Some(" alice "));
        assert_eq!(out[0].message.room.as_deref(), Some(" R "));

        dir.join(c2, "bob", "R").unwrap();
        assert_eq!(dir.room_count(), 2);
        assert_eq!(dir.members(&room(" R ")), vec![c1]);
        assert_eq!(dir.members(&room("R")), vec![c2]);
    }

    #[test]
    fn test_chat_stamps_session() {
        let mut dir = directory();
        let c = ConnectionId::new();
        dir.join(c, "alice", "general").unwrap();

        let out = dir.chat(c, "  hi ").unwrap();
        assert_eq!(out.room, room("general"));
        assert_eq!(out.message.kind, MessageType::Chat);
        assert_eq!(out.message.username.as_deref(), Some("alice"));
        assert_eq!(out.message.room.as_deref(), Some("general"));
        assert_eq!(out.message.content, "hi");
        assert_eq!(out.message.id, "2");
    }

    #[test]
    fn test_chat_without_session() {
        let dir = directory();
        assert_eq!(
            dir.chat(ConnectionId::new(), "hi"),
            Err(HubError::NotInRoom("Please join a room first"))
        );
    }

    #[test]
    fn test_chat_content_validation() {
        let mut dir = directory();
        let c = ConnectionId::new();
        dir.join(c, "alice", "general").unwrap();

        assert_eq!(
            dir.chat(c, " \n "),
            Err(HubError::Validation("Message content cannot be empty"))
        );
        assert_eq!(
            dir.chat(c, &"a".repeat(1001)),
            Err(HubError::Validation("Message too large (max 1000 characters)"))
        );
        // Multi-byte characters count once each
        assert!(dir.chat(c, &"é".repeat(1000)).is_ok());
        assert!(dir.chat(c, &format!("  {}  ", "a".repeat(1000))).is_ok());
        assert_eq!(dir.members(&room("general")), vec![c]);
    }

    #[test]
    fn test_leave_without_join() {
        let mut dir = directory();
        let c = ConnectionId::new();

        assert_eq!(
            dir.leave(c),
            Err(HubError::NotInRoom("You are not in any room"))
        );
        assert_eq!(dir.room_count(), 0);
    }

    #[test]
    fn test_last_member_deletes_room() {
        let mut dir = directory();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();
        dir.join(c1, "a", "R").unwrap();
        dir.join(c2, "b", "R").unwrap();

        let out = dir.leave(c1).unwrap();
        assert_eq!(out.message.kind, MessageType::Leave);
        assert_eq!(out.message.username.as_deref(), Some("a"));
        assert_eq!(dir.members(&room("R")), vec![c2]);

        dir.leave(c2).unwrap();
        assert!(dir.members(&room("R")).is_empty());
        assert_eq!(dir.room_count(), 0);
    }

    #[test]
    fn test_switch_room_leaves_old_first() {
        let mut dir = directory();
        let c = ConnectionId::new();
        let other = ConnectionId::new();
        dir.join(other, "bob", "R1").unwrap();
        dir.join(c, "alice", "R1").unwrap();

        let out = dir.join(c, "alice", "R2").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].room, room("R1"));
        assert_eq!(out[0].message.kind, MessageType::Leave);
        assert_eq!(out[1].room, room("R2"));
        assert_eq!(out[1].message.kind, MessageType::Join);

        assert_eq!(dir.members(&room("R1")), vec![other]);
        assert_eq!(dir.members(&room("R2")), vec![c]);
        assert_consistent(&dir, &[c, other]);
    }

    #[test]
    fn test_rejoin_same_room_keeps_single_membership() {
        let mut dir = directory();
        let c = ConnectionId::new();
        dir.join(c, "alice", "R").unwrap();

        let out = dir.join(c, "alicia", "R").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message.kind, MessageType::Join);
        assert_eq!(dir.members(&room("R")), vec![c]);
        assert_eq!(dir.session(c).unwrap().username, "alicia");
    }

    #[test]
    fn test_force_leave_is_idempotent() {
        let mut dir = directory();
        let c = ConnectionId::new();
        dir.join(c, "bob", "R").unwrap();

        let out = dir.force_leave(c).unwrap();
        assert_eq!(out.message.username.as_deref(), Some("bob"));
        assert!(dir.force_leave(c).is_none());
        assert_eq!(dir.room_count(), 0);
    }

    #[test]
    fn test_evict_is_silent() {
        let ids = Arc::new(IdGenerator::new());
        let mut dir = RoomDirectory::new(Arc::clone(&ids));
        let c = ConnectionId::new();
        dir.join(c, "bob", "R").unwrap();

        assert!(dir.evict(c));
        // No LEAVE message was built
        assert_eq!(ids.last_issued(), 1);
        assert_eq!(dir.room_count(), 0);
        assert!(dir.session(c).is_none());
        assert!(!dir.evict(c));
    }

    #[test]
    fn test_random_sequence_keeps_invariants() {
        let mut dir = directory();
        let conns: Vec<_> = (0..4).map(|_| ConnectionId::new()).collect();
        let rooms = ["a", "b", "c"];

        // Deterministic pseudo-random walk over operations
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let c = conns[(seed % 4) as usize];
            match (seed >> 8) % 4 {
                0 | 1 => {
                    let _ = dir.join(c, "user", rooms[((seed >> 16) % 3) as usize]);
                }
                2 => {
                    let _ = dir.leave(c);
                }
                _ => {
                    let _ = dir.chat(c, "hello");
                }
            }
            assert_consistent(&dir, &conns);
        }
    }
}
