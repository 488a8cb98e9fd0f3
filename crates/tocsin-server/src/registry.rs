//! Room registry: the authoritative map from room code to members.
//!
//! Keeps two indexes in step: room code → members (in join order, for roster
//! snapshots and fan-out) and session → room code (for cleanup on disconnect
//! and for validating emergencies). A session belongs to at most one room.
//!
//! Rooms exist only while they have members. The first `create_room` makes
//! one, the last `leave_room` deletes it.
//!
//! The registry does no I/O and knows nothing about the wire. The driver turns
//! its results into messages.

use std::collections::HashMap;

use tocsin_proto::{DisplayName, RoomCode};

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// `create` for a code that already has members
    #[error("room {0} already exists")]
    RoomExists(RoomCode),

    /// `join` for a code with no members
    #[error("room {0} does not exist")]
    RoomNotFound(RoomCode),

    /// Session is not a member of the named room
    #[error("session {session_id} is not a member of room {room}")]
    NotInRoom {
        /// Acting session
        session_id: u64,
        /// Room the session claimed
        room: RoomCode,
    },

    /// Session is not a member of any room
    #[error("session {0} is not in a room")]
    NotInAnyRoom(u64),

    /// Session must leave its current room first
    #[error("session {session_id} is already in room {room}")]
    AlreadyInRoom {
        /// Acting session
        session_id: u64,
        /// Room the session is in
        room: RoomCode,
    },
}

/// One connection's presence in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Owning connection
    pub session_id: u64,
    /// Name shown in the roster
    pub name: DisplayName,
}

/// Result of removing a session from its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Room the session left
    pub room: RoomCode,
    /// Member entry that was removed
    pub member: Member,
    /// Whether the room was deleted because it became empty
    pub room_closed: bool,
}

/// Per-room state.
///
/// Generic over `I` (Instant type) to support virtual time in tests.
#[derive(Debug, Clone)]
struct Room<I> {
    /// Members in join order, never empty
    members: Vec<Member>,
    /// When the first member created the room
    created_at: I,
}

/// Authoritative room membership.
///
/// # Invariants
///
/// - Every room in `rooms` has at least one member
/// - `session_rooms[s] == c` iff `rooms[c]` contains a member with session `s`
/// - A session appears in at most one room, at most once
#[derive(Debug, Clone)]
pub struct RoomRegistry<I = std::time::Instant> {
    /// Room code → room state
    rooms: HashMap<RoomCode, Room<I>>,
    /// Session ID → room code (reverse index)
    session_rooms: HashMap<u64, RoomCode>,
}

impl<I> Default for RoomRegistry<I> {
    fn default() -> Self {
        Self { rooms: HashMap::new(), session_rooms: HashMap::new() }
    }
}

impl<I: Copy> RoomRegistry<I> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `code` and add the caller as its first member.
    ///
    /// Returns the roster (just the caller).
    ///
    /// # Errors
    ///
    /// - [`RoomError::RoomExists`] if the code is taken; the existing room is
    ///   left untouched
    /// - [`RoomError::AlreadyInRoom`] if the caller has not left its room
    pub fn create_room(
        &mut self,
        session_id: u64,
        code: RoomCode,
        name: DisplayName,
        now: I,
    ) -> Result<Vec<String>, RoomError> {
        self.ensure_roomless(session_id)?;
        if self.rooms.contains_key(&code) {
            return Err(RoomError::RoomExists(code));
        }

        let roster = vec![name.to_string()];
        self.rooms.insert(
            code.clone(),
            Room { members: vec![Member { session_id, name }], created_at: now },
        );
        self.session_rooms.insert(session_id, code);
        Ok(roster)
    }

    /// Append the caller to an existing room.
    ///
    /// Returns the roster including the caller.
    ///
    /// # Errors
    ///
    /// - [`RoomError::RoomNotFound`] if no room has this code
    /// - [`RoomError::AlreadyInRoom`] if the caller has not left its room
    pub fn join_room(
        &mut self,
        session_id: u64,
        code: &RoomCode,
        name: DisplayName,
    ) -> Result<Vec<String>, RoomError> {
        self.ensure_roomless(session_id)?;
        let room = self.rooms.get_mut(code).ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;

        room.members.push(Member { session_id, name });
        let roster = names(&room.members);
        self.session_rooms.insert(session_id, code.clone());
        Ok(roster)
    }

    /// Remove the caller from its room, deleting the room if it empties.
    ///
    /// Leaving while not in a room is a no-op and returns `None`.
    pub fn leave_room(&mut self, session_id: u64) -> Option<Departure> {
        let code = self.session_rooms.remove(&session_id)?;
        let room = self.rooms.get_mut(&code)?;

        let index = room.members.iter().position(|m| m.session_id == session_id)?;
        let member = room.members.remove(index);

        let room_closed = room.members.is_empty();
        if room_closed {
            self.rooms.remove(&code);
        }

        Some(Departure { room: code, member, room_closed })
    }

    /// Change the caller's name by leaving and rejoining its room.
    ///
    /// The member moves to the end of the roster. Never closes the room, even
    /// for a sole member. Returns the room code and the new roster.
    ///
    /// # Errors
    ///
    /// [`RoomError::NotInAnyRoom`] if the caller is not in a room.
    pub fn rename_member(
        &mut self,
        session_id: u64,
        name: DisplayName,
    ) -> Result<(RoomCode, Vec<String>), RoomError> {
        let code =
            self.session_rooms.get(&session_id).cloned().ok_or(RoomError::NotInAnyRoom(session_id))?;
        let room = self.rooms.get_mut(&code).ok_or(RoomError::NotInAnyRoom(session_id))?;

        room.members.retain(|m| m.session_id != session_id);
        room.members.push(Member { session_id, name });

        let roster = names(&room.members);
        Ok((code, roster))
    }

    /// Sessions that should receive the caller's emergency: every other
    /// member of `code`, in join order.
    ///
    /// # Errors
    ///
    /// [`RoomError::NotInRoom`] if the caller is not a member of `code`.
    pub fn emergency(&self, session_id: u64, code: &RoomCode) -> Result<Vec<u64>, RoomError> {
        if self.session_rooms.get(&session_id) != Some(code) {
            return Err(RoomError::NotInRoom { session_id, room: code.clone() });
        }

        Ok(self.sessions_in_room(code).filter(|&s| s != session_id).collect())
    }

    /// Roster snapshot of `code` in join order. Empty if the room does not
    /// exist.
    pub fn roster(&self, code: &RoomCode) -> Vec<String> {
        self.rooms.get(code).map(|room| names(&room.members)).unwrap_or_default()
    }

    /// Sessions in `code`, in join order.
    pub fn sessions_in_room(&self, code: &RoomCode) -> impl Iterator<Item = u64> + '_ {
        self.rooms.get(code).into_iter().flat_map(|room| room.members.iter().map(|m| m.session_id))
    }

    /// Room the session is in, if any.
    pub fn room_of(&self, session_id: u64) -> Option<&RoomCode> {
        self.session_rooms.get(&session_id)
    }

    /// Member entry for a session, if it is in a room.
    pub fn member(&self, session_id: u64) -> Option<&Member> {
        let code = self.session_rooms.get(&session_id)?;
        self.rooms.get(code)?.members.iter().find(|m| m.session_id == session_id)
    }

    /// When the room was created. `None` if it does not exist.
    pub fn created_at(&self, code: &RoomCode) -> Option<I> {
        self.rooms.get(code).map(|room| room.created_at)
    }

    /// Check if a room exists.
    pub fn has_room(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of sessions currently in some room.
    pub fn member_count(&self) -> usize {
        self.session_rooms.len()
    }

    fn ensure_roomless(&self, session_id: u64) -> Result<(), RoomError> {
        match self.session_rooms.get(&session_id) {
            Some(room) => Err(RoomError::AlreadyInRoom { session_id, room: room.clone() }),
            None => Ok(()),
        }
    }
}

fn names(members: &[Member]) -> Vec<String> {
    members.iter().map(|m| m.name.to_string()).collect()
}
