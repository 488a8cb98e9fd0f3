//! Session state owned by the connection manager.

use tocsin_proto::{DisplayName, RoomCode};

use crate::event::TransportId;

/// Which message to send once a transport opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinIntent {
    /// Send `create`.
    Create,
    /// Send `join`.
    Join,
}

/// Connection lifecycle.
///
/// At most one transport exists at a time; it is the one named by the
/// current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,

    /// Transport requested, association not yet acknowledged.
    Connecting {
        /// Current transport.
        transport: TransportId,
        /// Room being associated with.
        room: RoomCode,
        /// Message to send on open.
        intent: JoinIntent,
        /// Whether the transport reported open and the request went out.
        opened: bool,
    },

    /// Server acknowledged the association.
    Joined {
        /// Current transport.
        transport: TransportId,
        /// Room joined.
        room: RoomCode,
    },
}

impl ConnectionState {
    /// Transport of the current state, if any.
    pub fn transport(&self) -> Option<TransportId> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { transport, .. } | Self::Joined { transport, .. } => Some(*transport),
        }
    }
}

/// Client session: display name, current room and connection state.
///
/// Mutated only by [`ConnectionManager`](crate::ConnectionManager).
/// `room` is `Some` only between a successful `created`/`joined` and the next
/// leave, error or transport fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Current display name. Never empty.
    pub name: DisplayName,
    /// Room the server last acknowledged, or the persisted room being
    /// rejoined at startup.
    pub room: Option<RoomCode>,
    /// Connection lifecycle.
    pub state: ConnectionState,
}

impl Session {
    /// Fresh disconnected session.
    pub fn new(name: DisplayName) -> Self {
        Self { name, room: None, state: ConnectionState::Disconnected }
    }

    /// Whether the server has acknowledged the current room.
    pub fn is_joined(&self) -> bool {
        matches!(self.state, ConnectionState::Joined { .. })
    }
}
