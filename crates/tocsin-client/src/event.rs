//! Client events and actions.

use std::fmt;

use tocsin_core::LogLevel;
use tocsin_proto::{ClientMessage, DisplayName, RoomCode};

/// Identifies one transport instance.
///
/// Every `OpenTransport` gets a fresh id, strictly greater than all earlier
/// ones from the same manager. Events carrying an id other than the current
/// one are stale and get discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(pub u64);

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events the caller feeds into the connection manager.
///
/// The caller is responsible for:
/// - Forwarding user intents (create, join, leave, rename, alert)
/// - Reporting what happened to each transport it opened, tagged with the id
///   from the `OpenTransport` action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// User wants a new room with a generated code.
    CreateRoom,

    /// User wants to join a room.
    JoinRoom {
        /// Room code as typed; validated before any I/O.
        room: String,
    },

    /// User wants to leave the current room.
    LeaveRoom,

    /// User wants a different display name.
    Rename {
        /// New name as typed; validated before any I/O.
        name: String,
    },

    /// User pressed the emergency button.
    RaiseEmergency,

    /// User removed a room from the bookmark list.
    ForgetBookmark {
        /// Room code as typed.
        room: String,
    },

    /// Transport finished connecting.
    TransportOpened {
        /// Transport that opened.
        transport: TransportId,
    },

    /// Transport delivered a text message.
    MessageReceived {
        /// Transport that received it.
        transport: TransportId,
        /// Raw JSON text.
        text: String,
    },

    /// Transport could not connect or broke.
    TransportFailed {
        /// Transport that failed.
        transport: TransportId,
        /// Human-readable cause, for logs.
        reason: String,
    },

    /// Transport was closed by the server.
    TransportClosed {
        /// Transport that closed.
        transport: TransportId,
    },
}

/// Actions the manager produces for the caller to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a new connection to the server.
    ///
    /// Report the outcome back as `TransportOpened` or `TransportFailed`.
    OpenTransport {
        /// Id to tag every event from this connection with.
        transport: TransportId,
    },

    /// Close a connection. No further events are expected from it; any that
    /// still arrive are discarded.
    CloseTransport {
        /// Connection to close.
        transport: TransportId,
    },

    /// Send a message on an open connection.
    Send {
        /// Connection to send on.
        transport: TransportId,
        /// Message to send.
        message: ClientMessage,
    },

    /// Persist the display name.
    PersistName(DisplayName),

    /// Persist the current room, or clear it.
    PersistRoom(Option<RoomCode>),

    /// Persist the full bookmark list, oldest first.
    PersistBookmarks(Vec<RoomCode>),

    /// The room shown to the user changed.
    RoomChanged(Option<RoomCode>),

    /// The roster shown to the user changed.
    MembersChanged(Vec<String>),

    /// Show an alert.
    Notify {
        /// Alert title.
        title: String,
        /// Alert body.
        message: String,
    },

    /// Log a message (for debugging/monitoring).
    Log {
        /// Log level.
        level: LogLevel,
        /// Message to log.
        message: String,
    },
}
