//! Client
//!
//! Action-based connection manager for Tocsin emergency rooms. Owns the
//! client's session (display name, current room, connection state) and room
//! bookmarks, and turns user intents and transport events into protocol
//! messages and state transitions.
//!
//! # Architecture
//!
//! The manager is Sans-IO. It receives events ([`ClientEvent`]), processes
//! them through pure state machine logic, and returns actions
//! ([`ClientAction`]) for the caller to execute: open or close a transport,
//! send a message, persist a value, update the UI.
//!
//! # Components
//!
//! - [`ConnectionManager`]: the state machine
//! - [`Session`]: name, room and [`ConnectionState`]
//! - [`BookmarkList`]: rooms joined before
//! - [`SessionStore`]: persistence, with [`MemoryStore`] and [`RedbStore`]
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::spawn`]: one WebSocket connection per `TransportId`
//! - [`runtime::Runtime`]: async loop executing manager actions

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bookmarks;
mod error;
mod event;
mod manager;
mod session;
pub mod store;

#[cfg(feature = "transport")]
pub mod runtime;
#[cfg(feature = "transport")]
pub mod transport;

pub use bookmarks::{BookmarkList, MAX_BOOKMARKS};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, TransportId};
pub use manager::{
    CONNECTION_ERROR_TITLE, ConnectionManager, EMERGENCY_TITLE, ERROR_TITLE, UNREACHABLE_MESSAGE,
};
pub use session::{ConnectionState, JoinIntent, Session};
pub use store::{MemoryStore, PersistedSession, RedbStore, SessionStore, StoreError};
pub use tocsin_core::Environment;
