//! Session persistence.
//!
//! Trait-based abstraction for the three values a client keeps across
//! restarts: display name, current room and bookmarks. The trait is
//! synchronous; values are read once at startup and written after every
//! successful mutation.

mod memory;
mod redb;

use thiserror::Error;
use tocsin_proto::{DisplayName, RoomCode};

pub use self::{memory::MemoryStore, redb::RedbStore};
use crate::event::ClientAction;

/// Errors from session persistence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// A thread panicked while holding the store lock
    #[error("store lock poisoned")]
    Poisoned,
}

/// Raw values as stored.
///
/// Kept as strings so a corrupt or outdated value never prevents startup;
/// the connection manager validates them on restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    /// Display name, if one was ever stored.
    pub name: Option<String>,
    /// Room the client was in when it last ran.
    pub room: Option<String>,
    /// Bookmarked room codes, oldest first.
    pub bookmarks: Vec<String>,
}

/// Storage for client session state.
///
/// Must be Clone (shared between the runtime and tests), Send + Sync, and
/// synchronous. Implementations share state internally, so clones see the
/// same values.
pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Load everything stored. Missing values are `None` / empty.
    fn load(&self) -> Result<PersistedSession, StoreError>;

    /// Overwrite the display name.
    fn save_name(&self, name: &DisplayName) -> Result<(), StoreError>;

    /// Overwrite the current room, or clear it.
    fn save_room(&self, room: Option<&RoomCode>) -> Result<(), StoreError>;

    /// Overwrite the bookmark list.
    fn save_bookmarks(&self, bookmarks: &[RoomCode]) -> Result<(), StoreError>;
}

/// Apply a `Persist*` action to a store.
///
/// Returns `Ok(false)` for actions that are not persistence actions.
pub fn persist<S: SessionStore>(store: &S, action: &ClientAction) -> Result<bool, StoreError> {
    match action {
        ClientAction::PersistName(name) => store.save_name(name)?,
        ClientAction::PersistRoom(room) => store.save_room(room.as_ref())?,
        ClientAction::PersistBookmarks(codes) => store.save_bookmarks(codes)?,
        _ => return Ok(false),
    }
    Ok(true)
}
