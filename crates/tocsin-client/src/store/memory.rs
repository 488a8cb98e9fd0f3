use std::sync::{Arc, Mutex};

use tocsin_proto::{DisplayName, RoomCode};

use super::{PersistedSession, SessionStore, StoreError};

/// In-memory session store for tests and simulation.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<PersistedSession>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with values, as if from an earlier run.
    pub fn with_session(session: PersistedSession) -> Self {
        Self { inner: Arc::new(Mutex::new(session)) }
    }

    /// Copy of the stored values.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test/simulation code.
    #[allow(clippy::expect_used)]
    pub fn snapshot(&self) -> PersistedSession {
        self.inner.lock().expect("Mutex poisoned").clone()
    }

    fn update(&self, f: impl FnOnce(&mut PersistedSession)) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut inner);
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<PersistedSession, StoreError> {
        Ok(self.inner.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn save_name(&self, name: &DisplayName) -> Result<(), StoreError> {
        self.update(|s| s.name = Some(name.to_string()))
    }

    fn save_room(&self, room: Option<&RoomCode>) -> Result<(), StoreError> {
        self.update(|s| s.room = room.map(ToString::to_string))
    }

    fn save_bookmarks(&self, bookmarks: &[RoomCode]) -> Result<(), StoreError> {
        self.update(|s| s.bookmarks = bookmarks.iter().map(ToString::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_empty() {
        assert_eq!(MemoryStore::new().load().unwrap(), PersistedSession::default());
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();

        clone.save_name(&DisplayName::parse("bob").unwrap()).unwrap();

        assert_eq!(store.snapshot().name.as_deref(), Some("bob"));
    }

    #[test]
    fn with_session_is_loaded_verbatim() {
        let session = PersistedSession {
            name: Some("user12345".into()),
            room: Some("42042".into()),
            bookmarks: vec!["11111".into()],
        };
        let store = MemoryStore::with_session(session.clone());
        assert_eq!(store.load().unwrap(), session);
    }
}
