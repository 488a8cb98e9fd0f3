//! Redb-backed durable session store.
//!
//! One table keyed by field name. Scalars are UTF-8; the bookmark list is
//! CBOR.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};
use tocsin_proto::{DisplayName, RoomCode};

use super::{PersistedSession, SessionStore, StoreError};

/// Table: session
/// Key: field name (`name`, `room`, `bookmarks`)
/// Value: UTF-8 for scalars, CBOR-encoded `StoredBookmarks` for bookmarks
const SESSION: TableDefinition<&str, &[u8]> = TableDefinition::new("session");

const NAME_KEY: &str = "name";
const ROOM_KEY: &str = "room";
const BOOKMARKS_KEY: &str = "bookmarks";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredBookmarks {
    codes: Vec<String>,
}

/// Durable session store backed by Redb.
///
/// Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(SESSION).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put(&self, key: &str, value: Option<&[u8]>) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(SESSION).map_err(|e| StoreError::Io(e.to_string()))?;
            match value {
                Some(bytes) => {
                    table.insert(key, bytes).map_err(|e| StoreError::Io(e.to_string()))?;
                },
                None => {
                    table.remove(key).map_err(|e| StoreError::Io(e.to_string()))?;
                },
            }
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

impl SessionStore for RedbStore {
    fn load(&self) -> Result<PersistedSession, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(SESSION).map_err(|e| StoreError::Io(e.to_string()))?;

        let read_string = |key: &str| -> Result<Option<String>, StoreError> {
            let Some(guard) = table.get(key).map_err(|e| StoreError::Io(e.to_string()))? else {
                return Ok(None);
            };
            String::from_utf8(guard.value().to_vec())
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string()))
        };

        let name = read_string(NAME_KEY)?;
        let room = read_string(ROOM_KEY)?;

        let bookmarks = match table.get(BOOKMARKS_KEY).map_err(|e| StoreError::Io(e.to_string()))? {
            Some(guard) => {
                let stored: StoredBookmarks = ciborium::from_reader(guard.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                stored.codes
            },
            None => Vec::new(),
        };

        Ok(PersistedSession { name, room, bookmarks })
    }

    fn save_name(&self, name: &DisplayName) -> Result<(), StoreError> {
        self.put(NAME_KEY, Some(name.as_str().as_bytes()))
    }

    fn save_room(&self, room: Option<&RoomCode>) -> Result<(), StoreError> {
        self.put(ROOM_KEY, room.map(|r| r.as_str().as_bytes()))
    }

    fn save_bookmarks(&self, bookmarks: &[RoomCode]) -> Result<(), StoreError> {
        let stored =
            StoredBookmarks { codes: bookmarks.iter().map(ToString::to_string).collect() };

        let mut bytes = Vec::new();
        ciborium::into_writer(&stored, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.put(BOOKMARKS_KEY, Some(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::parse(s).unwrap()
    }

    #[test]
    fn fresh_database_is_empty() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("session.redb")).unwrap();

        assert_eq!(store.load().unwrap(), PersistedSession::default());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store.save_name(&DisplayName::parse("user12345").unwrap()).unwrap();
            store.save_room(Some(&code("42042"))).unwrap();
            store.save_bookmarks(&[code("11111"), code("42042")]).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("user12345"));
        assert_eq!(loaded.room.as_deref(), Some("42042"));
        assert_eq!(loaded.bookmarks, vec!["11111".to_string(), "42042".to_string()]);
    }

    #[test]
    fn clearing_room_keeps_name_and_bookmarks() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("session.redb")).unwrap();

        store.save_name(&DisplayName::parse("alice").unwrap()).unwrap();
        store.save_room(Some(&code("42042"))).unwrap();
        store.save_bookmarks(&[code("42042")]).unwrap();
        store.save_room(None).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.room, None);
        assert_eq!(loaded.name.as_deref(), Some("alice"));
        assert_eq!(loaded.bookmarks, vec!["42042".to_string()]);
    }

    #[test]
    fn clearing_an_absent_room_is_fine() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("session.redb")).unwrap();

        store.save_room(None).unwrap();
        assert_eq!(store.load().unwrap().room, None);
    }
}
