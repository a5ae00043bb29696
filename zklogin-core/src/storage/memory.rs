//! Process-local session store.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use super::{
    error::{StorageError, StorageResult},
    traits::SessionStore,
};

/// A [`SessionStore`] kept in process memory. State lives as long as the value does,
/// which matches the lifetime of a single app session.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> StorageResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.slots
            .lock()
            .map_err(|_| StorageError::SessionStore("mutex poisoned".to_string()))
    }
}

impl SessionStore for InMemorySessionStore {
    fn read(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.slots()?.get(slot).cloned())
    }

    fn write(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
        self.slots()?.insert(slot.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, slot: &str) -> StorageResult<()> {
        self.slots()?.remove(slot);
        Ok(())
    }

    fn take(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.slots()?.remove(slot))
    }

    fn clear(&self) -> StorageResult<()> {
        self.slots()?.clear();
        Ok(())
    }
}
