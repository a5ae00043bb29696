//! Platform interface for session persistence.

use super::error::StorageResult;

/// Named-slot store for session-scoped state (e.g. browser `sessionStorage`).
///
/// Implementations must make every method atomic with respect to concurrent callers.
pub trait SessionStore: Send + Sync {
    /// Reads the bytes stored in `slot`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn read(&self, slot: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Writes `bytes` to `slot`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write(&self, slot: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Deletes `slot`. Deleting a missing slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, slot: &str) -> StorageResult<()>;

    /// Reads and deletes `slot` in one step.
    ///
    /// The default implementation is only atomic for single-threaded stores; shared
    /// stores must override it so that two callers can never both observe the value.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or the delete fails.
    fn take(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        let value = self.read(slot)?;
        if value.is_some() {
            self.delete(slot)?;
        }
        Ok(value)
    }

    /// Wipes every slot held by this store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    fn clear(&self) -> StorageResult<()>;
}
