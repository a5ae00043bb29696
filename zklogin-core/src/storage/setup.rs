//! Single-slot store for the login attempt in flight.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{error::StorageResult, traits::SessionStore, SETUP_SLOT};
use crate::{
    config::OpenIdProvider,
    keys::{EphemeralSecret, Randomness},
};

/// State of a login attempt between the authorization request and the provider's redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRecord {
    /// Provider the user was sent to.
    pub provider: OpenIdProvider,
    /// Last epoch in which the ephemeral key is valid.
    pub max_epoch: u64,
    /// Randomness bound into the nonce.
    pub randomness: Randomness,
    /// The attempt's ephemeral private key.
    pub ephemeral_private_key: EphemeralSecret,
}

/// Holds at most one [`SetupRecord`].
#[derive(Clone)]
pub struct SetupStore {
    store: Arc<dyn SessionStore>,
}

impl SetupStore {
    /// Creates a setup store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Saves `record`, replacing any earlier attempt.
    ///
    /// # Errors
    /// Returns an error if the record cannot be serialized or written.
    pub fn save(&self, record: &SetupRecord) -> StorageResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.store.write(SETUP_SLOT, &bytes)
    }

    /// Returns the pending record without consuming it.
    ///
    /// # Errors
    /// Returns an error if the slot cannot be read or holds an unreadable record.
    pub fn load(&self) -> StorageResult<Option<SetupRecord>> {
        self.store
            .read(SETUP_SLOT)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// Removes and returns the pending record. At most one caller ever receives it.
    ///
    /// # Errors
    /// Returns an error if the slot cannot be taken or holds an unreadable record. An
    /// unreadable record is still removed.
    pub fn take(&self) -> StorageResult<Option<SetupRecord>> {
        self.store
            .take(SETUP_SLOT)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// Drops the pending record, if any.
    ///
    /// # Errors
    /// Returns an error if the slot cannot be deleted.
    pub fn clear(&self) -> StorageResult<()> {
        self.store.delete(SETUP_SLOT)
    }
}

impl std::fmt::Debug for SetupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupStore").finish_non_exhaustive()
    }
}
