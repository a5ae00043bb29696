//! Ordered list of logged-in accounts, newest first.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::{
    error::{StorageError, StorageResult},
    traits::SessionStore,
    ACCOUNTS_SLOT,
};
use crate::{
    address::{is_valid_address, Salt},
    config::OpenIdProvider,
    keys::EphemeralSecret,
    services::ProofBlob,
};

/// Everything needed to sign for a zkLogin address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Provider that authenticated the user.
    pub provider: OpenIdProvider,
    /// `0x`-prefixed hex address.
    pub address: String,
    /// Proof material from the proof service, stored as received.
    pub zk_proofs: ProofBlob,
    /// Ephemeral private key the proof is bound to.
    pub ephemeral_private_key: EphemeralSecret,
    /// The user's salt.
    pub salt: Salt,
    /// Subject claim of the identity token.
    pub sub: String,
    /// Audience claim of the identity token.
    pub aud: String,
    /// Issuer claim of the identity token.
    pub iss: String,
    /// Last epoch in which the ephemeral key is valid.
    pub max_epoch: u64,
}

/// Persists [`AccountRecord`]s newest first. Records are never updated in place; the list is
/// only ever prepended to or cleared.
pub struct AccountStore {
    store: Arc<dyn SessionStore>,
    append_lock: Mutex<()>,
}

impl AccountStore {
    /// Creates an account store over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            append_lock: Mutex::new(()),
        }
    }

    /// Returns the stored accounts, newest first.
    ///
    /// Entries that do not parse as an [`AccountRecord`] or carry a malformed address are
    /// skipped; the remaining entries are returned. A slot that is not a JSON list loads as
    /// empty.
    ///
    /// # Errors
    /// Returns an error if the slot cannot be read.
    pub fn list(&self) -> StorageResult<Vec<AccountRecord>> {
        let entries = match self.raw_entries() {
            Ok(entries) => entries,
            Err(StorageError::Serialization(e)) => {
                log::warn!("account list is unreadable, treating it as empty: {e}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                match serde_json::from_value::<AccountRecord>(entry) {
                    Ok(record) if is_valid_address(&record.address) => Some(record),
                    Ok(_) => {
                        log::warn!("skipping stored account {index}: malformed address");
                        None
                    }
                    Err(e) => {
                        log::warn!("skipping stored account {index}: {e}");
                        None
                    }
                }
            })
            .collect())
    }

    /// Prepends `record` to the list. Existing entries are kept as stored, including ones
    /// [`Self::list`] skips.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidRecord`] if the record's address is malformed,
    /// [`StorageError::Serialization`] if the stored list is not a JSON list (it is left
    /// untouched), or an error if the slot cannot be read or written.
    pub fn append(&self, record: AccountRecord) -> StorageResult<()> {
        if !is_valid_address(&record.address) {
            return Err(StorageError::InvalidRecord(format!(
                "malformed address '{}'",
                record.address
            )));
        }

        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| StorageError::SessionStore("append lock poisoned".to_string()))?;

        let mut entries = self.raw_entries()?;
        entries.insert(0, serde_json::to_value(&record)?);
        let bytes = serde_json::to_vec(&entries)?;
        self.store.write(ACCOUNTS_SLOT, &bytes)
    }

    fn raw_entries(&self) -> StorageResult<Vec<serde_json::Value>> {
        self.store
            .read(ACCOUNTS_SLOT)?
            .map_or_else(|| Ok(Vec::new()), |bytes| Ok(serde_json::from_slice(&bytes)?))
    }

    /// Removes every account.
    ///
    /// # Errors
    /// Returns an error if the slot cannot be deleted.
    pub fn clear(&self) -> StorageResult<()> {
        self.store.delete(ACCOUNTS_SLOT)
    }
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore").finish_non_exhaustive()
    }
}
