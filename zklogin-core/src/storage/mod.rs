//! Session-scoped persistence: the single-slot setup store and the account list.

pub mod accounts;
pub mod error;
pub mod memory;
pub mod setup;
pub mod traits;

pub use accounts::{AccountRecord, AccountStore};
pub use error::{StorageError, StorageResult};
pub use memory::InMemorySessionStore;
pub use setup::{SetupRecord, SetupStore};
pub use traits::SessionStore;

pub(crate) const SETUP_SLOT: &str = "zklogin.setup";
pub(crate) const ACCOUNTS_SLOT: &str = "zklogin.accounts";
