//! Client-side zkLogin: sign in with an OpenID provider and transact from the address the
//! identity maps to, authorized by a zero-knowledge proof instead of a long-lived key.
//!
//! Start with [`ZkLogin`]: [`ZkLogin::start_login`] returns the provider URL,
//! [`ZkLogin::handle_redirect`] turns the provider's callback into an [`AccountRecord`], and
//! [`ZkLogin::sign_transaction`] signs and submits transactions for that account.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The network accounts are created and transactions are submitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Network {
    /// Development network, wiped regularly.
    Devnet,
    /// Public test network.
    Testnet,
    /// Production network.
    Mainnet,
}

pub mod address;
pub mod chain;
pub mod jwt;
pub mod keys;
pub mod services;
pub mod storage;

/// Service endpoints, providers and tunables.
pub mod config;

/// Bridges `log` records to the host or to stderr.
pub mod logger;

mod error;
pub use error::*;

mod zklogin;
pub use zklogin::{assemble_zklogin_signature, AuthorizationRequest, RedirectOutcome, ZkLogin};

pub use chain::{ChainClient, ExecutionResult, JsonRpcChainClient, TransactionBuilder};
pub use config::{OpenIdProvider, ZkLoginConfig};
pub use storage::{AccountRecord, InMemorySessionStore, SessionStore, SetupRecord};

// private modules
mod http_request;
mod utils;

pub use utils::DecimalNumber;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("zklogin_core");
