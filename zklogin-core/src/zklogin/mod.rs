//! The login orchestrator.
//!
//! A login spans two entry points that only share persisted state: [`ZkLogin::start_login`]
//! stores a [`SetupRecord`] and returns the provider URL, and [`ZkLogin::handle_redirect`]
//! consumes that record once the provider sends the user back.

use std::sync::Arc;

use crate::{
    chain::{ChainClient, JsonRpcChainClient, TransactionBuilder},
    config::ZkLoginConfig,
    error::ZkLoginError,
    http_request::Request,
    services::{ProverClient, SaltClient},
    storage::{
        AccountRecord, AccountStore, InMemorySessionStore, SessionStore, SetupRecord, SetupStore,
    },
};

mod login;
mod redirect;
mod signer;

pub use login::AuthorizationRequest;
pub use redirect::RedirectOutcome;
pub use signer::assemble_zklogin_signature;

/// Drives zkLogin: starting logins, completing them from the provider redirect and signing
/// transactions for the resulting accounts.
pub struct ZkLogin {
    config: ZkLoginConfig,
    session: Arc<dyn SessionStore>,
    setup: SetupStore,
    accounts: AccountStore,
    chain: Arc<dyn ChainClient>,
    builder: Arc<dyn TransactionBuilder>,
    salt: SaltClient,
    prover: ProverClient,
}

impl ZkLogin {
    /// Creates an orchestrator over the given collaborators.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if the configuration is invalid.
    pub fn new(
        config: ZkLoginConfig,
        session: Arc<dyn SessionStore>,
        chain: Arc<dyn ChainClient>,
        builder: Arc<dyn TransactionBuilder>,
    ) -> Result<Self, ZkLoginError> {
        config.validate()?;
        let request = Request::new(&config);

        Ok(Self {
            salt: SaltClient::new(config.salt_service_url.clone(), request.clone()),
            prover: ProverClient::new(config.prover_url.clone(), request),
            setup: SetupStore::new(Arc::clone(&session)),
            accounts: AccountStore::new(Arc::clone(&session)),
            session,
            chain,
            builder,
            config,
        })
    }

    /// Creates an orchestrator with an in-memory session store and a JSON-RPC chain client
    /// talking to `config.rpc_url`.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if the configuration is invalid.
    pub fn with_defaults(
        config: ZkLoginConfig,
        builder: Arc<dyn TransactionBuilder>,
    ) -> Result<Self, ZkLoginError> {
        let chain = JsonRpcChainClient::from_config(&config);
        Self::new(
            config,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(chain),
            builder,
        )
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ZkLoginConfig {
        &self.config
    }

    /// Logged-in accounts, newest first.
    ///
    /// # Errors
    /// Returns an error if the session store cannot be read.
    pub fn accounts(&self) -> Result<Vec<AccountRecord>, ZkLoginError> {
        Ok(self.accounts.list()?)
    }

    /// The login attempt waiting for its redirect, if any.
    ///
    /// # Errors
    /// Returns an error if the session store cannot be read.
    pub fn pending_setup(&self) -> Result<Option<SetupRecord>, ZkLoginError> {
        Ok(self.setup.load()?)
    }

    /// Forgets every account and any pending login.
    ///
    /// # Errors
    /// Returns an error if the session store cannot be cleared.
    pub fn reset(&self) -> Result<(), ZkLoginError> {
        self.session.clear()?;
        log::info!("cleared zkLogin session state");
        Ok(())
    }
}

impl std::fmt::Debug for ZkLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZkLogin")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
