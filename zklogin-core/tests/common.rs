#![allow(dead_code, missing_docs)]

//! Common test utilities shared across integration tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::json;
use zklogin_core::{
    ChainClient, ExecutionResult, InMemorySessionStore, Network, OpenIdProvider,
    TransactionBuilder, ZkLogin, ZkLoginConfig, ZkLoginError,
};

pub const CLIENT_ID: &str = "client.apps.googleusercontent.com";
pub const ISSUER: &str = "https://accounts.google.com";
pub const SUBJECT: &str = "110463452167303598383";

/// A chain whose epoch is set by the test and which records every submission.
pub struct FakeChain {
    epoch: Mutex<Option<u64>>,
    timeout_on_submit: AtomicBool,
    submissions: Mutex<Vec<(Vec<u8>, String)>>,
}

impl FakeChain {
    pub fn new(epoch: u64) -> Arc<Self> {
        Arc::new(Self {
            epoch: Mutex::new(Some(epoch)),
            timeout_on_submit: AtomicBool::new(false),
            submissions: Mutex::new(Vec::new()),
        })
    }

    /// `None` makes `current_epoch` fail.
    pub fn set_epoch(&self, epoch: Option<u64>) {
        *self.epoch.lock().unwrap() = epoch;
    }

    pub fn time_out_submissions(&self) {
        self.timeout_on_submit.store(true, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<(Vec<u8>, String)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn current_epoch(&self) -> Result<u64, ZkLoginError> {
        self.epoch
            .lock()
            .unwrap()
            .ok_or_else(|| ZkLoginError::NetworkFailure {
                url: "fake://chain".to_string(),
                status: Some(503),
                error: "node unavailable".to_string(),
            })
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionResult, ZkLoginError> {
        if self.timeout_on_submit.load(Ordering::SeqCst) {
            return Err(ZkLoginError::Timeout {
                url: "fake://chain".to_string(),
            });
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((tx_bytes.to_vec(), signature.to_string()));
        Ok(ExecutionResult {
            digest: format!("digest-{}", submissions.len()),
            effects: json!({ "status": { "status": "success" } }),
        })
    }
}

/// Appends the sender to the pending bytes so tests can see which sender was set.
pub struct FakeBuilder;

impl FakeBuilder {
    pub fn built_bytes(pending: &[u8], sender: &str) -> Vec<u8> {
        [pending, b"|sender=", sender.as_bytes()].concat()
    }
}

#[async_trait]
impl TransactionBuilder for FakeBuilder {
    async fn build(&self, pending: &[u8], sender: &str) -> Result<Vec<u8>, ZkLoginError> {
        Ok(Self::built_bytes(pending, sender))
    }
}

/// Builds an unsigned identity token for the test subject.
pub fn id_token(nonce: Option<&str>) -> String {
    id_token_from(ISSUER, nonce)
}

/// Like [`id_token`], with the `iss` claim set to `issuer`.
pub fn id_token_from(issuer: &str, nonce: Option<&str>) -> String {
    let mut claims = json!({
        "iss": issuer,
        "sub": SUBJECT,
        "aud": CLIENT_ID,
        "iat": 1_700_000_000,
        "exp": 1_700_003_600,
    });
    if let Some(nonce) = nonce {
        claims["nonce"] = json!(nonce);
    }
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Configuration pointing the salt and proof services at `server_url`.
pub fn config(server_url: &str) -> ZkLoginConfig {
    let mut config =
        ZkLoginConfig::from_network(Network::Testnet, "https://app.example/callback")
            .with_client_id(OpenIdProvider::Google, CLIENT_ID);
    config.salt_service_url = format!("{server_url}/get_salt");
    config.prover_url = format!("{server_url}/v1");
    config.allow_insecure_http = true;
    config
}

pub fn zklogin(server_url: &str, chain: Arc<FakeChain>) -> (ZkLogin, Arc<InMemorySessionStore>) {
    let session = Arc::new(InMemorySessionStore::new());
    let zklogin = ZkLogin::new(
        config(server_url),
        session.clone(),
        chain,
        Arc::new(FakeBuilder),
    )
    .unwrap();
    (zklogin, session)
}
