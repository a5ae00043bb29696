//! Chain collaborators: the full node RPC and the transaction builder.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::ZkLoginConfig, error::ZkLoginError, http_request::Request};

/// Result of executing a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The transaction digest.
    pub digest: String,
    /// Execution effects as reported by the node.
    #[serde(default)]
    pub effects: serde_json::Value,
}

/// Read and write access to the chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Returns the network's current epoch.
    ///
    /// # Errors
    /// Returns an error if the node cannot be reached or answers with an error.
    async fn current_epoch(&self) -> Result<u64, ZkLoginError>;

    /// Submits `tx_bytes` with a single serialized `signature` for execution.
    ///
    /// # Errors
    /// Returns an error if the node cannot be reached or rejects the transaction.
    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionResult, ZkLoginError>;
}

/// Turns a pending transaction into the final bytes to sign.
///
/// Implementations decode the pending transaction, set its sender and resolve whatever the
/// chain needs (gas price, gas payment) before serializing it.
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    /// Builds the transaction with `sender` as its sender.
    ///
    /// # Errors
    /// Returns an error if the pending bytes cannot be decoded or the transaction cannot be built.
    async fn build(&self, pending: &[u8], sender: &str) -> Result<Vec<u8>, ZkLoginError>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct SystemState {
    epoch: String,
}

/// [`ChainClient`] backed by a full node's JSON-RPC interface.
#[derive(Debug, Clone)]
pub struct JsonRpcChainClient {
    rpc_url: String,
    request: Request,
}

impl JsonRpcChainClient {
    pub(crate) fn new(rpc_url: String, request: Request) -> Self {
        Self { rpc_url, request }
    }

    /// Creates a client for `config.rpc_url` using the configured timeout.
    #[must_use]
    pub fn from_config(config: &ZkLoginConfig) -> Self {
        Self::new(config.rpc_url.clone(), Request::new(config))
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ZkLoginError> {
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let builder = self.request.post_json(&self.rpc_url, &body)?;
        let response: JsonRpcResponse<T> = self.request.handle_json(builder).await?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(ZkLoginError::NetworkFailure {
                url: self.rpc_url.clone(),
                status: None,
                error: format!("{method} failed ({}): {}", error.code, error.message),
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ZkLoginError::SerializationError {
                error: format!("{method} returned neither result nor error"),
            }),
        }
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn current_epoch(&self) -> Result<u64, ZkLoginError> {
        let state: SystemState = self.call("suix_getLatestSuiSystemState", json!([])).await?;
        state
            .epoch
            .parse()
            .map_err(|e| ZkLoginError::SerializationError {
                error: format!("invalid epoch '{}': {e}", state.epoch),
            })
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionResult, ZkLoginError> {
        let params = json!([
            STANDARD.encode(tx_bytes),
            [signature],
            { "showEffects": true, "showObjectChanges": true },
            "WaitForLocalExecution",
        ]);
        self.call("sui_executeTransactionBlock", params).await
    }
}
