//! Proof service client: exchanges an identity token and the ephemeral key material for a
//! zero-knowledge proof.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::{
    address::Salt,
    error::ZkLoginError,
    http_request::Request,
    jwt::KEY_CLAIM_NAME,
    keys::{extended_public_key, Randomness},
};

/// Proof material returned by the proof service.
///
/// The format belongs to the proof service and the chain; this crate forwards it without
/// interpreting it, apart from the optional `addressSeed` field checked at signing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofBlob(serde_json::Value);

impl ProofBlob {
    /// Wraps a proof JSON object.
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The raw proof JSON.
    #[must_use]
    pub const fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// The address seed the proof was bound to, when the proof service reports it.
    #[must_use]
    pub fn address_seed(&self) -> Option<&str> {
        self.0.get("addressSeed").and_then(serde_json::Value::as_str)
    }
}

/// Inputs the proof service needs to prove that `jwt` authorizes the ephemeral key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    /// Last epoch in which the ephemeral key is valid.
    pub max_epoch: u64,
    /// The randomness bound into the nonce.
    pub jwt_randomness: Randomness,
    /// Base64 of the extended ephemeral public key (scheme flag followed by key bytes).
    pub extended_ephemeral_public_key: String,
    /// The raw identity token.
    pub jwt: String,
    /// The user's salt.
    pub salt: Salt,
    /// The claim used as user identifier.
    pub key_claim_name: String,
}

impl ProofRequest {
    /// Builds a request binding the proof to `public_key`.
    #[must_use]
    pub fn new(
        jwt: &str,
        public_key: &VerifyingKey,
        max_epoch: u64,
        randomness: Randomness,
        salt: Salt,
    ) -> Self {
        Self {
            max_epoch,
            jwt_randomness: randomness,
            extended_ephemeral_public_key: STANDARD.encode(extended_public_key(public_key)),
            jwt: jwt.to_string(),
            salt,
            key_claim_name: KEY_CLAIM_NAME.to_string(),
        }
    }
}

/// Client for the zero-knowledge proof service.
#[derive(Debug, Clone)]
pub struct ProverClient {
    url: String,
    request: Request,
}

impl ProverClient {
    pub(crate) fn new(url: String, request: Request) -> Self {
        Self { url, request }
    }

    /// Requests a proof.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::NetworkFailure`] or [`ZkLoginError::Timeout`] if the service
    /// cannot be reached, and [`ZkLoginError::ProofServiceRejection`] if it answers with
    /// something other than a proof object or reports `success: false`.
    pub async fn prove(&self, proof_request: &ProofRequest) -> Result<ProofBlob, ZkLoginError> {
        let builder = self.request.post_json(&self.url, proof_request)?;
        let body = self.request.handle_text(builder).await?;
        parse_proof_response(&body)
    }
}

fn parse_proof_response(body: &str) -> Result<ProofBlob, ZkLoginError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ZkLoginError::ProofServiceRejection {
            reason: format!("proof is not valid JSON: {e}"),
        })?;

    let Some(object) = value.as_object() else {
        return Err(ZkLoginError::ProofServiceRejection {
            reason: "proof is not a JSON object".to_string(),
        });
    };

    if object.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        let message = object
            .get("message")
            .or_else(|| object.get("error"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("proof service reported failure");
        return Err(ZkLoginError::ProofServiceRejection {
            reason: message.to_string(),
        });
    }

    Ok(ProofBlob(value))
}
