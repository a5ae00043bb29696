use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use super::ZkLogin;
use crate::{
    address::{derive_address, gen_address_seed, AddressSeed, ZKLOGIN_FLAG},
    error::ZkLoginError,
    jwt::KEY_CLAIM_NAME,
    keys::EphemeralKeyPair,
    services::ProofBlob,
    storage::AccountRecord,
};

impl ZkLogin {
    /// Signs `pending_tx` for `account` and submits it, returning the transaction digest.
    ///
    /// The account is only read. Submission is the last step, so on error nothing has been
    /// sent to the chain.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::Timeout`] if an external call timed out and
    /// [`ZkLoginError::SigningFailure`] for every other failure, including an expired ephemeral
    /// key and an account whose address does not match its proof inputs.
    pub async fn sign_transaction(
        &self,
        account: &AccountRecord,
        pending_tx: &[u8],
    ) -> Result<String, ZkLoginError> {
        self.sign_and_submit(account, pending_tx)
            .await
            .map_err(|e| match e {
                ZkLoginError::Timeout { .. } | ZkLoginError::SigningFailure { .. } => e,
                other => ZkLoginError::signing_failure(other.to_string()),
            })
    }

    async fn sign_and_submit(
        &self,
        account: &AccountRecord,
        pending_tx: &[u8],
    ) -> Result<String, ZkLoginError> {
        let keypair = EphemeralKeyPair::from_secret(&account.ephemeral_private_key)?;

        let current_epoch = self.chain.current_epoch().await?;
        if current_epoch > account.max_epoch {
            return Err(ZkLoginError::signing_failure(format!(
                "ephemeral key expired after epoch {}, current epoch is {current_epoch}",
                account.max_epoch
            )));
        }

        let address_seed =
            gen_address_seed(&account.salt, KEY_CLAIM_NAME, &account.sub, &account.aud)?;
        let derived = derive_address(&account.iss, &address_seed)?;
        if !derived.eq_ignore_ascii_case(&account.address) {
            return Err(ZkLoginError::signing_failure(format!(
                "address seed does not match account {}",
                account.address
            )));
        }
        if let Some(proof_seed) = account.zk_proofs.address_seed() {
            if proof_seed != address_seed.to_string() {
                return Err(ZkLoginError::signing_failure(
                    "proof was generated for a different address seed",
                ));
            }
        }

        let tx_bytes = self.builder.build(pending_tx, &account.address).await?;
        let user_signature = keypair.sign_transaction(&tx_bytes);
        let signature = assemble_zklogin_signature(
            &account.zk_proofs,
            &address_seed,
            account.max_epoch,
            &user_signature,
        )?;

        let result = self.chain.execute_transaction(&tx_bytes, &signature).await?;
        log::info!("submitted transaction {} from {}", result.digest, account.address);
        Ok(result.digest)
    }
}

/// Serializes a zkLogin signature: `base64(flag || json)`, where the JSON carries the proof
/// inputs extended with the address seed, the key's max epoch and the ephemeral signature.
///
/// # Errors
/// Returns [`ZkLoginError::SigningFailure`] if the proof is not a JSON object.
pub fn assemble_zklogin_signature(
    proof: &ProofBlob,
    address_seed: &AddressSeed,
    max_epoch: u64,
    user_signature: &str,
) -> Result<String, ZkLoginError> {
    let Value::Object(proof) = proof.as_json() else {
        return Err(ZkLoginError::signing_failure("proof is not a JSON object"));
    };
    let mut inputs = proof.clone();
    inputs.insert(
        "addressSeed".to_string(),
        Value::String(address_seed.to_string()),
    );

    let payload = serde_json::to_vec(&json!({
        "inputs": inputs,
        "maxEpoch": max_epoch,
        "userSignature": user_signature,
    }))?;

    let mut serialized = Vec::with_capacity(1 + payload.len());
    serialized.push(ZKLOGIN_FLAG);
    serialized.extend_from_slice(&payload);
    Ok(STANDARD.encode(serialized))
}
