use super::ZkLogin;
use crate::{
    address::{jwt_to_address, normalize_address},
    error::ZkLoginError,
    jwt::{decode_claims, extract_id_token},
    keys::{compute_nonce, EphemeralKeyPair},
    services::ProofRequest,
    storage::AccountRecord,
};

/// What [`ZkLogin::handle_redirect`] did with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// The navigation carries no identity token.
    NotAnAuthCallback,
    /// A token arrived but no login is pending, e.g. a reload of an already handled callback.
    StaleOrMissingSetup,
    /// The login completed and the account was stored.
    AccountAdded(AccountRecord),
}

impl ZkLogin {
    /// Completes a login from the provider's redirect.
    ///
    /// `raw` is either the full callback URL or just its fragment or query string. The pending
    /// setup is consumed before any network call, so a given setup completes at most one login.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::MalformedToken`] if the token cannot be decoded, was issued by
    /// another provider than the pending login's or was minted for another attempt, and the
    /// salt or proof service error if either call fails. No account is stored on error.
    pub async fn handle_redirect(&self, raw: &str) -> Result<RedirectOutcome, ZkLoginError> {
        let Some(token) = extract_id_token(raw) else {
            return Ok(RedirectOutcome::NotAnAuthCallback);
        };
        let claims = decode_claims(&token)?;

        let Some(setup) = self.setup.take()? else {
            log::debug!("ignoring identity token without a pending login");
            return Ok(RedirectOutcome::StaleOrMissingSetup);
        };

        if !setup.provider.accepts_issuer(&claims.iss) {
            return Err(ZkLoginError::malformed_token(format!(
                "token issuer '{}' does not match {}",
                claims.iss, setup.provider
            )));
        }

        let public_key =
            EphemeralKeyPair::from_secret(&setup.ephemeral_private_key)?.public_key();
        if let Some(nonce) = &claims.nonce {
            if *nonce != compute_nonce(&public_key, setup.max_epoch, setup.randomness)? {
                return Err(ZkLoginError::malformed_token(
                    "token nonce does not match the pending login",
                ));
            }
        }

        let salt = self.salt.fetch_salt(&token).await?;
        let address = normalize_address(&jwt_to_address(&token, &salt)?);
        log::debug!("derived address {address}, requesting proof");

        let proof_request =
            ProofRequest::new(&token, &public_key, setup.max_epoch, setup.randomness, salt);
        let zk_proofs = self.prover.prove(&proof_request).await?;

        let record = AccountRecord {
            provider: setup.provider,
            address,
            zk_proofs,
            ephemeral_private_key: setup.ephemeral_private_key,
            salt,
            sub: claims.sub,
            aud: claims.aud,
            iss: claims.iss,
            max_epoch: setup.max_epoch,
        };
        self.accounts.append(record.clone())?;
        log::info!("added {} account {}", record.provider, record.address);

        Ok(RedirectOutcome::AccountAdded(record))
    }
}
