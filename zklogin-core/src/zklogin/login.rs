use url::Url;

use super::ZkLogin;
use crate::{
    config::OpenIdProvider,
    error::ZkLoginError,
    keys::{compute_nonce, EphemeralKeyPair, Randomness},
    storage::SetupRecord,
};

/// Where to send the user to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Provider authorization URL carrying the nonce.
    pub url: String,
    /// The nonce the identity token will be bound to.
    pub nonce: String,
    /// Last epoch in which the attempt's ephemeral key is valid.
    pub max_epoch: u64,
}

impl ZkLogin {
    /// Starts a login with `provider`.
    ///
    /// Generates a fresh ephemeral key and randomness, stores them as the pending setup
    /// (replacing any earlier attempt) and returns the provider URL to navigate to.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if no client id is configured for `provider`,
    /// or the chain error if the current epoch cannot be fetched. Nothing is persisted on
    /// failure.
    pub async fn start_login(
        &self,
        provider: OpenIdProvider,
    ) -> Result<AuthorizationRequest, ZkLoginError> {
        let client_id = self.config.client_id(provider)?;

        let current_epoch = self.chain.current_epoch().await?;
        let max_epoch = current_epoch
            .checked_add(self.config.expiry_window)
            .ok_or_else(|| ZkLoginError::invalid_input("expiry_window", "max epoch overflows"))?;

        let keypair = EphemeralKeyPair::generate();
        let randomness = Randomness::generate();
        let nonce = compute_nonce(&keypair.public_key(), max_epoch, randomness)?;
        let url = authorization_url(provider, client_id, &self.config.redirect_uri, &nonce)?;

        self.setup.save(&SetupRecord {
            provider,
            max_epoch,
            randomness,
            ephemeral_private_key: keypair.export_secret(),
        })?;
        log::info!(
            "started {provider} login, current epoch {current_epoch}, max epoch {max_epoch}"
        );

        Ok(AuthorizationRequest {
            url,
            nonce,
            max_epoch,
        })
    }
}

fn authorization_url(
    provider: OpenIdProvider,
    client_id: &str,
    redirect_uri: &str,
    nonce: &str,
) -> Result<String, ZkLoginError> {
    let url = Url::parse_with_params(
        provider.authorization_endpoint(),
        &[
            ("client_id", client_id),
            ("nonce", nonce),
            ("redirect_uri", redirect_uri),
            ("response_type", "id_token"),
            ("scope", "openid"),
        ],
    )
    .map_err(|e| ZkLoginError::invalid_input("authorization_endpoint", e.to_string()))?;
    Ok(url.into())
}
