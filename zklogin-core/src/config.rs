use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{error::ZkLoginError, Network};

/// Number of epochs an ephemeral key stays valid after the epoch in which login started.
pub const DEFAULT_EXPIRY_WINDOW: u64 = 2;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// An OpenID-Connect identity provider supported by the login flow.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum OpenIdProvider {
    /// Google accounts.
    Google,
}

impl OpenIdProvider {
    /// The provider's OAuth 2.0 authorization endpoint.
    #[must_use]
    pub const fn authorization_endpoint(self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com/o/oauth2/v2/auth",
        }
    }

    /// The `iss` claim of identity tokens minted by the provider.
    #[must_use]
    pub const fn issuer(self) -> &'static str {
        match self {
            Self::Google => "https://accounts.google.com",
        }
    }

    /// Whether `iss` names this provider. The scheme may be omitted.
    #[must_use]
    pub fn accepts_issuer(self, iss: &str) -> bool {
        let issuer = self.issuer();
        iss == issuer || issuer.strip_prefix("https://") == Some(iss)
    }
}

/// Configuration for a [`crate::ZkLogin`] instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkLoginConfig {
    /// The network accounts live on.
    pub network: Network,
    /// Full node JSON-RPC endpoint.
    pub rpc_url: String,
    /// Salt service endpoint (`POST { jwt } -> { salt }`).
    pub salt_service_url: String,
    /// Proof service endpoint.
    pub prover_url: String,
    /// Callback URL registered with the identity providers.
    pub redirect_uri: String,
    /// OAuth client id per provider.
    #[serde(default)]
    pub client_ids: BTreeMap<OpenIdProvider, String>,
    /// Epochs added to the current epoch to obtain `max_epoch`.
    #[serde(default = "default_expiry_window")]
    pub expiry_window: u64,
    /// Timeout applied to every outgoing HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Permits plain `http` service URLs. Only meant for local development and tests.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

const fn default_expiry_window() -> u64 {
    DEFAULT_EXPIRY_WINDOW
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ZkLoginConfig {
    /// Builds a configuration with the default services for `network`.
    #[must_use]
    pub fn from_network(network: Network, redirect_uri: &str) -> Self {
        let (rpc_url, prover_url) = match network {
            Network::Devnet => (
                "https://fullnode.devnet.sui.io:443",
                "https://prover-dev.mystenlabs.com/v1",
            ),
            Network::Testnet => (
                "https://fullnode.testnet.sui.io:443",
                "https://prover-dev.mystenlabs.com/v1",
            ),
            Network::Mainnet => (
                "https://fullnode.mainnet.sui.io:443",
                "https://prover.mystenlabs.com/v1",
            ),
        };

        Self {
            network,
            rpc_url: rpc_url.to_string(),
            salt_service_url: "https://salt.api.mystenlabs.com/get_salt".to_string(),
            prover_url: prover_url.to_string(),
            redirect_uri: redirect_uri.to_string(),
            client_ids: BTreeMap::new(),
            expiry_window: DEFAULT_EXPIRY_WINDOW,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            allow_insecure_http: false,
        }
    }

    /// Parses a JSON configuration.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if the JSON does not describe a valid configuration.
    pub fn from_json(config: &str) -> Result<Self, ZkLoginError> {
        let config: Self = serde_json::from_str(config)
            .map_err(|e| ZkLoginError::invalid_input("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Registers the OAuth client id for `provider`.
    #[must_use]
    pub fn with_client_id(mut self, provider: OpenIdProvider, client_id: &str) -> Self {
        self.client_ids.insert(provider, client_id.to_string());
        self
    }

    /// Returns the OAuth client id for `provider`.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if no client id is configured.
    pub fn client_id(&self, provider: OpenIdProvider) -> Result<&str, ZkLoginError> {
        self.client_ids
            .get(&provider)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ZkLoginError::invalid_input(
                    "client_ids",
                    format!("no client id configured for {provider}"),
                )
            })
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks that every endpoint is a well-formed URL using an allowed scheme.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] naming the first offending attribute.
    pub fn validate(&self) -> Result<(), ZkLoginError> {
        for (attribute, value) in [
            ("rpc_url", &self.rpc_url),
            ("salt_service_url", &self.salt_service_url),
            ("prover_url", &self.prover_url),
        ] {
            self.check_service_url(attribute, value)?;
        }
        url::Url::parse(&self.redirect_uri)
            .map_err(|e| ZkLoginError::invalid_input("redirect_uri", e.to_string()))?;
        if self.request_timeout_secs == 0 {
            return Err(ZkLoginError::invalid_input(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub(crate) fn check_service_url(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<(), ZkLoginError> {
        let url = url::Url::parse(value)
            .map_err(|e| ZkLoginError::invalid_input(attribute, e.to_string()))?;
        match url.scheme() {
            "https" => Ok(()),
            "http" if self.allow_insecure_http => Ok(()),
            scheme => Err(ZkLoginError::invalid_input(
                attribute,
                format!("scheme '{scheme}' is not allowed"),
            )),
        }
    }
}
