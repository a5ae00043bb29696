//! Salt service client. The salt keeps an address unlinkable to the identity behind it.

use serde::{Deserialize, Serialize};

use crate::{address::Salt, error::ZkLoginError, http_request::Request};

#[derive(Serialize)]
struct SaltRequest<'a> {
    jwt: &'a str,
}

/// The salt service answers with a decimal string; some deployments send a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum SaltValue {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Deserialize)]
struct SaltResponse {
    salt: SaltValue,
}

/// Client for the salt service, which maps an identity to its stable per-user salt.
///
/// The response is trusted as-is; the service is the trust boundary for salts.
#[derive(Debug, Clone)]
pub struct SaltClient {
    url: String,
    request: Request,
}

impl SaltClient {
    pub(crate) fn new(url: String, request: Request) -> Self {
        Self { url, request }
    }

    /// Fetches the salt for the identity in `jwt`.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::NetworkFailure`] or [`ZkLoginError::Timeout`] if the service
    /// cannot be reached, and [`ZkLoginError::SerializationError`] if the response carries no
    /// usable salt.
    pub async fn fetch_salt(&self, jwt: &str) -> Result<Salt, ZkLoginError> {
        let builder = self.request.post_json(&self.url, &SaltRequest { jwt })?;
        let response: SaltResponse = self.request.handle_json(builder).await?;

        let decimal = match response.salt {
            SaltValue::Text(text) => text,
            SaltValue::Number(number) => number.to_string(),
        };
        Salt::from_decimal(&decimal).map_err(|e| ZkLoginError::SerializationError {
            error: format!("salt service returned an invalid salt: {e}"),
        })
    }
}
