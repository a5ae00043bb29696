//! Identity token handling.
//!
//! Tokens are decoded locally without verifying the provider's signature. The proof service
//! verifies the token, so the claims read here only steer the client-side flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

use crate::error::ZkLoginError;

/// The claim used as the user identifier when deriving addresses and requesting proofs.
pub const KEY_CLAIM_NAME: &str = "sub";

/// Claims of an OIDC identity token that the zkLogin flow relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTokenClaims {
    /// Issuer (`iss`), e.g. `https://accounts.google.com`.
    pub iss: String,
    /// Subject (`sub`), the provider's stable user identifier.
    pub sub: String,
    /// Audience (`aud`), the OAuth client id the token was minted for.
    pub aud: String,
    /// Nonce (`nonce`) echoed back from the authorization request.
    pub nonce: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawClaims {
    iss: Option<String>,
    sub: Option<String>,
    aud: Option<Audience>,
    nonce: Option<String>,
}

/// Decodes the payload segment of a compact JWS token.
///
/// # Errors
/// Returns [`ZkLoginError::MalformedToken`] if the token is not a three-part compact token,
/// the payload is not base64url JSON, or `iss`, `sub` or `aud` is missing.
pub fn decode_claims(token: &str) -> Result<IdTokenClaims, ZkLoginError> {
    let mut segments = token.trim().split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(ZkLoginError::malformed_token(
                "expected a token with three dot-separated segments",
            ))
        }
    };

    let payload = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ZkLoginError::malformed_token(format!("payload is not base64url: {e}")))?;
    let raw: RawClaims = serde_json::from_slice(&payload)
        .map_err(|e| ZkLoginError::malformed_token(format!("payload is not JSON: {e}")))?;

    let aud = match raw.aud {
        Some(Audience::One(aud)) => Some(aud),
        Some(Audience::Many(auds)) => auds.into_iter().next(),
        None => None,
    };

    Ok(IdTokenClaims {
        iss: required(raw.iss, "iss")?,
        sub: required(raw.sub, "sub")?,
        aud: required(aud, "aud")?,
        nonce: raw.nonce,
    })
}

fn required(value: Option<String>, claim: &str) -> Result<String, ZkLoginError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ZkLoginError::malformed_token(format!("missing '{claim}' claim")))
}

/// Extracts the `id_token` parameter from an OAuth callback.
///
/// Accepts a bare fragment or query (`#id_token=…`, `?id_token=…`, `id_token=…`) or a full
/// callback URL. The fragment is searched before the query. Returns `None` when the payload
/// carries no token, which is the case for ordinary page loads.
#[must_use]
pub fn extract_id_token(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (before_fragment, fragment) = match raw.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (raw, None),
    };
    let query = before_fragment
        .split_once('?')
        .map_or(before_fragment, |(_, query)| query);

    fragment
        .into_iter()
        .chain(std::iter::once(query))
        .find_map(|params| {
            url::form_urlencoded::parse(params.as_bytes())
                .find(|(key, _)| key == "id_token")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|token| !token.is_empty())
}
