//! Ephemeral key material for a single login attempt.
//!
//! A login attempt owns one Ed25519 keypair and one random scalar. Both are bound into the
//! OAuth nonce, so the identity token the provider returns is only usable with this key and
//! only until `max_epoch`.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    error::ZkLoginError,
    utils::{blake2b256, poseidon_hash},
};

/// Signature scheme flag for Ed25519 keys and signatures.
pub const ED25519_FLAG: u8 = 0x00;

/// Number of trailing bytes of the nonce hash that are sent to the identity provider.
const NONCE_LEN: usize = 20;

/// The extended public key is split into two scalars; the low one holds this many bytes.
const PUBLIC_KEY_LOW_BYTES: usize = 16;

/// Intent prefix for transaction data: `[scope = TransactionData, version = V0, app = Sui]`.
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// The exported private key of an ephemeral keypair: `base64(flag || seed)`.
///
/// The value is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct EphemeralSecret(String);

impl EphemeralSecret {
    /// Wraps an encoded secret. The value is validated when a keypair is rebuilt from it.
    #[must_use]
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// Returns the encoded secret. Treat this as sensitive material.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EphemeralSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EphemeralSecret(<redacted>)")
    }
}

/// A short-lived Ed25519 keypair, valid until the `max_epoch` of the login attempt that
/// created it.
pub struct EphemeralKeyPair {
    signing_key: SigningKey,
}

impl EphemeralKeyPair {
    /// Generates a fresh keypair from the OS random source.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuilds a keypair from its exported secret.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if the secret is not valid base64, does not carry
    /// the Ed25519 flag or has the wrong length.
    pub fn from_secret(secret: &EphemeralSecret) -> Result<Self, ZkLoginError> {
        let mut bytes = STANDARD
            .decode(secret.expose())
            .map_err(|e| ZkLoginError::invalid_input("ephemeral_private_key", e.to_string()))?;

        let result = match bytes.split_first() {
            Some((&ED25519_FLAG, seed)) => <[u8; 32]>::try_from(seed)
                .map(|seed| Self {
                    signing_key: SigningKey::from_bytes(&seed),
                })
                .map_err(|_| {
                    ZkLoginError::invalid_input(
                        "ephemeral_private_key",
                        format!("expected 32 key bytes, got {}", seed.len()),
                    )
                }),
            Some((flag, _)) => Err(ZkLoginError::invalid_input(
                "ephemeral_private_key",
                format!("unsupported key scheme flag {flag:#04x}"),
            )),
            None => Err(ZkLoginError::invalid_input(
                "ephemeral_private_key",
                "empty key",
            )),
        };
        bytes.zeroize();
        result
    }

    /// Exports the private key so it can be persisted across the OAuth redirect.
    #[must_use]
    pub fn export_secret(&self) -> EphemeralSecret {
        let mut bytes = Vec::with_capacity(33);
        bytes.push(ED25519_FLAG);
        bytes.extend_from_slice(self.signing_key.as_bytes());
        let secret = EphemeralSecret(STANDARD.encode(&bytes));
        bytes.zeroize();
        secret
    }

    /// Returns the public half of the keypair.
    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs transaction bytes and returns the serialized user signature
    /// `base64(flag || signature || public_key)`.
    ///
    /// The signature covers `blake2b256(intent || tx_bytes)`, not the raw bytes.
    #[must_use]
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let digest = blake2b256(&[&TRANSACTION_INTENT, tx_bytes]);
        let signature = self.signing_key.sign(&digest);

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(self.public_key().as_bytes());
        STANDARD.encode(serialized)
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &hex::encode(self.public_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

/// High-entropy nonce-binding material, independent of the keypair.
///
/// Serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Randomness(u128);

impl Randomness {
    /// Draws a fresh 128-bit value from the OS random source.
    #[must_use]
    pub fn generate() -> Self {
        Self(OsRng.gen())
    }
}

impl From<u128> for Randomness {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for Randomness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Randomness> for String {
    fn from(value: Randomness) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Randomness {
    type Error = ZkLoginError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|e| ZkLoginError::invalid_input("randomness", e.to_string()))
    }
}

/// Serializes a public key for the proof service: scheme flag followed by the key bytes.
#[must_use]
pub fn extended_public_key(public_key: &VerifyingKey) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(33);
    bytes.push(ED25519_FLAG);
    bytes.extend_from_slice(public_key.as_bytes());
    bytes
}

/// Binds an ephemeral public key, its expiry epoch and the attempt's randomness into the
/// nonce sent to the identity provider.
///
/// The nonce is the Poseidon hash of the extended public key (as two scalars), `max_epoch`
/// and the randomness, truncated to its last 20 bytes and base64url encoded. The proof
/// circuit recomputes it from the same inputs.
///
/// # Errors
/// Returns [`ZkLoginError::InvalidInput`] if the hash cannot be computed.
pub fn compute_nonce(
    public_key: &VerifyingKey,
    max_epoch: u64,
    randomness: Randomness,
) -> Result<String, ZkLoginError> {
    let extended = extended_public_key(public_key);
    let (high, low) = extended.split_at(extended.len() - PUBLIC_KEY_LOW_BYTES);
    let hash = poseidon_hash(&[
        Fr::from_be_bytes_mod_order(high),
        Fr::from_be_bytes_mod_order(low),
        Fr::from(max_epoch),
        Fr::from(randomness.0),
    ])?;
    let bytes = hash.into_bigint().to_bytes_be();
    Ok(URL_SAFE_NO_PAD.encode(&bytes[bytes.len() - NONCE_LEN..]))
}
