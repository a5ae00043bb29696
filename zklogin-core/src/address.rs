//! Address derivation for zkLogin accounts.
//!
//! The on-chain address is a hash of the token issuer and an address seed. The seed is a
//! Poseidon commitment to the user's salt and the `(claim name, claim value, audience)`
//! triple, so the identity is never revealed on-chain while the address stays stable for a
//! given identity and salt.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::PrimeField;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::{
    config::OpenIdProvider,
    error::ZkLoginError,
    jwt::{decode_claims, KEY_CLAIM_NAME},
    utils::{blake2b256, field_to_u256, poseidon_hash, u256_to_field, DecimalNumber},
};

/// Signature scheme flag for zkLogin authenticators; also prefixes the address preimage.
pub const ZKLOGIN_FLAG: u8 = 0x05;

const MAX_KEY_CLAIM_NAME_LEN: usize = 32;
const MAX_KEY_CLAIM_VALUE_LEN: usize = 115;
const MAX_AUD_VALUE_LEN: usize = 145;

/// Bytes packed into each scalar when hashing a string; 31 bytes always fit below the modulus.
const PACK_WIDTH: usize = 31;

const GOOGLE_ISSUER: &str = "accounts.google.com";

/// Number of hex characters in a full address.
const ADDRESS_HEX_LEN: usize = 64;

/// The per-identity secret returned by the salt service.
///
/// Serialized as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Salt(U256);

impl Salt {
    /// Parses a salt from its decimal form.
    ///
    /// # Errors
    /// Returns [`ZkLoginError::InvalidInput`] if the value is not a base-10 integer up to 256 bits.
    pub fn from_decimal(decimal: &str) -> Result<Self, ZkLoginError> {
        U256::try_from_decimal_string(decimal, "salt").map(Self)
    }
}

impl From<U256> for Salt {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_decimal_string())
    }
}

impl From<Salt> for String {
    fn from(value: Salt) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Salt {
    type Error = ZkLoginError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_decimal(&value)
    }
}

/// Commitment to `(salt, claim name, claim value, audience)` embedded in the proof.
///
/// Always a BN254 scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSeed(U256);

impl AddressSeed {
    /// Big-endian bytes of the seed.
    #[must_use]
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }
}

impl fmt::Display for AddressSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_decimal_string())
    }
}

/// Zero-pads `value` to `max_len` bytes, packs it into 31-byte big-endian scalars and hashes
/// them.
fn hash_ascii_str_to_field(
    value: &str,
    max_len: usize,
    attribute: &str,
) -> Result<Fr, ZkLoginError> {
    if value.len() > max_len {
        return Err(ZkLoginError::invalid_input(
            attribute,
            format!("longer than {max_len} bytes"),
        ));
    }
    let mut padded = value.as_bytes().to_vec();
    padded.resize(max_len, 0);
    let packed: Vec<Fr> = padded
        .chunks(PACK_WIDTH)
        .map(Fr::from_be_bytes_mod_order)
        .collect();
    poseidon_hash(&packed)
}

/// Computes the address seed for an identity:
/// `poseidon(H(claim_name), H(claim_value), H(aud), poseidon(salt))`.
///
/// The same inputs must be used when requesting the proof and when signing, otherwise the
/// chain rejects the signature.
///
/// # Errors
/// Returns [`ZkLoginError::InvalidInput`] if a string exceeds the circuit's length limit
/// (32 bytes for the claim name, 115 for the value, 145 for the audience) or the salt is not
/// a BN254 scalar.
pub fn gen_address_seed(
    salt: &Salt,
    claim_name: &str,
    claim_value: &str,
    aud: &str,
) -> Result<AddressSeed, ZkLoginError> {
    let salt_hash = poseidon_hash(&[u256_to_field(salt.0, "salt")?])?;
    let seed = poseidon_hash(&[
        hash_ascii_str_to_field(claim_name, MAX_KEY_CLAIM_NAME_LEN, "claim_name")?,
        hash_ascii_str_to_field(claim_value, MAX_KEY_CLAIM_VALUE_LEN, "claim_value")?,
        hash_ascii_str_to_field(aud, MAX_AUD_VALUE_LEN, "aud")?,
        salt_hash,
    ])?;
    Ok(AddressSeed(field_to_u256(seed)))
}

/// Derives the `0x`-prefixed address for an issuer and address seed:
/// `blake2b256(flag || len(iss) || iss || seed)`.
///
/// Google tokens may carry the issuer without a scheme; it is hashed as
/// `https://accounts.google.com` either way.
///
/// # Errors
/// Returns [`ZkLoginError::InvalidInput`] if the issuer is longer than 255 bytes.
pub fn derive_address(iss: &str, address_seed: &AddressSeed) -> Result<String, ZkLoginError> {
    let iss = if iss == GOOGLE_ISSUER {
        OpenIdProvider::Google.issuer()
    } else {
        iss
    };
    let iss_len = u8::try_from(iss.len())
        .map_err(|_| ZkLoginError::invalid_input("iss", "issuer longer than 255 bytes"))?;
    let digest = blake2b256(&[
        &[ZKLOGIN_FLAG, iss_len],
        iss.as_bytes(),
        &address_seed.to_be_bytes(),
    ]);
    Ok(format!("0x{}", hex::encode(digest)))
}

/// Derives the address of the identity in `token` using the `sub` claim and `salt`.
///
/// # Errors
/// Returns [`ZkLoginError::MalformedToken`] if the token cannot be decoded, or the errors of
/// [`gen_address_seed`] and [`derive_address`].
pub fn jwt_to_address(token: &str, salt: &Salt) -> Result<String, ZkLoginError> {
    let claims = decode_claims(token)?;
    let seed = gen_address_seed(salt, KEY_CLAIM_NAME, &claims.sub, &claims.aud)?;
    derive_address(&claims.iss, &seed)
}

/// Returns the address in canonical `0x`-prefixed form. Prefixed input is returned unchanged.
#[must_use]
pub fn normalize_address(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("0x") {
        raw.to_string()
    } else {
        format!("0x{raw}")
    }
}

/// Whether `address` is `0x` followed by 1 to 64 hex digits.
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    address.strip_prefix("0x").is_some_and(|hex| {
        !hex.is_empty()
            && hex.len() <= ADDRESS_HEX_LEN
            && hex.bytes().all(|b| b.is_ascii_hexdigit())
    })
}
