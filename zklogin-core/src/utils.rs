use ark_bn254::Fr;
use ark_ff::{BigInt, PrimeField};
use blake2::{digest::consts::U32, Blake2b, Digest};
use light_poseidon::{Poseidon, PoseidonHasher};
use ruint::aliases::U256;

use crate::error::ZkLoginError;

type Blake2b256 = Blake2b<U32>;

/// Hashes the concatenation of `parts` with BLAKE2b-256.
pub(crate) fn blake2b256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Circom-compatible Poseidon hash over BN254 scalars, as used by the zkLogin circuit.
pub(crate) fn poseidon_hash(inputs: &[Fr]) -> Result<Fr, ZkLoginError> {
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| ZkLoginError::invalid_input("poseidon", e.to_string()))?;
    hasher
        .hash(inputs)
        .map_err(|e| ZkLoginError::invalid_input("poseidon", e.to_string()))
}

/// Converts a 256-bit integer to a BN254 scalar.
///
/// # Errors
/// Returns [`ZkLoginError::InvalidInput`] if the value is not below the field modulus.
pub(crate) fn u256_to_field(value: U256, attribute: &str) -> Result<Fr, ZkLoginError> {
    Fr::from_bigint(BigInt::new(*value.as_limbs())).ok_or_else(|| {
        ZkLoginError::invalid_input(attribute, "not below the BN254 scalar field modulus")
    })
}

pub(crate) fn field_to_u256(value: Fr) -> U256 {
    U256::from_limbs(value.into_bigint().0)
}

/// A trait for types that can be represented as a decimal string.
///
/// Salts and address seeds are 256-bit integers. The salt service, the proof service and the
/// composite signature all carry them as base-10 strings, so this is the canonical text form.
pub trait DecimalNumber {
    /// Convert the value to a decimal string without leading zeros.
    fn to_decimal_string(&self) -> String;
    /// Parse a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid base-10 number up to 256 bits.
    fn try_from_decimal_string(decimal: &str, attribute: &str) -> Result<Self, ZkLoginError>
    where
        Self: std::marker::Sized;
}

impl DecimalNumber for U256 {
    fn to_decimal_string(&self) -> String {
        self.to_string()
    }

    fn try_from_decimal_string(decimal: &str, attribute: &str) -> Result<Self, ZkLoginError> {
        let decimal = decimal.trim();
        if decimal.is_empty() || !decimal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ZkLoginError::invalid_input(
                attribute,
                "expected a base-10 integer",
            ));
        }
        Self::from_str_radix(decimal, 10)
            .map_err(|e| ZkLoginError::invalid_input(attribute, e.to_string()))
    }
}
