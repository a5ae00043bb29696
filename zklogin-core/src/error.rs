use thiserror::Error;

use crate::storage::StorageError;

/// Error outputs from `zklogin-core`
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum ZkLoginError {
    /// An external service (chain RPC, salt service or proof service) could not be reached
    /// or answered with a non-success status.
    #[error("network_error: {url} (status: {status:?}): {error}")]
    NetworkFailure {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code, if a response was received.
        status: Option<u16>,
        /// Details about the failure.
        error: String,
    },
    /// An external call did not complete within the configured timeout.
    #[error("timeout: {url}")]
    Timeout {
        /// The URL that was requested.
        url: String,
    },
    /// The identity token is missing required claims or cannot be decoded.
    #[error("malformed_token: {reason}")]
    MalformedToken {
        /// Why the token was rejected.
        reason: String,
    },
    /// The proof service answered but did not produce a usable proof.
    #[error("proof_service_rejection: {reason}")]
    ProofServiceRejection {
        /// Why the proof was rejected.
        reason: String,
    },
    /// A transaction could not be signed or submitted.
    #[error("signing_failure: {reason}")]
    SigningFailure {
        /// Human readable reason for the failure.
        reason: String,
    },
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that failed validation.
        attribute: String,
        /// Why the attribute is invalid.
        reason: String,
    },
    /// Unexpected error serializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Details about the serialization failure.
        error: String,
    },
    /// The session store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ZkLoginError {
    pub(crate) fn invalid_input(attribute: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            attribute: attribute.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_token(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    pub(crate) fn signing_failure(reason: impl Into<String>) -> Self {
        Self::SigningFailure {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ZkLoginError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerializationError {
            error: error.to_string(),
        }
    }
}

/// Result type for `zklogin-core` operations.
pub type ZkLoginResult<T, E = ZkLoginError> = std::result::Result<T, E>;
