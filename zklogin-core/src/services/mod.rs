//! Clients for the external services the login flow depends on.

pub mod prover;
pub mod salt;

pub use prover::{ProofBlob, ProofRequest, ProverClient};
pub use salt::SaltClient;
