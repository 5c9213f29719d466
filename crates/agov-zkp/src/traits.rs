//! # Proving Backend Trait
//!
//! The external prover/verifier. Proof generation is computationally heavy
//! and may run out of process, so both calls are async and fallible.
//!
//! ## Error Contract
//!
//! - `Err(BackendError)` means the backend could not answer (unreachable,
//!   crashed, bad witness). Callers surface this as
//!   `ProofBackendUnavailable`.
//! - `Ok(false)` from `verify_bytes` means the backend answered and the
//!   proof does not satisfy the public inputs. That is a semantic rejection.

use async_trait::async_trait;
use thiserror::Error;

use crate::proof::{ProofWitness, PublicInputs, PROOF_ELEMENT_COUNT};

/// Failure to obtain an answer from the proving backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is not reachable or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend could not build a witness from the supplied inputs.
    #[error("invalid witness: {0}")]
    InvalidWitness(String),
}

/// Interface to an external zero-knowledge proving system.
///
/// Implementations must be `Send + Sync`; the service shares one instance
/// behind an `Arc` across concurrent requests.
#[async_trait]
pub trait ProvingBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Produce the proof elements for a witness.
    async fn prove(
        &self,
        witness: &ProofWitness<'_>,
    ) -> Result<[String; PROOF_ELEMENT_COUNT], BackendError>;

    /// Check proof elements against public inputs.
    async fn verify_bytes(
        &self,
        proof_bytes: &[String],
        public_inputs: &PublicInputs,
    ) -> Result<bool, BackendError>;
}
