//! # agov-zkp — Proof Layer
//!
//! Defines what a membership proof must attest and how it is checked,
//! without implementing the circuit arithmetic.
//!
//! ## Architecture
//!
//! - **Proof** (`proof.rs`): the proof object, the signal it binds, and the
//!   public inputs a backend verifies against.
//! - **Traits** (`traits.rs`): `ProvingBackend`, the async interface to the
//!   external prover/verifier. Calls are long-latency and fallible.
//! - **Validator** (`validator.rs`): shape validation of `proofBytes` and the
//!   recomputation of scope-bound values.
//! - **Mock** (`mock.rs`): `MockProvingBackend`, deterministic SHA-256
//!   "proofs" that bind the public inputs. No zero knowledge.
//!
//! ## Crate Policy
//!
//! - Depends on `agov-core` and `agov-crypto` internally.
//! - The proof bytes are validated for shape, never interpreted.

#[cfg(feature = "mock")]
pub mod mock;
pub mod proof;
pub mod traits;
pub mod validator;

#[cfg(feature = "mock")]
pub use mock::MockProvingBackend;
pub use proof::{Proof, ProofWitness, PublicInputs, Signal, PROOF_ELEMENT_COUNT};
pub use traits::{BackendError, ProvingBackend};
pub use validator::ProofValidator;
