//! # agov-core — Foundational Types for Anonymous Group Governance
//!
//! Every other crate in the workspace depends on `agov-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `GroupId`, `ProposalId`,
//!    `SignalId`, `Commitment`, `MerkleRoot`, `NullifierHash`,
//!    `ExternalNullifier`. You cannot pass a nullifier hash where a Merkle
//!    root is expected.
//!
//! 2. **`CanonicalBytes` newtype.** Every encoding that is bound into a
//!    proof or hashed for a public input flows through
//!    `CanonicalBytes::new()` (RFC 8785 / JCS).
//!
//! 3. **One error enum for the protocol surface.** `GovernanceError` carries
//!    exactly the rejection kinds callers are expected to match on.
//!
//! 4. **Injected time.** Phase logic reads a [`Clock`], never the system
//!    time directly, so tests can pin "now".
//!
//! ## Crate Policy
//!
//! - No dependencies on other `agov-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod field;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{bytes_to_hex, hex_to_32bytes, tagged_sha256, Sha256Accumulator};
pub use error::{CanonicalizationError, GovernanceError, HexError};
pub use field::{
    normalize_field_hex, Commitment, ExternalNullifier, MerkleRoot, NullifierHash, FIELD_HEX_LEN,
};
pub use identity::{GroupId, OperationId, ProposalId, SignalId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
