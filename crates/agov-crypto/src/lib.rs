//! # agov-crypto — Cryptographic Primitives
//!
//! - **Identity**: a member's private secret and the public commitment
//!   derived from it.
//! - **Nullifiers**: the scope-derived external nullifier and the
//!   per-identity nullifier hash that makes an action single-use.
//! - **Merkle root**: deterministic fingerprint of a group's commitment set.
//!
//! All hashes are domain-separated SHA-256 from `agov-core`. They stand in
//! for the field hash of the external proving backend; the circuit math
//! itself lives outside this workspace.
//!
//! ## Crate Policy
//!
//! - Depends only on `agov-core` internally.
//! - Secrets are zeroized on drop and never appear in `Debug` output.

pub mod error;
pub mod identity;
pub mod merkle;
pub mod nullifier;

pub use error::CryptoError;
pub use identity::Identity;
pub use merkle::{merkle_root, node_hash};
pub use nullifier::{external_nullifier, nullifier_hash, signal_hash};
