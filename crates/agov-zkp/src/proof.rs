//! # Proof Object
//!
//! A proof attests, without naming the member, that:
//!
//! - some commitment in the group with root `merkle_root` belongs to the
//!   prover,
//! - `nullifier_hash` was derived from that member's secret and
//!   `external_nullifier`,
//! - the member endorsed `signal`.
//!
//! `proof_bytes` is the backend's output: exactly
//! [`PROOF_ELEMENT_COUNT`] 32-byte values as hex strings. It is a `Vec` on
//! the wire so that a wrong cardinality can be received and rejected
//! rather than failing deserialization.

use agov_core::{ExternalNullifier, MerkleRoot, NullifierHash};
use agov_crypto::{signal_hash, Identity};
use serde::{Deserialize, Serialize};

/// Number of 32-byte elements in a backend proof (Groth16: A, B, C points).
pub const PROOF_ELEMENT_COUNT: usize = 8;

/// The anonymous payload and the action context it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Semantic payload: a vote choice or encoded preference data.
    pub message: String,
    /// Action-context string. Must uniquely identify the action.
    pub scope: String,
}

impl Signal {
    pub fn new(message: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            scope: scope.into(),
        }
    }
}

/// A membership proof bound to one signal and one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub merkle_root: MerkleRoot,
    pub nullifier_hash: NullifierHash,
    /// The signal message this proof endorses.
    pub signal: String,
    pub external_nullifier: ExternalNullifier,
    pub proof_bytes: Vec<String>,
}

impl Proof {
    /// The public inputs this proof claims to satisfy.
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            merkle_root: self.merkle_root.clone(),
            nullifier_hash: self.nullifier_hash.clone(),
            signal_hash: signal_hash(&self.signal),
            external_nullifier: self.external_nullifier.clone(),
        }
    }
}

/// Values the backend verifies a proof against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInputs {
    pub merkle_root: MerkleRoot,
    pub nullifier_hash: NullifierHash,
    pub signal_hash: String,
    pub external_nullifier: ExternalNullifier,
}

/// Everything the backend needs to produce proof bytes.
///
/// Holds the identity by reference; the secret never leaves the caller.
#[derive(Debug)]
pub struct ProofWitness<'a> {
    pub identity: &'a Identity,
    pub signal: &'a Signal,
    pub merkle_root: MerkleRoot,
    pub external_nullifier: ExternalNullifier,
    pub nullifier_hash: NullifierHash,
}

impl ProofWitness<'_> {
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            merkle_root: self.merkle_root.clone(),
            nullifier_hash: self.nullifier_hash.clone(),
            signal_hash: signal_hash(&self.signal.message),
            external_nullifier: self.external_nullifier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_serializes_camel_case() {
        let proof = Proof {
            merkle_root: MerkleRoot::zero(),
            nullifier_hash: NullifierHash::from_hex("ab"),
            signal: "m".to_string(),
            external_nullifier: ExternalNullifier::from_hex("cd"),
            proof_bytes: vec![],
        };
        let v = serde_json::to_value(&proof).unwrap();
        assert!(v.get("merkleRoot").is_some());
        assert!(v.get("nullifierHash").is_some());
        assert!(v.get("externalNullifier").is_some());
        assert!(v.get("proofBytes").is_some());
    }

    #[test]
    fn recased_nullifier_deserializes_to_the_same_proof() {
        let proof = Proof {
            merkle_root: MerkleRoot::zero(),
            nullifier_hash: NullifierHash::from_hex("ab".repeat(32)),
            signal: "m".to_string(),
            external_nullifier: ExternalNullifier::from_hex("cd".repeat(32)),
            proof_bytes: vec![],
        };
        let mut v = serde_json::to_value(&proof).unwrap();
        v["nullifierHash"] = serde_json::Value::String("AB".repeat(32));
        let decoded: Proof = serde_json::from_value(v).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn public_inputs_hash_the_signal() {
        let proof = Proof {
            merkle_root: MerkleRoot::zero(),
            nullifier_hash: NullifierHash::from_hex("ab"),
            signal: "p|Yes".to_string(),
            external_nullifier: ExternalNullifier::from_hex("cd"),
            proof_bytes: vec![],
        };
        assert_eq!(proof.public_inputs().signal_hash, signal_hash("p|Yes"));
    }
}
