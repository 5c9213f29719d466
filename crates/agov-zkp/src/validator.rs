//! # Proof Validator
//!
//! Shape checks on backend output plus the pure recomputations a verifier
//! needs: the external nullifier of a scope and the nullifier hash of an
//! identity in that scope.
//!
//! Nothing here touches state. Replay detection and root freshness belong
//! to the membership service, which owns the stores.

use agov_core::{
    normalize_field_hex, ExternalNullifier, GovernanceError, NullifierHash, FIELD_HEX_LEN,
};
use agov_crypto::{external_nullifier, nullifier_hash, Identity};

use crate::proof::{Proof, PROOF_ELEMENT_COUNT};

/// Stateless proof checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofValidator;

impl ProofValidator {
    /// Check that `proof_bytes` has the backend's output shape: exactly
    /// [`PROOF_ELEMENT_COUNT`] elements, each 64 hex digits (an optional
    /// `0x` prefix is accepted). The nullifier hash must also be in its
    /// canonical form, since it is the replay key.
    pub fn validate_structure(proof: &Proof) -> Result<(), GovernanceError> {
        let nullifier = proof.nullifier_hash.as_str();
        match normalize_field_hex(nullifier) {
            Ok(canonical) if canonical == nullifier => {}
            Ok(_) => {
                return Err(GovernanceError::MalformedProof(
                    "nullifier hash is not in canonical lowercase form".to_string(),
                ))
            }
            Err(e) => {
                return Err(GovernanceError::MalformedProof(format!(
                    "nullifier hash: {e}"
                )))
            }
        }
        if proof.proof_bytes.len() != PROOF_ELEMENT_COUNT {
            return Err(GovernanceError::MalformedProof(format!(
                "expected {PROOF_ELEMENT_COUNT} proof elements, got {}",
                proof.proof_bytes.len()
            )));
        }
        for (i, element) in proof.proof_bytes.iter().enumerate() {
            let hex = element.strip_prefix("0x").unwrap_or(element);
            if hex.len() != FIELD_HEX_LEN {
                return Err(GovernanceError::MalformedProof(format!(
                    "proof element {i} has {} hex chars, expected {FIELD_HEX_LEN}",
                    hex.len()
                )));
            }
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(GovernanceError::MalformedProof(format!(
                    "proof element {i} contains non-hex characters"
                )));
            }
        }
        Ok(())
    }

    pub fn compute_external_nullifier(scope: &str) -> ExternalNullifier {
        external_nullifier(scope)
    }

    pub fn compute_nullifier_hash(
        identity: &Identity,
        external: &ExternalNullifier,
    ) -> NullifierHash {
        nullifier_hash(identity, external)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agov_core::MerkleRoot;

    fn proof_with(bytes: Vec<String>) -> Proof {
        Proof {
            merkle_root: MerkleRoot::zero(),
            nullifier_hash: NullifierHash::from_hex("00".repeat(32)),
            signal: String::new(),
            external_nullifier: ExternalNullifier::from_hex("00"),
            proof_bytes: bytes,
        }
    }

    #[test]
    fn accepts_eight_hex_elements() {
        let bytes = vec!["ab".repeat(32); PROOF_ELEMENT_COUNT];
        assert!(ProofValidator::validate_structure(&proof_with(bytes)).is_ok());
    }

    #[test]
    fn accepts_0x_prefix() {
        let bytes = vec![format!("0x{}", "AB".repeat(32)); PROOF_ELEMENT_COUNT];
        assert!(ProofValidator::validate_structure(&proof_with(bytes)).is_ok());
    }

    #[test]
    fn rejects_wrong_cardinality() {
        for n in [0, 7, 9] {
            let bytes = vec!["ab".repeat(32); n];
            let err = ProofValidator::validate_structure(&proof_with(bytes)).unwrap_err();
            assert!(matches!(err, GovernanceError::MalformedProof(_)));
        }
    }

    #[test]
    fn rejects_short_element() {
        let mut bytes = vec!["ab".repeat(32); PROOF_ELEMENT_COUNT];
        bytes[5] = "ab".repeat(31);
        let err = ProofValidator::validate_structure(&proof_with(bytes)).unwrap_err();
        assert!(err.to_string().contains("element 5"));
    }

    #[test]
    fn rejects_non_hex_element() {
        let mut bytes = vec!["ab".repeat(32); PROOF_ELEMENT_COUNT];
        bytes[0] = "zz".repeat(32);
        assert!(ProofValidator::validate_structure(&proof_with(bytes)).is_err());
    }

    #[test]
    fn rejects_non_canonical_nullifier() {
        let bytes = vec!["ab".repeat(32); PROOF_ELEMENT_COUNT];
        let mut proof = proof_with(bytes);
        proof.nullifier_hash = NullifierHash::from_hex(format!("0x{}", "ab".repeat(32)));
        let err = ProofValidator::validate_structure(&proof).unwrap_err();
        assert!(err.to_string().contains("canonical"));
        proof.nullifier_hash = NullifierHash::from_hex("ab");
        let err = ProofValidator::validate_structure(&proof).unwrap_err();
        assert!(matches!(err, GovernanceError::MalformedProof(_)));
    }

    #[test]
    fn recomputation_is_pure() {
        let en1 = ProofValidator::compute_external_nullifier("p:vote");
        let en2 = ProofValidator::compute_external_nullifier("p:vote");
        assert_eq!(en1, en2);
        let id = Identity::from_secret([4; 32]);
        assert_eq!(
            ProofValidator::compute_nullifier_hash(&id, &en1),
            ProofValidator::compute_nullifier_hash(&id, &en2)
        );
    }
}
