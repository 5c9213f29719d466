//! # Nullifier Derivation
//!
//! ```text
//! external_nullifier = H("agov.external-nullifier.v1", scope)
//! nullifier_hash     = H("agov.nullifier.v1", secret, external_nullifier)
//! signal_hash        = H("agov.signal.v1", message)
//! ```
//!
//! Both derivations are pure. The same identity acting in the same scope
//! always produces the same nullifier hash, which is what lets a verifier
//! detect a second action without learning who acted. Different scopes
//! give unrelated hashes, so actions in different scopes are unlinkable.
//!
//! The scope string must uniquely name the action context. Two unrelated
//! actions that share scope text share an external nullifier and will
//! collide in replay detection.

use agov_core::{bytes_to_hex, tagged_sha256, ExternalNullifier, NullifierHash};

use crate::identity::Identity;

const EXTERNAL_NULLIFIER_TAG: &str = "agov.external-nullifier.v1";
const NULLIFIER_TAG: &str = "agov.nullifier.v1";
const SIGNAL_TAG: &str = "agov.signal.v1";

/// Scope-derived value shared by all members acting in `scope`.
pub fn external_nullifier(scope: &str) -> ExternalNullifier {
    ExternalNullifier::from_hex(bytes_to_hex(&tagged_sha256(
        EXTERNAL_NULLIFIER_TAG,
        &[scope.as_bytes()],
    )))
}

/// Single-use token for `identity` acting under `external`.
pub fn nullifier_hash(identity: &Identity, external: &ExternalNullifier) -> NullifierHash {
    NullifierHash::from_hex(bytes_to_hex(&tagged_sha256(
        NULLIFIER_TAG,
        &[identity.secret(), external.as_str().as_bytes()],
    )))
}

/// Public-input digest of a signal message.
pub fn signal_hash(message: &str) -> String {
    bytes_to_hex(&tagged_sha256(SIGNAL_TAG, &[message.as_bytes()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn external_nullifier_is_hex() {
        let en = external_nullifier("proposal-1:vote");
        assert_eq!(en.as_str().len(), 64);
        assert!(en.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_identities_same_scope_differ() {
        let en = external_nullifier("s");
        let a = nullifier_hash(&Identity::from_secret([1; 32]), &en);
        let b = nullifier_hash(&Identity::from_secret([2; 32]), &en);
        assert_ne!(a, b);
    }

    #[test]
    fn signal_hash_binds_message() {
        assert_ne!(signal_hash("p|Yes"), signal_hash("p|No"));
        assert_eq!(signal_hash("p|Yes"), signal_hash("p|Yes"));
    }

    proptest! {
        #[test]
        fn external_nullifier_is_pure(scope in ".*") {
            prop_assert_eq!(external_nullifier(&scope), external_nullifier(&scope));
        }

        #[test]
        fn nullifier_hash_is_stable(secret in any::<[u8; 32]>(), scope in ".{0,64}") {
            let id = Identity::from_secret(secret);
            let en = external_nullifier(&scope);
            prop_assert_eq!(nullifier_hash(&id, &en), nullifier_hash(&id, &en));
        }

        #[test]
        fn different_scopes_give_different_hashes(
            secret in any::<[u8; 32]>(),
            a in "[a-z]{1,16}",
            b in "[a-z]{1,16}",
        ) {
            prop_assume!(a != b);
            let id = Identity::from_secret(secret);
            prop_assert_ne!(
                nullifier_hash(&id, &external_nullifier(&a)),
                nullifier_hash(&id, &external_nullifier(&b))
            );
        }
    }
}
