//! # Member Identity
//!
//! An identity is a 32-byte secret plus the commitment derived from it:
//!
//! ```text
//! commitment = H("agov.commitment.v1", secret)
//! ```
//!
//! The group only ever stores the commitment. The secret stays with the
//! member and is the only input that can reproduce the member's nullifier
//! hashes.

use agov_core::{bytes_to_hex, tagged_sha256, Commitment};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

const COMMITMENT_TAG: &str = "agov.commitment.v1";

/// A member's private secret and public commitment.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    secret: [u8; 32],
    #[zeroize(skip)]
    commitment: Commitment,
}

impl Identity {
    /// Draw a fresh secret from the OS RNG.
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        let id = Self::from_secret(secret);
        secret.zeroize();
        id
    }

    /// Rebuild an identity from its secret.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let commitment = Commitment::new(bytes_to_hex(&tagged_sha256(COMMITMENT_TAG, &[&secret])));
        Self { secret, commitment }
    }

    /// Rebuild an identity from a 64-char hex secret.
    pub fn from_secret_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = agov_core::hex_to_32bytes(hex)?;
        Ok(Self::from_secret(bytes))
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    /// The raw secret. Only nullifier derivation and export should read it.
    pub fn secret(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Hex export of the secret, for handing an identity back to its owner.
    pub fn secret_hex(&self) -> String {
        bytes_to_hex(&self.secret)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("secret", &"[REDACTED]")
            .field("commitment", &self.commitment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agov_core::HexError;

    #[test]
    fn commitment_is_deterministic() {
        let a = Identity::from_secret([7u8; 32]);
        let b = Identity::from_secret([7u8; 32]);
        assert_eq!(a.commitment(), b.commitment());
        assert_eq!(a.commitment().as_str().len(), 64);
    }

    #[test]
    fn different_secrets_different_commitments() {
        let a = Identity::from_secret([1u8; 32]);
        let b = Identity::from_secret([2u8; 32]);
        assert_ne!(a.commitment(), b.commitment());
    }

    #[test]
    fn commitment_does_not_contain_secret() {
        let id = Identity::from_secret([0xab; 32]);
        assert_ne!(id.commitment().as_str(), id.secret_hex());
    }

    #[test]
    fn hex_roundtrip() {
        let id = Identity::generate();
        let restored = Identity::from_secret_hex(&id.secret_hex()).unwrap();
        assert_eq!(id.commitment(), restored.commitment());
    }

    #[test]
    fn bad_hex_is_an_invalid_secret() {
        assert!(matches!(
            Identity::from_secret_hex("1234"),
            Err(CryptoError::InvalidSecret(HexError::Length { actual: 4, .. }))
        ));
        assert!(matches!(
            Identity::from_secret_hex(&"g0".repeat(32)),
            Err(CryptoError::InvalidSecret(HexError::InvalidDigit { position: 0 }))
        ));
    }

    #[test]
    fn debug_redacts_secret() {
        let id = Identity::from_secret([0x5a; 32]);
        let dbg = format!("{id:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains(&id.secret_hex()));
    }
}
