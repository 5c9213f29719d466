//! # Field-Element Newtypes
//!
//! Public values that travel inside proofs. The proving backend works over
//! a prime field; this layer only ever sees those elements as strings.
//!
//! - [`Commitment`] is opaque: the group stores whatever the member
//!   published and orders it lexicographically.
//! - [`MerkleRoot`], [`ExternalNullifier`], and [`NullifierHash`] are
//!   digests produced by this workspace, 64 lowercase hex characters. The
//!   one exception is a single-member group, whose root is the member's
//!   commitment verbatim.
//!
//! Nullifier hashes key the replay ledger, so they only deserialize from
//! 64 hex digits and always land in lowercase. Two spellings of one field
//! element can never become two ledger entries.

use serde::{Deserialize, Deserializer, Serialize};
use subtle::ConstantTimeEq;

use crate::error::HexError;

/// Length of a hex-rendered 32-byte field element.
pub const FIELD_HEX_LEN: usize = 64;

/// A member's public commitment. Reveals nothing about the secret behind it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(String);

impl Commitment {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! digest_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a hex digest, normalizing to lowercase.
            pub fn from_hex(hex: impl Into<String>) -> Self {
                Self(hex.into().to_ascii_lowercase())
            }

            /// Parse a full 32-byte element (optional `0x` prefix).
            pub fn parse_hex(hex: &str) -> Result<Self, HexError> {
                normalize_field_hex(hex).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Compare without short-circuiting on the first differing byte.
            pub fn ct_matches(&self, other: &Self) -> bool {
                ct_eq(self.0.as_bytes(), other.0.as_bytes())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

digest_newtype!(
    /// Fingerprint of a group's full membership set.
    MerkleRoot
);

digest_newtype!(
    /// Scope-derived value shared by every member acting in that scope.
    ExternalNullifier
);

digest_newtype!(
    /// Per-identity, per-scope single-use token.
    NullifierHash
);

macro_rules! strict_hex_deserialize {
    ($name:ident) => {
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::parse_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

strict_hex_deserialize!(ExternalNullifier);
strict_hex_deserialize!(NullifierHash);

// A single-member root is a commitment, which is opaque.
impl<'de> Deserialize<'de> for MerkleRoot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self)
    }
}

/// Strip an optional `0x`, require exactly [`FIELD_HEX_LEN`] hex digits,
/// and lowercase them.
pub fn normalize_field_hex(hex: &str) -> Result<String, HexError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    if digits.len() != FIELD_HEX_LEN {
        return Err(HexError::Length {
            expected: FIELD_HEX_LEN,
            actual: digits.len(),
        });
    }
    if let Some(position) = digits.bytes().position(|b| !b.is_ascii_hexdigit()) {
        return Err(HexError::InvalidDigit { position });
    }
    Ok(digits.to_ascii_lowercase())
}

impl MerkleRoot {
    /// Root of an empty group.
    pub fn zero() -> Self {
        Self("0".repeat(FIELD_HEX_LEN))
    }

    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }
}

impl From<Commitment> for MerkleRoot {
    /// A single-member group's root is its commitment.
    fn from(c: Commitment) -> Self {
        Self(c.0)
    }
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_root_shape() {
        let z = MerkleRoot::zero();
        assert_eq!(z.as_str().len(), FIELD_HEX_LEN);
        assert!(z.is_zero());
    }

    #[test]
    fn from_hex_lowercases() {
        let n = NullifierHash::from_hex("ABCD");
        assert_eq!(n.as_str(), "abcd");
    }

    #[test]
    fn ct_matches_compares_values() {
        let a = ExternalNullifier::from_hex("aa".repeat(32));
        let b = ExternalNullifier::from_hex("AA".repeat(32));
        let c = ExternalNullifier::from_hex("ab".repeat(32));
        assert!(a.ct_matches(&b));
        assert!(!a.ct_matches(&c));
        assert!(!a.ct_matches(&ExternalNullifier::from_hex("aa")));
    }

    #[test]
    fn commitments_order_lexicographically() {
        let mut v = vec![Commitment::new("b"), Commitment::new("a"), Commitment::new("ab")];
        v.sort();
        let s: Vec<&str> = v.iter().map(Commitment::as_str).collect();
        assert_eq!(s, vec!["a", "ab", "b"]);
    }

    #[test]
    fn serde_is_transparent() {
        let c = Commitment::new("123");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"123\"");
        let r: MerkleRoot = serde_json::from_str("\"00\"").unwrap();
        assert_eq!(r.as_str(), "00");
    }

    #[test]
    fn nullifier_deserializes_to_lowercase() {
        let upper = format!("\"{}\"", "AB".repeat(32));
        let prefixed = format!("\"0x{}\"", "ab".repeat(32));
        let a: NullifierHash = serde_json::from_str(&upper).unwrap();
        let b: NullifierHash = serde_json::from_str(&prefixed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ab".repeat(32));
    }

    #[test]
    fn nullifier_deserialization_requires_full_element() {
        assert!(serde_json::from_str::<NullifierHash>("\"abcd\"").is_err());
        let bad = format!("\"{}\"", "zz".repeat(32));
        assert!(serde_json::from_str::<ExternalNullifier>(&bad).is_err());
    }

    #[test]
    fn normalize_reports_position_of_bad_digit() {
        let hex = format!("{}x{}", "a".repeat(10), "b".repeat(53));
        assert_eq!(
            normalize_field_hex(&hex),
            Err(HexError::InvalidDigit { position: 10 })
        );
    }
}
