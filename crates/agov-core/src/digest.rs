//! # Digests — Domain-Separated SHA-256
//!
//! Every one-way value in the protocol (commitments, external nullifiers,
//! nullifier hashes, Merkle nodes, signal hashes) is a SHA-256 digest under
//! a distinct domain tag, rendered as 64 lowercase hex characters.
//!
//! ## Encoding
//!
//! `tagged_sha256(tag, parts)` hashes
//! `u32_be(len(tag)) || tag || (u64_be(len(part)) || part)*`.
//! Length prefixes keep `("ab", "c")` and `("a", "bc")` apart, and the tag
//! keeps a nullifier from ever colliding with a Merkle node over the same
//! bytes.

use sha2::{Digest, Sha256};

use crate::error::HexError;
use crate::field::normalize_field_hex;

/// Incremental SHA-256 for composite inputs.
#[derive(Debug, Clone, Default)]
pub struct Sha256Accumulator {
    hasher: Sha256,
}

impl Sha256Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb raw bytes.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self
    }

    /// Absorb a length-prefixed field.
    pub fn update_field(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update((data.len() as u64).to_be_bytes());
        self.hasher.update(data);
        self
    }

    pub fn finalize(self) -> [u8; 32] {
        let hash = self.hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        out
    }

    pub fn finalize_hex(self) -> String {
        bytes_to_hex(&self.finalize())
    }
}

/// Domain-separated SHA-256 over length-prefixed parts.
pub fn tagged_sha256(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut acc = Sha256Accumulator::new();
    acc.update(&(tag.len() as u32).to_be_bytes());
    acc.update(tag.as_bytes());
    for part in parts {
        acc.update_field(part);
    }
    acc.finalize()
}

/// Encode 32 bytes as lowercase hex.
pub fn bytes_to_hex(b: &[u8; 32]) -> String {
    b.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Decode a 64-char hex string (optional `0x` prefix) to 32 bytes.
pub fn hex_to_32bytes(hex: &str) -> Result<[u8; 32], HexError> {
    let hex = normalize_field_hex(hex.trim())?;
    let mut out = [0u8; 32];
    for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
        out[i] = (nibble(pair[0]) << 4) | nibble(pair[1]);
    }
    Ok(out)
}

// Input is already validated lowercase hex.
fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        _ => c - b'a' + 10,
    }
}
