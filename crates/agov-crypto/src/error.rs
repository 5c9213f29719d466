use agov_core::HexError;
use thiserror::Error;

/// Error in identity handling.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The secret is not 32 bytes of hex.
    #[error("invalid identity secret: {0}")]
    InvalidSecret(#[from] HexError),
}
