//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Input length is not acceptable for the operation.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// What the operation requires, in hex chars.
        expected: String,
        /// What was supplied.
        actual: usize,
    },

    /// Decoded PIN length is outside 4..=12.
    #[error("decoded PIN length out of range: {length}")]
    PinLengthOutOfRange {
        /// Length read from the PIN block header.
        length: usize,
    },

    /// PIN block failed structural validation.
    #[error("invalid PIN block: {0}")]
    InvalidPinBlock(String),

    /// PAN is unusable for PIN-block derivation.
    #[error("invalid PAN: {0}")]
    InvalidPan(String),

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),
}
