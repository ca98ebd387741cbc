//! Codec error types.
//!
//! Unpacking stops at the first protocol-fatal error; a partially decoded
//! message is never returned.

use thiserror::Error;

/// ISO 8583 pack/unpack errors.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Ran out of bytes mid-message.
    #[error("message truncated at offset {offset}: need {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    /// MTI is not 4 ASCII digits.
    #[error("invalid MTI: {0}")]
    Mti(String),

    /// Bitmap could not be read.
    #[error("invalid bitmap: {0}")]
    Bitmap(String),

    /// The bitmap references a field the dictionary does not define.
    #[error("field {number} not defined by dictionary")]
    UnknownField { number: u8 },

    /// A field failed to encode or decode.
    #[error("field {number}: {reason}")]
    Field { number: u8, reason: String },
}

impl CodecError {
    /// Helper for field-scoped errors.
    pub fn field(number: u8, reason: impl Into<String>) -> Self {
        CodecError::Field {
            number,
            reason: reason.into(),
        }
    }
}
