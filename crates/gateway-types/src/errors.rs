//! Store-level error types shared by the repository port and its adapters.

use thiserror::Error;

/// Errors surfaced by the terminal/key store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Terminal not found by TID.
    #[error("terminal not found: {terminal_id}")]
    TerminalNotFound { terminal_id: String },

    /// Key not found by surrogate id.
    #[error("key not found: {key_id}")]
    KeyNotFound { key_id: u64 },

    /// Attempt to register a second terminal with the same TID.
    #[error("duplicate terminal id: {terminal_id}")]
    DuplicateTerminalId { terminal_id: String },

    /// Attempt to store key material that already exists.
    #[error("duplicate key value")]
    DuplicateKeyValue,

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Backend(String),
}
