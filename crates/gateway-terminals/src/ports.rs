//! Repository port for terminals and keys.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gateway_types::{StoreError, Terminal, TerminalKey};

/// Terminal/key repository.
///
/// Any transactional store with uniqueness constraints on `terminal_id` and
/// key `value` can sit behind this trait. `rotate_key` is the one compound
/// operation: saving the new key, retiring the old one and re-pointing the
/// terminal must be all-or-nothing.
#[async_trait]
pub trait TerminalStore: Send + Sync {
    /// Look up a terminal by TID.
    async fn find_terminal(&self, terminal_id: &str) -> Result<Option<Terminal>, StoreError>;

    /// Insert or update a terminal; assigns the surrogate id on first save.
    async fn save_terminal(&self, terminal: Terminal) -> Result<Terminal, StoreError>;

    /// Whether a terminal with this TID exists.
    async fn exists_terminal(&self, terminal_id: &str) -> Result<bool, StoreError>;

    /// Look up a key by surrogate id.
    async fn find_key(&self, key_id: u64) -> Result<Option<TerminalKey>, StoreError>;

    /// Insert or update a key; assigns the surrogate id on first save.
    async fn save_key(&self, key: TerminalKey) -> Result<TerminalKey, StoreError>;

    /// Whether any stored key carries this value.
    async fn exists_key_value(&self, value: &str) -> Result<bool, StoreError>;

    /// Total number of registered terminals.
    async fn count_terminals(&self) -> Result<usize, StoreError>;

    /// Terminals in the `Active` state.
    async fn active_terminals(&self) -> Result<Vec<Terminal>, StoreError>;

    /// Terminals that have never been assigned a key.
    async fn terminals_without_keys(&self) -> Result<Vec<Terminal>, StoreError>;

    /// Terminals whose current key is expired at `now`.
    async fn terminals_with_expired_keys(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Terminal>, StoreError>;

    /// Active keys expiring within `window` of `now`.
    async fn keys_expiring_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<TerminalKey>, StoreError>;

    /// Atomically install `new_key` as the terminal's current key.
    ///
    /// Saves the key, transitions the previous key (if any) to `Inactive`
    /// with an audit note, re-points the terminal and bumps its key-change
    /// counters. Returns the updated terminal and the saved key.
    async fn rotate_key(
        &self,
        terminal_id: &str,
        new_key: TerminalKey,
    ) -> Result<(Terminal, TerminalKey), StoreError>;
}
