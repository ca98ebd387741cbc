//! In-memory repository adapter.
//!
//! All state lives behind a single `parking_lot::RwLock`, which is what
//! makes `rotate_key` atomic: the write guard spans the whole rotation, so
//! readers observe either the pre- or the post-rotation state.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gateway_types::{StoreError, Terminal, TerminalKey};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::ports::TerminalStore;

#[derive(Default)]
struct Inner {
    terminals: HashMap<String, Terminal>,
    keys: HashMap<u64, TerminalKey>,
    key_values: HashSet<String>,
    next_terminal_id: u64,
    next_key_id: u64,
}

impl Inner {
    fn save_key_locked(&mut self, mut key: TerminalKey) -> Result<TerminalKey, StoreError> {
        if key.key_id == 0 {
            if self.key_values.contains(&key.value) {
                return Err(StoreError::DuplicateKeyValue);
            }
            self.next_key_id += 1;
            key.key_id = self.next_key_id;
            self.key_values.insert(key.value.clone());
        } else if !self.keys.contains_key(&key.key_id) {
            return Err(StoreError::KeyNotFound { key_id: key.key_id });
        }
        self.keys.insert(key.key_id, key.clone());
        Ok(key)
    }
}

/// In-process terminal/key store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn current_key_of(inner: &Inner, terminal: &Terminal) -> Option<TerminalKey> {
        terminal
            .current_key_id
            .and_then(|id| inner.keys.get(&id).cloned())
    }
}

#[async_trait]
impl TerminalStore for MemoryStore {
    async fn find_terminal(&self, terminal_id: &str) -> Result<Option<Terminal>, StoreError> {
        Ok(self.inner.read().terminals.get(terminal_id).cloned())
    }

    async fn save_terminal(&self, mut terminal: Terminal) -> Result<Terminal, StoreError> {
        let mut inner = self.inner.write();
        if terminal.id == 0 {
            if inner.terminals.contains_key(&terminal.terminal_id) {
                return Err(StoreError::DuplicateTerminalId {
                    terminal_id: terminal.terminal_id,
                });
            }
            inner.next_terminal_id += 1;
            terminal.id = inner.next_terminal_id;
        }
        inner
            .terminals
            .insert(terminal.terminal_id.clone(), terminal.clone());
        Ok(terminal)
    }

    async fn exists_terminal(&self, terminal_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().terminals.contains_key(terminal_id))
    }

    async fn find_key(&self, key_id: u64) -> Result<Option<TerminalKey>, StoreError> {
        Ok(self.inner.read().keys.get(&key_id).cloned())
    }

    async fn save_key(&self, key: TerminalKey) -> Result<TerminalKey, StoreError> {
        self.inner.write().save_key_locked(key)
    }

    async fn exists_key_value(&self, value: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().key_values.contains(value))
    }

    async fn count_terminals(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().terminals.len())
    }

    async fn active_terminals(&self) -> Result<Vec<Terminal>, StoreError> {
        Ok(self
            .inner
            .read()
            .terminals
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect())
    }

    async fn terminals_without_keys(&self) -> Result<Vec<Terminal>, StoreError> {
        Ok(self
            .inner
            .read()
            .terminals
            .values()
            .filter(|t| t.current_key_id.is_none())
            .cloned()
            .collect())
    }

    async fn terminals_with_expired_keys(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Terminal>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .terminals
            .values()
            .filter(|t| {
                Self::current_key_of(&inner, t).is_some_and(|key| key.is_expired(now))
            })
            .cloned()
            .collect())
    }

    async fn keys_expiring_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<TerminalKey>, StoreError> {
        let horizon = now + window;
        Ok(self
            .inner
            .read()
            .keys
            .values()
            .filter(|k| {
                k.is_active() && k.expiry.is_some_and(|e| e > now && e <= horizon)
            })
            .cloned()
            .collect())
    }

    async fn rotate_key(
        &self,
        terminal_id: &str,
        mut new_key: TerminalKey,
    ) -> Result<(Terminal, TerminalKey), StoreError> {
        let mut inner = self.inner.write();

        let mut terminal = inner
            .terminals
            .get(terminal_id)
            .cloned()
            .ok_or_else(|| StoreError::TerminalNotFound {
                terminal_id: terminal_id.to_string(),
            })?;

        new_key.terminal_id = Some(terminal.terminal_id.clone());
        let saved_key = inner.save_key_locked(new_key)?;

        if let Some(old_id) = terminal.current_key_id {
            if let Some(mut old_key) = inner.keys.get(&old_id).cloned() {
                old_key.deactivate();
                inner.keys.insert(old_id, old_key);
            }
        }

        terminal.record_key_change(saved_key.key_id);
        terminal.touch_activity();
        inner
            .terminals
            .insert(terminal.terminal_id.clone(), terminal.clone());

        Ok((terminal, saved_key))
    }
}
