//! Terminal management and the key-change protocol.
//!
//! A key-change request (MTI 0800, processing code 900000) lands here after
//! routing. Unknown terminals are auto-registered when enabled; a fresh TDES
//! key is generated from the OS CSPRNG, checked for global uniqueness and
//! installed atomically, deactivating the previous key.

use chrono::{Duration, Utc};
use gateway_crypto::tdes;
use gateway_types::{StoreError, Terminal, TerminalConfig, TerminalKey};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ports::TerminalStore;

/// How many times key generation retries on a value collision.
const MAX_KEY_GENERATION_ATTEMPTS: u32 = 10;

/// Outcome of a key-change request.
#[derive(Debug, Clone)]
pub struct KeyChangeResult {
    /// Whether the rotation completed.
    pub success: bool,
    /// Operator-facing narration.
    pub message: String,
    /// Updated terminal on success.
    pub terminal: Option<Terminal>,
    /// Newly installed key on success. Carries the raw value; callers must
    /// only ever surface `key_id` and the masked value.
    pub key: Option<TerminalKey>,
}

impl KeyChangeResult {
    fn success(terminal: Terminal, key: TerminalKey) -> Self {
        Self {
            success: true,
            message: "key change completed".to_string(),
            terminal: Some(terminal),
            key: Some(key),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            terminal: None,
            key: None,
        }
    }
}

/// Condensed terminal state for field-53 status responses.
#[derive(Debug, Clone)]
pub struct TerminalStatusInfo {
    pub status: &'static str,
    pub has_valid_key: bool,
    pub key_change_count: u32,
}

/// Counts of terminals and keys by state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalStatistics {
    pub total_terminals: usize,
    pub active_terminals: usize,
    pub terminals_without_keys: usize,
    pub terminals_with_expired_keys: usize,
    pub keys_expiring_soon: usize,
}

/// Terminal registration, activity tracking and key rotation.
pub struct TerminalService {
    store: Arc<dyn TerminalStore>,
    config: TerminalConfig,
}

impl TerminalService {
    /// Build the service over a store and the terminal configuration
    /// snapshot.
    pub fn new(store: Arc<dyn TerminalStore>, config: TerminalConfig) -> Self {
        Self { store, config }
    }

    /// Run the key-change protocol for a terminal.
    pub async fn process_key_change(
        &self,
        terminal_id: &str,
        merchant_id: Option<&str>,
    ) -> KeyChangeResult {
        let terminal_id = terminal_id.trim();
        if terminal_id.is_empty() {
            return KeyChangeResult::failure("invalid terminal id");
        }
        if terminal_id.len() < 8 || terminal_id.len() > 16 {
            return KeyChangeResult::failure(format!(
                "terminal id must be 8-16 characters, got {}",
                terminal_id.len()
            ));
        }

        let terminal = match self.find_or_create(terminal_id, merchant_id).await {
            Ok(Some(terminal)) => terminal,
            Ok(None) => {
                warn!(terminal_id, "key change for unknown terminal, auto-create disabled");
                return KeyChangeResult::failure("terminal not found and auto-create disabled");
            }
            Err(e) => {
                error!(terminal_id, error = %e, "store failure during key change");
                return KeyChangeResult::failure(format!("store failure: {e}"));
            }
        };

        let new_key = match self.generate_unique_key(&terminal).await {
            Ok(key) => key,
            Err(message) => {
                error!(terminal_id, %message, "key generation failed");
                return KeyChangeResult::failure(message);
            }
        };

        match self.store.rotate_key(terminal_id, new_key).await {
            Ok((terminal, key)) => {
                info!(
                    terminal_id,
                    key_id = key.key_id,
                    kcv = %key.kcv,
                    masked = %key.masked_value(),
                    change_count = terminal.key_change_count,
                    "key change completed"
                );
                KeyChangeResult::success(terminal, key)
            }
            Err(e) => {
                error!(terminal_id, error = %e, "key rotation failed");
                KeyChangeResult::failure(format!("key rotation failed: {e}"))
            }
        }
    }

    async fn find_or_create(
        &self,
        terminal_id: &str,
        merchant_id: Option<&str>,
    ) -> Result<Option<Terminal>, StoreError> {
        if let Some(mut terminal) = self.store.find_terminal(terminal_id).await? {
            // Merchant may move between requests; keep the latest.
            if let Some(merchant) = merchant_id {
                if terminal.merchant_id.as_deref() != Some(merchant) {
                    info!(terminal_id, merchant_id = merchant, "updating merchant id");
                    terminal.merchant_id = Some(merchant.to_string());
                }
            }
            terminal.touch_activity();
            return self.store.save_terminal(terminal).await.map(Some);
        }

        if !self.config.auto_create {
            return Ok(None);
        }

        let mut terminal = Terminal::new(terminal_id, merchant_id.map(str::to_string));
        terminal.terminal_name = Some("Auto-created Terminal".to_string());
        terminal.notes = Some("Automatically created during key change request".to_string());
        let terminal = self.store.save_terminal(terminal).await?;
        info!(terminal_id, id = terminal.id, "auto-created terminal");
        Ok(Some(terminal))
    }

    async fn generate_unique_key(&self, terminal: &Terminal) -> Result<TerminalKey, String> {
        let length = self.config.key_length;
        let mut value = None;
        for _ in 0..MAX_KEY_GENERATION_ATTEMPTS {
            let candidate =
                tdes::generate_key(length).map_err(|e| format!("key generation failed: {e}"))?;
            match self.store.exists_key_value(&candidate).await {
                Ok(false) => {
                    value = Some(candidate);
                    break;
                }
                Ok(true) => continue,
                Err(e) => return Err(format!("store failure: {e}")),
            }
        }
        let value = value.ok_or_else(|| {
            format!("unable to generate unique key after {MAX_KEY_GENERATION_ATTEMPTS} attempts")
        })?;

        let kcv = tdes::kcv(&value).map_err(|e| format!("kcv computation failed: {e}"))?;
        let mut key = TerminalKey::new(value, kcv, length);
        if self.config.key_expiry_days > 0 {
            key.expiry = Some(Utc::now() + Duration::days(self.config.key_expiry_days as i64));
        }
        key.notes = Some(format!(
            "Generated for terminal {} - key change #{}",
            terminal.terminal_id,
            terminal.key_change_count + 1
        ));
        Ok(key)
    }

    /// Look up a terminal by TID.
    pub async fn get_terminal(&self, terminal_id: &str) -> Result<Option<Terminal>, StoreError> {
        self.store.find_terminal(terminal_id).await
    }

    /// Condensed state for a field-53 status response.
    pub async fn terminal_status(
        &self,
        terminal_id: &str,
    ) -> Result<Option<TerminalStatusInfo>, StoreError> {
        let Some(terminal) = self.store.find_terminal(terminal_id).await? else {
            return Ok(None);
        };
        let has_valid_key = match terminal.current_key_id {
            Some(key_id) => self
                .store
                .find_key(key_id)
                .await?
                .is_some_and(|key| key.is_active() && !key.is_expired(Utc::now())),
            None => false,
        };
        Ok(Some(TerminalStatusInfo {
            status: terminal.status.as_str(),
            has_valid_key,
            key_change_count: terminal.key_change_count,
        }))
    }

    /// The terminal's active, unexpired key value for PIN operations.
    ///
    /// Returns `None` when the terminal is unknown or has no usable key;
    /// callers fall back to the configured default terminal key.
    pub async fn active_key_value(
        &self,
        terminal_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let Some(terminal) = self.store.find_terminal(terminal_id).await? else {
            return Ok(None);
        };
        let Some(key_id) = terminal.current_key_id else {
            return Ok(None);
        };
        Ok(self
            .store
            .find_key(key_id)
            .await?
            .filter(|key| key.is_active() && !key.is_expired(Utc::now()))
            .map(|key| key.value))
    }

    /// Stamp sign-on / transaction activity. Unknown terminals are ignored.
    pub async fn update_activity(&self, terminal_id: &str) -> Result<bool, StoreError> {
        match self.store.find_terminal(terminal_id).await? {
            Some(mut terminal) => {
                terminal.touch_activity();
                self.store.save_terminal(terminal).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Take a terminal out of service, retiring its key with it.
    pub async fn deactivate_terminal(&self, terminal_id: &str) -> Result<bool, StoreError> {
        let Some(mut terminal) = self.store.find_terminal(terminal_id).await? else {
            return Ok(false);
        };
        terminal.deactivate();
        if let Some(key_id) = terminal.current_key_id {
            if let Some(mut key) = self.store.find_key(key_id).await? {
                key.deactivate();
                self.store.save_key(key).await?;
            }
        }
        self.store.save_terminal(terminal).await?;
        info!(terminal_id, "terminal deactivated");
        Ok(true)
    }

    /// Fleet roll-up for operations.
    pub async fn statistics(&self) -> Result<TerminalStatistics, StoreError> {
        let now = Utc::now();
        let active = self.store.active_terminals().await?;
        let without_keys = self.store.terminals_without_keys().await?;
        let expired = self.store.terminals_with_expired_keys(now).await?;
        let expiring = self
            .store
            .keys_expiring_within(now, Duration::days(30))
            .await?;
        Ok(TerminalStatistics {
            total_terminals: self.store.count_terminals().await?,
            active_terminals: active.len(),
            terminals_without_keys: without_keys.len(),
            terminals_with_expired_keys: expired.len(),
            keys_expiring_soon: expiring.len(),
        })
    }
}
