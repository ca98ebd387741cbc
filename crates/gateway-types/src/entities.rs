//! # Domain Entities
//!
//! POS terminals and the TDES keys provisioned for them.
//!
//! A terminal is identified by the TID carried in ISO 8583 field 41 and holds
//! at most one active key at a time. Terminal and key never reference each
//! other directly: the terminal stores `current_key_id` as a plain value and
//! the key stores the owning `terminal_id`, so all navigation goes through the
//! repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational state of a POS terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalStatus {
    /// Ready for transactions.
    Active,
    /// Not processing transactions.
    Inactive,
    /// Temporarily disabled.
    Suspended,
    /// Under service.
    Maintenance,
    /// Permanently disabled.
    Decommissioned,
}

impl TerminalStatus {
    /// Short uppercase name as reported in field 53 status responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalStatus::Active => "ACTIVE",
            TerminalStatus::Inactive => "INACTIVE",
            TerminalStatus::Suspended => "SUSPENDED",
            TerminalStatus::Maintenance => "MAINTENANCE",
            TerminalStatus::Decommissioned => "DECOMMISSIONED",
        }
    }
}

/// Lifecycle state of a terminal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    /// Ready for use.
    Active,
    /// Rotated out, kept for audit.
    Inactive,
    /// Past its expiry date.
    Expired,
    /// Security breach, must never be used again.
    Compromised,
    /// Awaiting activation.
    Pending,
}

/// A POS terminal registered with the gateway.
///
/// Created explicitly or auto-registered on first key-change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terminal {
    /// Surrogate identifier assigned by the store (0 until saved).
    pub id: u64,
    /// TID from ISO 8583 field 41. Globally unique, 8..=16 chars.
    pub terminal_id: String,
    /// Merchant ID from field 42, at most 15 chars.
    pub merchant_id: Option<String>,
    /// Free-form display name.
    pub terminal_name: Option<String>,
    /// Operational state.
    pub status: TerminalStatus,
    /// Terminal class, e.g. "POS" or "ATM".
    pub terminal_type: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated: DateTime<Utc>,
    /// Last sign-on or transaction.
    pub last_activity: Option<DateTime<Utc>>,
    /// Last successful key rotation.
    pub last_key_change: Option<DateTime<Utc>>,
    /// Monotonic count of completed key changes.
    pub key_change_count: u32,
    /// Surrogate id of the currently active key, if any.
    pub current_key_id: Option<u64>,
    /// Operator notes.
    pub notes: Option<String>,
}

impl Terminal {
    /// Create a fresh terminal in `Active` state.
    pub fn new(terminal_id: impl Into<String>, merchant_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            terminal_id: terminal_id.into(),
            merchant_id,
            terminal_name: None,
            status: TerminalStatus::Active,
            terminal_type: "POS".to_string(),
            created: now,
            updated: now,
            last_activity: None,
            last_key_change: None,
            key_change_count: 0,
            current_key_id: None,
            notes: None,
        }
    }

    /// Whether the terminal is in the `Active` state.
    pub fn is_active(&self) -> bool {
        self.status == TerminalStatus::Active
    }

    /// Stamp the last-activity timestamp (sign-on, transaction).
    pub fn touch_activity(&mut self) {
        let now = Utc::now();
        self.last_activity = Some(now);
        self.updated = now;
    }

    /// Record a completed key rotation.
    pub fn record_key_change(&mut self, new_key_id: u64) {
        let now = Utc::now();
        self.current_key_id = Some(new_key_id);
        self.key_change_count += 1;
        self.last_key_change = Some(now);
        self.updated = now;
    }

    pub fn activate(&mut self) {
        self.status = TerminalStatus::Active;
        self.updated = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.status = TerminalStatus::Inactive;
        self.updated = Utc::now();
    }

    pub fn suspend(&mut self) {
        self.status = TerminalStatus::Suspended;
        self.updated = Utc::now();
    }

    pub fn decommission(&mut self) {
        self.status = TerminalStatus::Decommissioned;
        self.updated = Utc::now();
    }
}

/// A TDES key provisioned for a terminal.
///
/// `value` is 32 hex chars for a double-length key or 48 for triple-length,
/// and is globally unique across all keys ever stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalKey {
    /// Surrogate identifier assigned by the store (0 until saved).
    pub key_id: u64,
    /// Uppercase hex key material, 32 or 48 chars.
    pub value: String,
    /// Key algorithm, always "TDES" today.
    pub key_type: String,
    /// Lifecycle state.
    pub status: KeyStatus,
    /// Key check value: first 6 hex chars of the TDES-encrypted zero block.
    pub kcv: String,
    /// 2 for double-length, 3 for triple-length.
    pub length: u8,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// Optional expiry.
    pub expiry: Option<DateTime<Utc>>,
    /// Audit notes.
    pub notes: Option<String>,
    /// TID of the owning terminal, if assigned.
    pub terminal_id: Option<String>,
}

impl TerminalKey {
    /// Create an active key from freshly generated material.
    pub fn new(value: impl Into<String>, kcv: impl Into<String>, length: u8) -> Self {
        Self {
            key_id: 0,
            value: value.into(),
            key_type: "TDES".to_string(),
            status: KeyStatus::Active,
            kcv: kcv.into(),
            length,
            created: Utc::now(),
            expiry: None,
            notes: None,
            terminal_id: None,
        }
    }

    /// Whether the key may be used for PIN operations.
    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    /// Expired by status or by wall clock.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == KeyStatus::Expired || self.expiry.is_some_and(|e| e < now)
    }

    /// Rotate the key out of service, appending an audit stamp to its notes.
    pub fn deactivate(&mut self) {
        self.status = KeyStatus::Inactive;
        let stamp = format!("Deactivated on {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
        self.notes = Some(match self.notes.take() {
            Some(existing) => format!("{existing} | {stamp}"),
            None => stamp,
        });
    }

    pub fn expire(&mut self) {
        self.status = KeyStatus::Expired;
    }

    pub fn mark_compromised(&mut self) {
        self.status = KeyStatus::Compromised;
    }

    /// Masked rendering safe for logs: first 4 + "****" + last 4.
    pub fn masked_value(&self) -> String {
        if self.value.len() < 8 {
            return "****".to_string();
        }
        format!(
            "{}****{}",
            &self.value[..4],
            &self.value[self.value.len() - 4..]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_key() -> TerminalKey {
        TerminalKey::new("9E4F7FF1F831F1132CD9B6C740B0134C", "A1B2C3", 2)
    }

    #[test]
    fn test_new_terminal_defaults() {
        let t = Terminal::new("TERM0001", Some("MERCH01".into()));
        assert_eq!(t.status, TerminalStatus::Active);
        assert_eq!(t.terminal_type, "POS");
        assert_eq!(t.key_change_count, 0);
        assert!(t.current_key_id.is_none());
    }

    #[test]
    fn test_record_key_change() {
        let mut t = Terminal::new("TERM0001", None);
        t.record_key_change(7);
        t.record_key_change(8);
        assert_eq!(t.key_change_count, 2);
        assert_eq!(t.current_key_id, Some(8));
        assert!(t.last_key_change.is_some());
    }

    #[test]
    fn test_terminal_status_transitions() {
        let mut t = Terminal::new("TERM0001", None);
        t.suspend();
        assert_eq!(t.status, TerminalStatus::Suspended);
        assert!(!t.is_active());
        t.activate();
        assert!(t.is_active());
        t.decommission();
        assert_eq!(t.status.as_str(), "DECOMMISSIONED");
    }

    #[test]
    fn test_key_deactivate_appends_audit_note() {
        let mut k = create_test_key();
        k.notes = Some("Generated for terminal TERM0001".into());
        k.deactivate();
        assert_eq!(k.status, KeyStatus::Inactive);
        let notes = k.notes.unwrap();
        assert!(notes.starts_with("Generated for terminal TERM0001 | Deactivated on"));
    }

    #[test]
    fn test_key_expiry_by_clock() {
        let mut k = create_test_key();
        let now = Utc::now();
        assert!(!k.is_expired(now));
        k.expiry = Some(now - Duration::days(1));
        assert!(k.is_expired(now));
    }

    #[test]
    fn test_masked_value() {
        let k = create_test_key();
        assert_eq!(k.masked_value(), "9E4F****134C");
        let short = TerminalKey::new("ABCD", "000000", 2);
        assert_eq!(short.masked_value(), "****");
    }
}
