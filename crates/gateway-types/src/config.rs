//! Gateway configuration with validation.
//!
//! The configuration is a snapshot captured at startup and passed explicitly
//! to the components that need it; nothing here mutates after boot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// POS-facing listener configuration.
    pub pos: PosConfig,
    /// Bank-facing client configuration.
    pub bank: BankConfig,
    /// PIN and card security configuration.
    pub security: SecurityConfig,
    /// Terminal registration and key lifecycle configuration.
    pub terminal: TerminalConfig,
    /// Transaction router configuration.
    pub router: RouterConfig,
}

impl GatewayConfig {
    /// Validate the snapshot before wiring components.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pos.port == self.bank.port {
            return Err(ConfigError::DuplicatePorts);
        }
        if self.bank.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts cannot be 0".into(),
            ));
        }
        if self.bank.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "bank timeout cannot be 0".into(),
            ));
        }
        if !matches!(self.terminal.key_length, 2 | 3) {
            return Err(ConfigError::InvalidKeyLength {
                length: self.terminal.key_length,
            });
        }
        for (name, key) in std::iter::once(("gateway_zonal_key", &self.security.gateway_zonal_key))
            .chain(std::iter::once((
                "default_terminal_key",
                &self.security.default_terminal_key,
            )))
            .chain(std::iter::once((
                "default_bank_key",
                &self.security.default_bank_key,
            )))
        {
            if !is_tdes_key_hex(key) {
                return Err(ConfigError::InvalidKey { name: name.into() });
            }
        }
        for key in self.security.bank_keys.values() {
            if !is_tdes_key_hex(key) {
                return Err(ConfigError::InvalidKey {
                    name: "bank_keys entry".into(),
                });
            }
        }
        Ok(())
    }

    /// Load a snapshot from a JSON file, falling back to defaults for any
    /// section the file omits.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn is_tdes_key_hex(key: &str) -> bool {
    (key.len() == 32 || key.len() == 48) && key.chars().all(|c| c.is_ascii_hexdigit())
}

/// POS listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosConfig {
    /// Listening port (default: 8000).
    pub port: u16,
    /// Bind host.
    pub host: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Bank client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Upstream host.
    pub host: String,
    /// Upstream port (default: 8001).
    pub port: u16,
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u32,
    /// Reserved for future pooling; only one connection is used today.
    pub max_connections: u16,
    /// Connection retry policy.
    pub retry: RetryConfig,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: 8001,
            timeout_ms: 30_000,
            max_connections: 5,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy for the bank connection.
///
/// Applies to connection failures only, never to logical declines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u16,
    pub delay_ms: u32,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

/// PIN and card security configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Zone master key under which PIN blocks live inside the gateway.
    pub gateway_zonal_key: String,
    /// Key assumed for terminals that have not completed a key change.
    pub default_terminal_key: String,
    /// Key used for banks with no entry in `bank_keys`.
    pub default_bank_key: String,
    /// Per-bank PIN keys, looked up by merchant-id prefix routing.
    pub bank_keys: HashMap<String, String>,
    pub pin: PinSecurityConfig,
    pub card: CardSecurityConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let mut bank_keys = HashMap::new();
        bank_keys.insert(
            "BANK001".to_string(),
            "1234567890ABCDEF1234567890ABCDEF".to_string(),
        );
        bank_keys.insert(
            "BANK002".to_string(),
            "FEDCBA0987654321FEDCBA0987654321".to_string(),
        );
        Self {
            gateway_zonal_key: "40763BB5B0B910B5CE3297E58967CD2A".to_string(),
            default_terminal_key: "9E4F7FF1F831F1132CD9B6C740B0134C".to_string(),
            default_bank_key: "ABCDEF1234567890ABCDEF1234567890".to_string(),
            bank_keys,
            pin: PinSecurityConfig::default(),
            card: CardSecurityConfig::default(),
        }
    }
}

/// PIN processing switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinSecurityConfig {
    /// Re-encrypt field 52 between key zones.
    pub enable_transposition: bool,
}

impl Default for PinSecurityConfig {
    fn default() -> Self {
        Self {
            enable_transposition: true,
        }
    }
}

/// Card validation switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardSecurityConfig {
    /// Run Luhn + brand detection on field 2.
    pub enable_validation: bool,
    /// Decline (code 14) when validation fails.
    pub reject_invalid: bool,
}

impl Default for CardSecurityConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            reject_invalid: true,
        }
    }
}

/// Terminal registration and key lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Register unknown terminals on their first key-change request.
    pub auto_create: bool,
    /// Allow the MTI 0800 / 900000 key-change flow at all.
    pub enable_key_change: bool,
    /// 2 for double-length TDES, 3 for triple-length.
    pub key_length: u8,
    /// Days until a freshly generated key expires; 0 disables expiry.
    pub key_expiry_days: u32,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            auto_create: true,
            enable_key_change: true,
            key_length: 2,
            key_expiry_days: 365,
        }
    }
}

/// Transaction router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Window in which an identical (STAN, local date) pair counts as a
    /// duplicate transmission.
    pub duplicate_window_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: 300,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// POS and bank legs configured on the same port.
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid retry policy.
    #[error("invalid retry policy: {0}")]
    InvalidRetry(String),
    /// Invalid timeout value.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Key length outside {2, 3}.
    #[error("invalid key length: {length} (must be 2 or 3)")]
    InvalidKeyLength { length: u8 },
    /// A configured key is not 32/48 hex chars.
    #[error("invalid key material for {name}")]
    InvalidKey { name: String },
    /// Config file could not be read.
    #[error("config read error: {0}")]
    Io(String),
    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pos.port, 8000);
        assert_eq!(config.bank.port, 8001);
        assert_eq!(config.bank.timeout_ms, 30_000);
        assert_eq!(config.terminal.key_expiry_days, 365);
    }

    #[test]
    fn test_duplicate_ports_rejected() {
        let mut config = GatewayConfig::default();
        config.bank.port = config.pos.port;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePorts)
        ));
    }

    #[test]
    fn test_bad_zonal_key_rejected() {
        let mut config = GatewayConfig::default();
        config.security.gateway_zonal_key = "NOTHEX".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidKey { .. })));
    }

    #[test]
    fn test_key_length_bounds() {
        let mut config = GatewayConfig::default();
        config.terminal.key_length = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidKeyLength { length: 4 })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{ "pos": { "port": 9100 } }"#).unwrap();
        assert_eq!(config.pos.port, 9100);
        assert_eq!(config.bank.retry.max_attempts, 3);
        assert!(config.security.pin.enable_transposition);
    }
}
