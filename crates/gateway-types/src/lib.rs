//! # Gateway Types
//!
//! Shared domain types for the ISO 8583 payment gateway.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `entities` | `Terminal` and `TerminalKey` with their lifecycle state machines |
//! | `config` | Full gateway configuration tree with serde defaults and validation |
//! | `errors` | Store-level error types shared by repository ports and adapters |

#![warn(clippy::all)]

pub mod config;
pub mod entities;
pub mod errors;

pub use config::{
    BankConfig, CardSecurityConfig, ConfigError, GatewayConfig, PinSecurityConfig, PosConfig,
    RetryConfig, RouterConfig, SecurityConfig, TerminalConfig,
};
pub use entities::{KeyStatus, Terminal, TerminalKey, TerminalStatus};
pub use errors::StoreError;
