//! # Gateway Telemetry
//!
//! Structured logging for the gateway, in two parts:
//!
//! - `init_telemetry` wires a `tracing-subscriber` pipeline (EnvFilter +
//!   fmt) behind a guard held for the process lifetime.
//! - [`masking`] applies the field-aware masking policy before any ISO 8583
//!   message content reaches a sink. No message is ever logged unmasked.

#![warn(clippy::all)]

pub mod masking;
mod tracing_setup;

pub use masking::{log_incoming, log_outgoing, masked_fields, MaskedField};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialisation errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber was already installed.
    #[error("tracing subscriber init failed: {0}")]
    SubscriberInit(String),

    /// Bad filter directive.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// EnvFilter directive, e.g. "info" or "gateway_router=debug,info".
    pub log_filter: String,
    /// Emit one-line JSON events instead of human-readable output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: std::env::var("GATEWAY_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: false,
        }
    }
}

/// Initialise the logging pipeline.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    tracing_setup::init_tracing(config)
}
