//! tracing-subscriber pipeline setup.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::EnvFilter;

/// Guard that keeps the subscriber installed. Drop at process exit.
pub struct TracingGuard {
    _private: (),
}

/// Install the global subscriber: EnvFilter + fmt (optionally JSON).
pub fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let filter =
        EnvFilter::try_new(&config.log_filter).map_err(|e| TelemetryError::InvalidFilter {
            filter: config.log_filter.clone(),
            reason: e.to_string(),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::debug!(
        filter = %config.log_filter,
        json = config.json_logs,
        "telemetry initialised"
    );
    Ok(TracingGuard { _private: () })
}
