//! # Faucet Telemetry
//!
//! Observability for the faucet bot.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an env filter, pretty or JSON output
//! - **Metrics**: Prometheus counters for faucet outcomes and chain height
//!
//! ## Usage
//!
//! ```rust,ignore
//! use faucet_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     tracing::info!("bot starting");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FAUCET_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `FAUCET_JSON_LOGS` | `false` | Emit JSON formatted logs |
//! | `FAUCET_SERVICE_NAME` | `faucet-bot` | Service name attached to startup logs |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, record_dispense, record_request, register_metrics, MetricsHandle, CHAIN_HEIGHT,
    FAUCET_DISPENSED_NANOPAC, FAUCET_REQUESTS, STORE_WRITE_FAILURES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A Prometheus collector could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "faucet-bot");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_error_messages() {
        let err = TelemetryError::MetricsInit("duplicate".to_string());
        assert!(err.to_string().contains("duplicate"));
    }
}
