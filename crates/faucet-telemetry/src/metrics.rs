//! Prometheus metrics for the faucet bot.
//!
//! All metrics follow the naming convention: `faucet_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Faucet requests by outcome
    pub static ref FAUCET_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("faucet_requests_total", "Faucet requests handled"),
        &["outcome"]  // outcome: dispensed/invalid_address/already_claimed/...
    ).expect("metric creation failed");

    /// Total amount bonded by the faucet
    pub static ref FAUCET_DISPENSED_NANOPAC: Counter = Counter::new(
        "faucet_dispensed_nanopac_total",
        "Total NanoPAC bonded by the faucet"
    ).expect("metric creation failed");

    /// Claims whose record could not be written after funds were sent
    pub static ref STORE_WRITE_FAILURES: Counter = Counter::new(
        "faucet_store_write_failures_total",
        "Dispensed claims that could not be recorded"
    ).expect("metric creation failed");

    /// Last chain height observed by the status task
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "faucet_chain_height",
        "Last observed blockchain height"
    ).expect("metric creation failed");
}

/// Handle to the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(FAUCET_REQUESTS.clone()),
        Box::new(FAUCET_DISPENSED_NANOPAC.clone()),
        Box::new(STORE_WRITE_FAILURES.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Count one handled faucet request.
pub fn record_request(outcome: &str) {
    FAUCET_REQUESTS.with_label_values(&[outcome]).inc();
}

/// Count a successful bond of `nanopac`.
pub fn record_dispense(nanopac: u64) {
    FAUCET_DISPENSED_NANOPAC.inc_by(nanopac as f64);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // May fail if another test registered first, which is fine
        let _ = register_metrics();
    }

    #[test]
    fn test_request_counter() {
        let before = FAUCET_REQUESTS.with_label_values(&["test_outcome"]).get();
        record_request("test_outcome");
        assert_eq!(
            FAUCET_REQUESTS.with_label_values(&["test_outcome"]).get(),
            before + 1.0
        );
    }

    #[test]
    fn test_dispense_counter() {
        let before = FAUCET_DISPENSED_NANOPAC.get();
        record_dispense(5_000_000_000);
        assert!(FAUCET_DISPENSED_NANOPAC.get() >= before + 5_000_000_000.0);
    }

    #[test]
    fn test_gauge_set() {
        CHAIN_HEIGHT.set(42.0);
        assert_eq!(CHAIN_HEIGHT.get(), 42.0);
    }
}
