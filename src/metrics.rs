//! Prometheus metrics.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one-liners.
//! Without an installed recorder (unit tests) every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the Prometheus recorder once per process and return its handle.
///
/// Returns `None` when another recorder already owns the global slot.
pub fn init() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Prometheus recorder not installed: {}", e);
                None
            }
        })
        .clone()
}

/// Count an HTTP request by endpoint and status code.
pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "streamflow_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record request latency for an endpoint.
pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("streamflow_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Count an ad lifecycle event: impression, skipped, clicked, completed, failed.
pub fn record_ad_event(event: &'static str) {
    counter!("streamflow_ad_events_total", "event" => event).increment(1);
}

/// Count schedule merges that produced configuration warnings.
pub fn record_schedule_warnings(count: usize) {
    if count > 0 {
        counter!("streamflow_schedule_warnings_total").increment(count as u64);
    }
}

pub fn set_active_sessions(count: usize) {
    gauge!("streamflow_active_sessions").set(count as f64);
}
