//! Prometheus recorder and session-level metrics for the worker.

use crate::error::{WorkerError, WorkerResult};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Metric names as constants for consistency.
pub mod names {
    pub const SESSIONS_TOTAL: &str = "tracklock_sessions_total";
    pub const SESSION_DURATION_SECONDS: &str = "tracklock_session_duration_seconds";
    pub const CAPTURE_FAILURES_TOTAL: &str = "tracklock_capture_failures_total";
}

/// Install the Prometheus metrics recorder.
///
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> WorkerResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| WorkerError::config_error(format!("metrics recorder: {}", e)))
}

/// Record a finished session replay.
pub fn record_session(status: &str, duration_secs: f64) {
    let labels = [("status", status.to_string())];
    counter!(names::SESSIONS_TOTAL, &labels).increment(1);
    histogram!(names::SESSION_DURATION_SECONDS).record(duration_secs);
}

/// Record a frame the capture source could not deliver.
pub fn record_capture_failure(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::CAPTURE_FAILURES_TOTAL, &labels).increment(1);
}
