//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    // Frame flow
    pub const FRAMES_RECEIVED_TOTAL: &str = "tracklock_frames_received_total";
    pub const FRAMES_DROPPED_TOTAL: &str = "tracklock_frames_dropped_total";
    pub const FRAMES_PROCESSED_TOTAL: &str = "tracklock_frames_processed_total";

    // Lock lifecycle
    pub const LOCK_CYCLES_TOTAL: &str = "tracklock_lock_cycles_total";
    pub const INIT_FAILURES_TOTAL: &str = "tracklock_init_failures_total";
    pub const TRACK_LOSSES_TOTAL: &str = "tracklock_track_losses_total";

    // Tracker timing
    pub const TRACKER_DURATION_SECONDS: &str = "tracklock_tracker_duration_seconds";
}

/// Record a frame handed to the pipeline.
pub fn record_frame_received() {
    counter!(names::FRAMES_RECEIVED_TOTAL).increment(1);
}

/// Record a frame dropped without processing.
pub fn record_frame_dropped(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::FRAMES_DROPPED_TOTAL, &labels).increment(1);
}

/// Record a finished processing cycle.
pub fn record_frame_processed(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::FRAMES_PROCESSED_TOTAL, &labels).increment(1);
}

/// Record a lock cycle start.
pub fn record_lock_cycle(variant: &str) {
    let labels = [("variant", variant.to_string())];
    counter!(names::LOCK_CYCLES_TOTAL, &labels).increment(1);
}

pub fn record_init_failure(variant: &str, kind: &str) {
    let labels = [("variant", variant.to_string()), ("kind", kind.to_string())];
    counter!(names::INIT_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_track_loss(variant: &str) {
    let labels = [("variant", variant.to_string())];
    counter!(names::TRACK_LOSSES_TOTAL, &labels).increment(1);
}

/// Record the duration of one tracker init or update call.
pub fn record_tracker_duration(variant: &str, phase: &str, duration_secs: f64) {
    let labels = [("variant", variant.to_string()), ("phase", phase.to_string())];
    histogram!(names::TRACKER_DURATION_SECONDS, &labels).record(duration_secs);
}
