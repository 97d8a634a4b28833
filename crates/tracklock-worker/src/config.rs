//! Worker configuration.

use std::time::Duration;
use tracing::warn;
use tracklock_media::TrackingConfig;
use tracklock_models::{Extent, TrackerVariant};

/// Default delay between captured frames (~30 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pipeline configuration handed to every session
    pub tracking: TrackingConfig,
    /// Capture cadence when the manifest does not set one
    pub frame_interval: Duration,
    /// Install the Prometheus recorder and log a snapshot at shutdown
    pub metrics_enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig::default(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            metrics_enabled: false,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    ///
    /// Unset or unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = TrackingConfig::default();

        let tracker_variant = match lookup("TRACKLOCK_TRACKER") {
            Some(name) => {
                let (variant, known) = TrackerVariant::parse_or_fallback(&name);
                if !known {
                    warn!(
                        name = %name,
                        fallback = %variant,
                        "Unknown tracker name, falling back"
                    );
                }
                variant
            }
            None => defaults.tracker_variant,
        };

        let frame_extent = Extent::new(
            lookup("TRACKLOCK_FRAME_WIDTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_extent.width),
            lookup("TRACKLOCK_FRAME_HEIGHT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_extent.height),
        );

        let tracking = TrackingConfig {
            tracker_variant,
            release_policy: lookup("TRACKLOCK_RELEASE_POLICY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.release_policy),
            loss_policy: lookup("TRACKLOCK_LOSS_POLICY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.loss_policy),
            frame_extent,
            rotate_frames: lookup("TRACKLOCK_ROTATE")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.rotate_frames),
            ..defaults
        };

        Self {
            tracking,
            frame_interval: Duration::from_millis(
                lookup("TRACKLOCK_FRAME_INTERVAL_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_FRAME_INTERVAL.as_millis() as u64),
            ),
            metrics_enabled: lookup("TRACKLOCK_METRICS")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
