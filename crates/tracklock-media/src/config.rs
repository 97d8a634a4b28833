//! Configuration for the selection tracking pipeline.

use serde::{Deserialize, Serialize};
use tracklock_models::{Extent, ReleasePolicy, TrackLossPolicy, TrackerVariant};

/// Default processing frame size (portrait, after rotation).
pub const DEFAULT_FRAME_EXTENT: Extent = Extent::new(240, 320);

/// Configuration for the selection tracking pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    // === Tracker ===
    /// Algorithm backing the tracker adapter for the next lock cycle (default: KCF)
    pub tracker_variant: TrackerVariant,

    // === Policies ===
    /// What a release does to an unlocked selection (default: discard)
    pub release_policy: ReleasePolicy,

    /// What a lost target does to the lock (default: keep last known box)
    pub loss_policy: TrackLossPolicy,

    // === Frame Preparation ===
    /// Size every decoded frame is resized to before tracking (default: 240x320)
    pub frame_extent: Extent,

    /// Rotate decoded frames 90 degrees clockwise, for landscape sensors
    /// feeding a portrait preview (default: true)
    pub rotate_frames: bool,

    // === Template Matcher Fallback ===
    /// Search margin around the last box as a fraction of box size (default: 0.5)
    pub search_margin: f64,

    /// Minimum normalized cross-correlation to accept a match (default: 0.5)
    pub min_match_score: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracker_variant: TrackerVariant::Kcf,

            release_policy: ReleasePolicy::Discard,
            loss_policy: TrackLossPolicy::KeepLastKnown,

            frame_extent: DEFAULT_FRAME_EXTENT,
            rotate_frames: true,

            search_margin: 0.5,
            min_match_score: 0.5,
        }
    }
}

impl TrackingConfig {
    /// Fast configuration: MOSSE with a tight search window.
    pub fn responsive() -> Self {
        Self {
            tracker_variant: TrackerVariant::Mosse,
            search_margin: 0.3,
            ..Default::default()
        }
    }

    /// Robust configuration: CSRT, wide search, unlock on loss.
    pub fn robust() -> Self {
        Self {
            tracker_variant: TrackerVariant::Csrt,
            loss_policy: TrackLossPolicy::RevertToIdle,
            search_margin: 1.0,
            min_match_score: 0.6,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackingConfig::default();
        assert_eq!(config.tracker_variant, TrackerVariant::Kcf);
        assert_eq!(config.frame_extent, Extent::new(240, 320));
        assert!(config.rotate_frames);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{"tracker_variant":"csrt","loss_policy":"revert_to_idle"}"#)
                .unwrap();
        assert_eq!(config.tracker_variant, TrackerVariant::Csrt);
        assert_eq!(config.loss_policy, TrackLossPolicy::RevertToIdle);
        assert_eq!(config.release_policy, ReleasePolicy::Discard);
        assert_eq!(config.frame_extent, DEFAULT_FRAME_EXTENT);
    }

    #[test]
    fn test_presets() {
        assert_eq!(TrackingConfig::responsive().tracker_variant, TrackerVariant::Mosse);
        assert_eq!(TrackingConfig::robust().loss_policy, TrackLossPolicy::RevertToIdle);
    }
}
