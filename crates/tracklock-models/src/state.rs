//! Tracking state and overlay draw styles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Selection / tracking lifecycle.
///
/// ```text
/// Idle ──SelectStart──▶ Drawing ──SelectEnd──▶ Idle
///   │                     │
///   └────ToggleLock───────┴──▶ LockedInitializing ──init ok──▶ LockedTracking
///                                    │                              │
///                                    └──────────ToggleLock──────────┴──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// No selection in progress and no lock held
    #[default]
    Idle,
    /// User is dragging out a selection
    Drawing,
    /// Lock held; tracker will be seeded on the next frame
    LockedInitializing,
    /// Lock held; tracker is updated every frame
    LockedTracking,
}

impl TrackingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingState::Idle => "idle",
            TrackingState::Drawing => "drawing",
            TrackingState::LockedInitializing => "locked_initializing",
            TrackingState::LockedTracking => "locked_tracking",
        }
    }

    /// Whether a target lock is held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            TrackingState::LockedInitializing | TrackingState::LockedTracking
        )
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the overlay should render the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DrawStyle {
    /// Nothing drawn
    #[default]
    Hidden,
    /// Box outline only
    Outline,
    /// Box outline plus full-surface crosshair through the box center
    Crosshair,
}
