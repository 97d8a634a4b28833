//! Behavior policies for the two ambiguous cases of the selection flow.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What happens to the drawn box when the finger lifts while unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Clear the box; a selection must be locked before release to commit it
    #[default]
    Discard,
    /// Keep the box so a later lock toggle can commit it
    Keep,
}

/// What happens when the tracker reports the target lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackLossPolicy {
    /// Keep the last known box and retry on the next frame
    #[default]
    KeepLastKnown,
    /// Drop the lock and tracker, returning to idle
    RevertToIdle,
}

impl fmt::Display for ReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleasePolicy::Discard => write!(f, "discard"),
            ReleasePolicy::Keep => write!(f, "keep"),
        }
    }
}

impl fmt::Display for TrackLossPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackLossPolicy::KeepLastKnown => write!(f, "keep_last_known"),
            TrackLossPolicy::RevertToIdle => write!(f, "revert_to_idle"),
        }
    }
}

impl FromStr for ReleasePolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "discard" | "clear" => Ok(ReleasePolicy::Discard),
            "keep" => Ok(ReleasePolicy::Keep),
            _ => Err(PolicyParseError(s.to_string())),
        }
    }
}

impl FromStr for TrackLossPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep_last_known" | "keep" => Ok(TrackLossPolicy::KeepLastKnown),
            "revert_to_idle" | "revert" | "idle" => Ok(TrackLossPolicy::RevertToIdle),
            _ => Err(PolicyParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown policy: {0}")]
pub struct PolicyParseError(String);
