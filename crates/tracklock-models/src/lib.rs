//! Shared data models for the tracklock selection tracker.
//!
//! This crate provides Serde-serializable types for:
//! - Points, extents and space-tagged rectangles
//! - Tracking algorithm variants
//! - Tracking state and overlay draw styles
//! - Touch input events
//! - Release and track-loss policies

pub mod geometry;
pub mod input;
pub mod policy;
pub mod state;
pub mod tracker_variant;

// Re-export common types
pub use geometry::{CoordinateSpace, Extent, FrameRect, FrameSpace, Overlay, OverlayRect, Point, Rect};
pub use input::InputEvent;
pub use policy::{PolicyParseError, ReleasePolicy, TrackLossPolicy};
pub use state::{DrawStyle, TrackingState};
pub use tracker_variant::{TrackerVariant, TrackerVariantParseError};
