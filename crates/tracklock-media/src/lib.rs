//! Selection tracking core.
//!
//! This crate provides:
//! - Overlay/frame coordinate mapping
//! - The selection and lock state machine
//! - Frame decoding and orientation
//! - A tracker adapter over OpenCV's trackers, with a template-matching fallback
//! - The per-frame init-or-update pipeline and its latest-wins frame mailbox

pub mod config;
pub mod error;
pub mod frame;
pub mod mailbox;
pub mod mapping;
pub mod metrics;
pub mod overlay;
pub mod pipeline;
pub mod selection;
pub mod tracker;

pub use config::{TrackingConfig, DEFAULT_FRAME_EXTENT};
pub use error::{TrackError, TrackResult};
pub use frame::{Frame, FrameDecoder};
pub use mailbox::FrameMailbox;
pub use mapping::{to_frame_space, to_overlay_space, CoordinateMapper};
pub use overlay::{NullOverlay, OverlaySink, RecordingOverlay};
pub use pipeline::{FrameOutcome, FramePipeline, ProcessingGuard};
pub use selection::{LockSeed, OverlayFrame, SelectionMachine, Transition};
pub use tracker::{default_factory, TrackerFactory, TrackerHandle, VisualTracker};
