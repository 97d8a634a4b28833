//! Tracker adapter.
//!
//! One call surface (`init`, `update`) over interchangeable tracking
//! algorithms. The algorithms themselves come from a backend:
//! - **OpenCV** (`opencv` feature): KCF, CSRT and MIL natively; the
//!   legacy-only MOSSE, MedianFlow and TLD use template matching
//! - **Template matching** for every variant when OpenCV is not compiled in
//!
//! The pipeline only ever talks to a [`TrackerHandle`], which enforces the
//! adapter contract (seed inside the frame, positive area, sane output)
//! regardless of what the backend does.

#[cfg(feature = "opencv")]
pub mod opencv;
pub mod template;

use crate::config::TrackingConfig;
use crate::error::{TrackError, TrackResult};
use crate::frame::Frame;
use std::sync::Arc;
#[cfg(not(feature = "opencv"))]
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use tracklock_models::{FrameRect, TrackerVariant};

pub use template::{TemplateMatcherConfig, TemplateTracker, TemplateTrackerFactory};

/// A stateful tracking algorithm instance.
pub trait VisualTracker: Send {
    /// Algorithm this instance implements.
    fn variant(&self) -> TrackerVariant;

    /// Seed the internal model from the patch under `rect`.
    fn init(&mut self, frame: &Frame, rect: &FrameRect) -> TrackResult<()>;

    /// Advance by one frame and return the new estimate.
    ///
    /// Returns `TrackLost` when the algorithm judges the target gone.
    fn update(&mut self, frame: &Frame) -> TrackResult<FrameRect>;
}

/// Builds tracker instances for a configured variant.
pub trait TrackerFactory: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    fn create(&self, variant: TrackerVariant) -> TrackResult<Box<dyn VisualTracker>>;
}

/// Check that a seed rectangle can be handed to a backend.
///
/// Returns the normalized, pixel-snapped rectangle.
pub fn validate_seed(rect: &FrameRect, frame: &Frame) -> TrackResult<FrameRect> {
    let extent = frame.extent();
    let snapped = rect.snapped();
    if snapped.is_degenerate() {
        return Err(TrackError::init_failed(format!(
            "seed {} has non-positive area",
            rect
        )));
    }
    if !snapped.fits_within(extent) {
        return Err(TrackError::init_failed(format!(
            "seed {} lies outside frame {}",
            rect, extent
        )));
    }
    Ok(snapped)
}

/// The single live tracker of a lock cycle.
pub struct TrackerHandle {
    inner: Box<dyn VisualTracker>,
    variant: TrackerVariant,
    last: FrameRect,
    updates: u64,
}

impl std::fmt::Debug for TrackerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerHandle")
            .field("variant", &self.variant)
            .field("last", &self.last)
            .field("updates", &self.updates)
            .finish()
    }
}

impl TrackerHandle {
    /// Validate the seed, then build and seed a tracker for `variant`.
    ///
    /// No backend object is constructed if the seed is rejected.
    pub fn init(
        factory: &dyn TrackerFactory,
        variant: TrackerVariant,
        frame: &Frame,
        rect: &FrameRect,
    ) -> TrackResult<Self> {
        let seed = validate_seed(rect, frame)?;

        let mut inner = factory.create(variant)?;
        inner.init(frame, &seed).map_err(|e| match e {
            TrackError::TrackInitFailed(_) => e,
            other => TrackError::init_failed(other.to_string()),
        })?;

        debug!(
            backend = factory.name(),
            variant = %variant,
            seed = %seed,
            "Tracker initialized"
        );

        Ok(Self {
            inner,
            variant,
            last: seed,
            updates: 0,
        })
    }

    pub fn variant(&self) -> TrackerVariant {
        self.variant
    }

    /// Last accepted estimate (the seed until the first update).
    pub fn last(&self) -> FrameRect {
        self.last
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Advance the tracker by one frame.
    ///
    /// Estimates are clamped to the frame; an estimate that is non-finite or
    /// collapses to zero area after clamping counts as a lost target.
    pub fn update(&mut self, frame: &Frame) -> TrackResult<FrameRect> {
        let estimate = match self.inner.update(frame) {
            Ok(rect) => rect,
            Err(TrackError::TrackLost) => return Err(TrackError::TrackLost),
            Err(e) => {
                warn!(variant = %self.variant, error = %e, "Tracker update failed");
                return Err(TrackError::TrackLost);
            }
        };

        if !estimate.is_finite() {
            return Err(TrackError::TrackLost);
        }
        let clamped = estimate.clamp_to(frame.extent());
        if clamped.is_degenerate() {
            return Err(TrackError::TrackLost);
        }

        self.last = clamped;
        self.updates += 1;
        Ok(clamped)
    }
}

/// Pick the tracker backend for this build.
///
/// With the `opencv` feature OpenCV's trackers are used where the bindings
/// provide them; otherwise every variant is served by the template matcher.
pub fn default_factory(config: &TrackingConfig) -> Arc<dyn TrackerFactory> {
    #[cfg(feature = "opencv")]
    {
        info!(
            native = opencv::is_native(config.tracker_variant),
            tracker = %config.tracker_variant,
            "Using OpenCV trackers"
        );
        Arc::new(opencv::OpenCvTrackerFactory::new(TemplateMatcherConfig::from(config)))
    }

    #[cfg(not(feature = "opencv"))]
    {
        static FALLBACK_WARNED: OnceLock<()> = OnceLock::new();
        FALLBACK_WARNED.get_or_init(|| {
            warn!("OpenCV support not compiled in - using template-matching fallback for all tracker variants");
        });
        info!(
            search_margin = config.search_margin,
            min_score = config.min_match_score,
            "Using template-matching tracker"
        );
        Arc::new(TemplateTrackerFactory::new(TemplateMatcherConfig::from(config)))
    }
}
