//! Coordinate Mapping between Overlay and Frame Space
//!
//! Provides deterministic, reversible coordinate mapping between:
//! - **Overlay space**: the on-screen surface the selection is drawn on
//! - **Frame space**: the decoded image handed to the tracker
//!
//! # Scaling
//! Each axis is scaled independently:
//! `x_frame = x_overlay / overlay_width * frame_width`, and likewise for y.
//! No aspect-ratio correction is applied. When overlay and frame aspect
//! ratios differ, the box the user sees and the box the tracker receives are
//! not similar rectangles; [`CoordinateMapper::is_uniform`] reports this.
//!
//! # Usage
//! ```rust
//! use tracklock_media::mapping::CoordinateMapper;
//! use tracklock_models::{Extent, OverlayRect};
//!
//! let mapper = CoordinateMapper::new(Extent::new(1000, 1000), Extent::new(240, 320))?;
//! let frame_rect = mapper.to_frame_space(&OverlayRect::new(100.0, 100.0, 300.0, 300.0));
//! assert!((frame_rect.x0 - 24.0).abs() < 1e-9);
//! # Ok::<(), tracklock_media::TrackError>(())
//! ```

use crate::error::{TrackError, TrackResult};
use tracklock_models::{Extent, FrameRect, OverlayRect, Point};

/// Relative tolerance when deciding whether both axes scale alike.
const UNIFORM_SCALE_TOLERANCE: f64 = 1e-3;

/// Mapping between one overlay surface and one frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    overlay: Extent,
    frame: Extent,
    /// frame_width / overlay_width
    scale_x: f64,
    /// frame_height / overlay_height
    scale_y: f64,
}

impl CoordinateMapper {
    /// Compute the mapping for the given surfaces.
    ///
    /// Fails with `InvalidGeometry` if either surface has a zero side, since
    /// one of the two directions would divide by zero.
    pub fn new(overlay: Extent, frame: Extent) -> TrackResult<Self> {
        if overlay.is_empty() {
            return Err(TrackError::invalid_geometry(format!(
                "overlay extent {} has a zero side",
                overlay
            )));
        }
        if frame.is_empty() {
            return Err(TrackError::invalid_geometry(format!(
                "frame extent {} has a zero side",
                frame
            )));
        }

        Ok(Self {
            overlay,
            frame,
            scale_x: frame.width as f64 / overlay.width as f64,
            scale_y: frame.height as f64 / overlay.height as f64,
        })
    }

    pub fn overlay(&self) -> Extent {
        self.overlay
    }

    pub fn frame(&self) -> Extent {
        self.frame
    }

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    #[inline]
    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    /// True when both axes use (nearly) the same scale factor.
    pub fn is_uniform(&self) -> bool {
        ((self.scale_x - self.scale_y) / self.scale_x).abs() <= UNIFORM_SCALE_TOLERANCE
    }

    /// Map a point from overlay space to frame space.
    #[inline]
    pub fn point_to_frame(&self, p: Point) -> Point {
        Point::new(p.x * self.scale_x, p.y * self.scale_y)
    }

    /// Map a point from frame space to overlay space.
    #[inline]
    pub fn point_to_overlay(&self, p: Point) -> Point {
        Point::new(p.x / self.scale_x, p.y / self.scale_y)
    }

    /// Map a rectangle from overlay space to frame space.
    ///
    /// Corners are mapped as stored; normalization is left to the caller.
    pub fn to_frame_space(&self, rect: &OverlayRect) -> FrameRect {
        FrameRect::new(
            rect.x0 * self.scale_x,
            rect.y0 * self.scale_y,
            rect.x1 * self.scale_x,
            rect.y1 * self.scale_y,
        )
    }

    /// Map a rectangle from frame space to overlay space.
    pub fn to_overlay_space(&self, rect: &FrameRect) -> OverlayRect {
        OverlayRect::new(
            rect.x0 / self.scale_x,
            rect.y0 / self.scale_y,
            rect.x1 / self.scale_x,
            rect.y1 / self.scale_y,
        )
    }
}

/// Map a rectangle from overlay space into frame space.
pub fn to_frame_space(rect: &OverlayRect, overlay: Extent, frame: Extent) -> TrackResult<FrameRect> {
    Ok(CoordinateMapper::new(overlay, frame)?.to_frame_space(rect))
}

/// Map a rectangle from frame space back into overlay space.
pub fn to_overlay_space(
    rect: &FrameRect,
    overlay: Extent,
    frame: Extent,
) -> TrackResult<OverlayRect> {
    Ok(CoordinateMapper::new(overlay, frame)?.to_overlay_space(rect))
}
