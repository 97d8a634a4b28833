//! Points, extents and space-tagged rectangles.
//!
//! A selection is always expressed in exactly one pixel coordinate system:
//! - **Overlay space**: the on-screen drawing surface the user touches
//! - **Frame space**: the decoded camera image handed to the tracker
//!
//! The space is carried as a zero-sized type parameter so a rectangle in
//! overlay space cannot be passed where a frame-space rectangle is expected.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for a named pixel coordinate system.
pub trait CoordinateSpace: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Human-readable space name used in logs.
    const NAME: &'static str;
}

/// Pixel space of the on-screen overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Overlay;

/// Pixel space of one decoded camera frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameSpace;

impl CoordinateSpace for Overlay {
    const NAME: &'static str = "overlay";
}

impl CoordinateSpace for FrameSpace {
    const NAME: &'static str = "frame";
}

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Copy pulled onto the nearest position inside `extent`.
    pub fn clamp_to(&self, extent: Extent) -> Self {
        Self::new(
            self.x.clamp(0.0, extent.width as f64),
            self.y.clamp(0.0, extent.height as f64),
        )
    }
}

/// Width and height of a pixel surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero; such a surface cannot be mapped.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, `None` for an empty extent.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle given by two corners in coordinate space `S`.
///
/// The corners are stored as drawn: `(x0, y0)` is where the selection
/// started and `(x1, y1)` follows the drag, so either corner may be the
/// top-left one until [`Rect::normalized`] is applied.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Rect<S: CoordinateSpace> {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Clone for Rect<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: CoordinateSpace> Copy for Rect<S> {}

impl<S: CoordinateSpace> PartialEq for Rect<S> {
    fn eq(&self, other: &Self) -> bool {
        self.x0 == other.x0 && self.y0 == other.y0 && self.x1 == other.x1 && self.y1 == other.y1
    }
}

impl<S: CoordinateSpace> fmt::Debug for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rect")
            .field("space", &S::NAME)
            .field("x0", &self.x0)
            .field("y0", &self.y0)
            .field("x1", &self.x1)
            .field("y1", &self.y1)
            .finish()
    }
}

impl<S: CoordinateSpace> fmt::Display for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1},{:.1})-({:.1},{:.1})@{}",
            self.x0,
            self.y0,
            self.x1,
            self.y1,
            S::NAME
        )
    }
}

impl<S: CoordinateSpace> Rect<S> {
    /// Create a rectangle from raw corner coordinates.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            space: PhantomData,
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x, a.y, b.x, b.y)
    }

    /// Create a zero-area rectangle anchored at `p` (start of a drag).
    pub fn at_point(p: Point) -> Self {
        Self::from_corners(p, p)
    }

    /// Create a normalized rectangle from top-left position and size.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Corners reordered so that `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    /// Replace the second (dragged) corner.
    pub fn with_second_corner(&self, p: Point) -> Self {
        Self::new(self.x0, self.y0, p.x, p.y)
    }

    #[inline]
    pub fn min_x(&self) -> f64 {
        self.x0.min(self.x1)
    }

    #[inline]
    pub fn min_y(&self) -> f64 {
        self.y0.min(self.y1)
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x0.max(self.x1)
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y0.max(self.y1)
    }

    /// Absolute width.
    #[inline]
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    /// Absolute height.
    #[inline]
    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point (where the tracking crosshair is drawn).
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// True when the rectangle has no positive area or holds non-finite values.
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }

    /// True when all corners are non-negative.
    pub fn is_non_negative(&self) -> bool {
        self.min_x() >= 0.0 && self.min_y() >= 0.0
    }

    /// True when the rectangle lies entirely inside a surface of `extent`.
    pub fn fits_within(&self, extent: Extent) -> bool {
        self.is_finite()
            && self.is_non_negative()
            && self.max_x() <= extent.width as f64
            && self.max_y() <= extent.height as f64
    }

    /// Normalized copy clamped to the bounds of `extent`.
    pub fn clamp_to(&self, extent: Extent) -> Self {
        let w = extent.width as f64;
        let h = extent.height as f64;
        let n = self.normalized();
        Self::new(
            n.x0.clamp(0.0, w),
            n.y0.clamp(0.0, h),
            n.x1.clamp(0.0, w),
            n.y1.clamp(0.0, h),
        )
    }

    /// Normalized copy with every corner truncated to a whole pixel.
    pub fn snapped(&self) -> Self {
        let n = self.normalized();
        Self::new(n.x0.trunc(), n.y0.trunc(), n.x1.trunc(), n.y1.trunc())
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x0 - other.x0).abs() <= tolerance
            && (self.y0 - other.y0).abs() <= tolerance
            && (self.x1 - other.x1).abs() <= tolerance
            && (self.y1 - other.y1).abs() <= tolerance
    }
}

/// Selection rectangle on the overlay surface.
pub type OverlayRect = Rect<Overlay>;

/// Selection rectangle on a decoded frame.
pub type FrameRect = Rect<FrameSpace>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_orders_corners() {
        let r = OverlayRect::new(300.0, 50.0, 100.0, 250.0).normalized();
        assert_eq!(r, OverlayRect::new(100.0, 50.0, 300.0, 250.0));
        assert_eq!(r.width(), 200.0);
        assert_eq!(r.height(), 200.0);
    }

    #[test]
    fn test_drag_from_anchor() {
        let r = OverlayRect::at_point(Point::new(10.0, 20.0));
        assert!(r.is_degenerate());

        let r = r.with_second_corner(Point::new(40.0, 60.0));
        assert_eq!(r.x0, 10.0);
        assert_eq!(r.y0, 20.0);
        assert_eq!(r.area(), 30.0 * 40.0);
        assert_eq!(r.center(), Point::new(25.0, 40.0));
    }

    #[test]
    fn test_fits_within() {
        let extent = Extent::new(240, 320);
        assert!(FrameRect::new(0.0, 0.0, 240.0, 320.0).fits_within(extent));
        assert!(!FrameRect::new(-1.0, 0.0, 20.0, 20.0).fits_within(extent));
        assert!(!FrameRect::new(10.0, 10.0, 241.0, 20.0).fits_within(extent));
        assert!(!FrameRect::new(f64::NAN, 0.0, 1.0, 1.0).fits_within(extent));
    }

    #[test]
    fn test_snapped_truncates() {
        let r = FrameRect::new(24.9, 32.2, 72.7, 96.99).snapped();
        assert_eq!(r, FrameRect::new(24.0, 32.0, 72.0, 96.0));
    }

    #[test]
    fn test_clamp_to_extent() {
        let r = FrameRect::new(-5.0, 10.0, 300.0, 400.0).clamp_to(Extent::new(240, 320));
        assert_eq!(r, FrameRect::new(0.0, 10.0, 240.0, 320.0));
    }

    #[test]
    fn test_point_clamp_to_extent() {
        let extent = Extent::new(1000, 800);
        assert_eq!(Point::new(-20.0, -5.0).clamp_to(extent), Point::new(0.0, 0.0));
        assert_eq!(Point::new(1010.0, 950.0).clamp_to(extent), Point::new(1000.0, 800.0));
        assert_eq!(Point::new(12.5, 40.0).clamp_to(extent), Point::new(12.5, 40.0));
    }

    #[test]
    fn test_rect_serde_skips_space_tag() {
        let r = OverlayRect::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"x0":1.0,"y0":2.0,"x1":3.0,"y1":4.0}"#);

        let back: OverlayRect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_extent_empty() {
        assert!(Extent::new(0, 10).is_empty());
        assert!(Extent::new(10, 0).aspect_ratio().is_none());
        assert_eq!(Extent::new(240, 320).to_string(), "240x320");
    }
}
