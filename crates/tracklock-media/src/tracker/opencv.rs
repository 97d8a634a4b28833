//! OpenCV tracker backend.
//!
//! KCF and CSRT come from opencv_contrib's `tracking` module, MIL from the
//! main `video` module. All three implement `cv::Tracker`, whose
//! `init(image, Rect)` / `update(image, &mut Rect) -> bool` surface maps
//! one-to-one onto [`VisualTracker`].
//!
//! MOSSE, MedianFlow and TLD only exist under `cv::legacy`, which the Rust
//! bindings do not expose. Those three variants are served by the template
//! matcher, and the factory says so once per variant.
//!
//! # Requirements
//! - OpenCV 4.5+ built with the contrib `tracking` module

use super::template::{TemplateMatcherConfig, TemplateTrackerFactory};
use super::{TrackerFactory, VisualTracker};
use crate::error::{TrackError, TrackResult};
use crate::frame::Frame;
use opencv::core::{Mat, Ptr, Rect};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::tracking::{TrackerCSRT, TrackerCSRT_Params, TrackerKCF, TrackerKCF_Params};
use opencv::video::{TrackerMIL, TrackerMIL_Params, TrackerTrait};
use std::sync::Mutex;
use tracing::{debug, warn};
use tracklock_models::{FrameRect, TrackerVariant};

/// Convert an RGB frame into a BGR `Mat`.
fn frame_to_mat(frame: &Frame) -> TrackResult<Mat> {
    let image = frame.image();
    let flat = Mat::from_slice(image.as_raw().as_slice())?;
    let rgb = flat.reshape(3, image.height() as i32)?.try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}

/// Seeds arrive pixel-snapped, so rounding only absorbs float noise.
fn to_cv_rect(rect: &FrameRect) -> Rect {
    let r = rect.normalized();
    Rect::new(
        r.x0.round() as i32,
        r.y0.round() as i32,
        r.width().round() as i32,
        r.height().round() as i32,
    )
}

fn from_cv_rect(rect: Rect) -> FrameRect {
    FrameRect::from_xywh(
        rect.x as f64,
        rect.y as f64,
        rect.width as f64,
        rect.height as f64,
    )
}

/// Whether OpenCV provides `variant` through the bindings.
pub fn is_native(variant: TrackerVariant) -> bool {
    matches!(
        variant,
        TrackerVariant::Kcf | TrackerVariant::Csrt | TrackerVariant::Mil
    )
}

/// One OpenCV tracker instance.
pub struct OpenCvTracker<T> {
    inner: Ptr<T>,
    variant: TrackerVariant,
}

impl<T> VisualTracker for OpenCvTracker<T>
where
    Ptr<T>: TrackerTrait + Send,
{
    fn variant(&self) -> TrackerVariant {
        self.variant
    }

    fn init(&mut self, frame: &Frame, rect: &FrameRect) -> TrackResult<()> {
        let mat = frame_to_mat(frame)?;
        self.inner.init(&mat, to_cv_rect(rect)).map_err(|e| {
            TrackError::init_failed(format!("{} rejected seed {}: {}", self.variant, rect, e))
        })
    }

    fn update(&mut self, frame: &Frame) -> TrackResult<FrameRect> {
        let mat = frame_to_mat(frame)?;
        let mut bbox = Rect::default();
        if self.inner.update(&mat, &mut bbox)? {
            Ok(from_cv_rect(bbox))
        } else {
            debug!(variant = %self.variant, "OpenCV tracker reported target lost");
            Err(TrackError::TrackLost)
        }
    }
}

fn boxed<T>(inner: Ptr<T>, variant: TrackerVariant) -> Box<dyn VisualTracker>
where
    Ptr<T>: TrackerTrait + Send,
    T: 'static,
{
    Box::new(OpenCvTracker { inner, variant })
}

/// Factory for the OpenCV trackers, with the template matcher standing in
/// for the legacy-only variants.
#[derive(Debug)]
pub struct OpenCvTrackerFactory {
    fallback: TemplateTrackerFactory,
    warned: Mutex<Vec<TrackerVariant>>,
}

impl OpenCvTrackerFactory {
    pub fn new(fallback: TemplateMatcherConfig) -> Self {
        Self {
            fallback: TemplateTrackerFactory::new(fallback),
            warned: Mutex::new(Vec::new()),
        }
    }

    fn warn_fallback(&self, variant: TrackerVariant) {
        let mut warned = self
            .warned
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !warned.contains(&variant) {
            warned.push(variant);
            warn!(
                variant = %variant,
                "OpenCV only ships this tracker under cv::legacy - using template matching"
            );
        }
    }
}

impl TrackerFactory for OpenCvTrackerFactory {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn create(&self, variant: TrackerVariant) -> TrackResult<Box<dyn VisualTracker>> {
        let tracker = match variant {
            TrackerVariant::Kcf => {
                boxed(TrackerKCF::create(TrackerKCF_Params::default()?)?, variant)
            }
            TrackerVariant::Csrt => {
                boxed(TrackerCSRT::create(&TrackerCSRT_Params::default()?)?, variant)
            }
            TrackerVariant::Mil => {
                boxed(TrackerMIL::create(TrackerMIL_Params::default()?)?, variant)
            }
            TrackerVariant::Mosse | TrackerVariant::MedianFlow | TrackerVariant::Tld => {
                self.warn_fallback(variant);
                return self.fallback.create(variant);
            }
        };
        Ok(tracker)
    }
}
