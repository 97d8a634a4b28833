//! Template-matching fallback tracker.
//!
//! Used for every variant when the crate is built without OpenCV. The patch
//! under the seed box is kept as a zero-mean template and, on each update,
//! matched by normalized cross-correlation inside a window around the last
//! known position. A best score below the configured minimum is reported as
//! a lost target.
//!
//! This is a stand-in with none of the variants' model updates, scale
//! estimation or re-detection; it only keeps the pipeline usable without a
//! native vision library.

use super::{TrackerFactory, VisualTracker};
use crate::config::TrackingConfig;
use crate::error::{TrackError, TrackResult};
use crate::frame::Frame;
use ndarray::{s, Array2, ArrayView2};
use rayon::prelude::*;
use tracing::trace;
use tracklock_models::{FrameRect, TrackerVariant};

/// Smallest search margin in pixels, whatever the box size.
const MIN_SEARCH_MARGIN_PX: usize = 4;

/// Tuning for the template matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatcherConfig {
    /// Search margin around the last box as a fraction of its size
    pub search_margin: f64,
    /// Minimum normalized cross-correlation to accept a match
    pub min_score: f64,
}

impl Default for TemplateMatcherConfig {
    fn default() -> Self {
        Self {
            search_margin: 0.5,
            min_score: 0.5,
        }
    }
}

impl From<&TrackingConfig> for TemplateMatcherConfig {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            search_margin: config.search_margin.max(0.0),
            min_score: config.min_match_score,
        }
    }
}

/// Zero-mean patch with its L2 norm.
#[derive(Debug, Clone)]
struct Template {
    values: Array2<f32>,
    norm: f32,
}

impl Template {
    fn from_patch(patch: ArrayView2<'_, f32>) -> Option<Self> {
        let mean = patch.mean()?;
        let values = patch.mapv(|v| v - mean);
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        (norm > f32::EPSILON).then_some(Self { values, norm })
    }

    fn rows(&self) -> usize {
        self.values.nrows()
    }

    fn cols(&self) -> usize {
        self.values.ncols()
    }

    /// Normalized cross-correlation against an equally sized window.
    fn score(&self, window: ArrayView2<'_, f32>) -> f32 {
        let n = self.values.len() as f32;
        let mut cross = 0.0f32;
        let mut sum = 0.0f32;
        let mut sum_sq = 0.0f32;
        for (w, t) in window.iter().zip(self.values.iter()) {
            cross += w * t;
            sum += w;
            sum_sq += w * w;
        }
        let window_norm = (sum_sq - sum * sum / n).max(0.0).sqrt();
        if window_norm <= f32::EPSILON {
            return 0.0;
        }
        cross / (window_norm * self.norm)
    }
}

fn luma_array(frame: &Frame) -> Array2<f32> {
    let gray = frame.luma();
    Array2::from_shape_fn((gray.height() as usize, gray.width() as usize), |(r, c)| {
        gray.get_pixel(c as u32, r as u32)[0] as f32
    })
}

/// Normalized cross-correlation tracker over a local search window.
#[derive(Debug)]
pub struct TemplateTracker {
    variant: TrackerVariant,
    config: TemplateMatcherConfig,
    template: Option<Template>,
    /// Top-left (col, row) of the last match
    position: (usize, usize),
}

impl TemplateTracker {
    pub fn new(variant: TrackerVariant, config: TemplateMatcherConfig) -> Self {
        Self {
            variant,
            config,
            template: None,
            position: (0, 0),
        }
    }
}

impl VisualTracker for TemplateTracker {
    fn variant(&self) -> TrackerVariant {
        self.variant
    }

    fn init(&mut self, frame: &Frame, rect: &FrameRect) -> TrackResult<()> {
        let image = luma_array(frame);
        let r = rect.normalized();
        let (x0, y0) = (r.x0 as usize, r.y0 as usize);
        let (x1, y1) = (r.x1 as usize, r.y1 as usize);
        if x1 <= x0 || y1 <= y0 || y1 > image.nrows() || x1 > image.ncols() {
            return Err(TrackError::init_failed(format!("seed {} outside frame", rect)));
        }

        let template = Template::from_patch(image.slice(s![y0..y1, x0..x1]))
            .ok_or_else(|| TrackError::init_failed("seed region has no texture"))?;

        self.template = Some(template);
        self.position = (x0, y0);
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> TrackResult<FrameRect> {
        let template = self
            .template
            .as_ref()
            .ok_or_else(|| TrackError::backend("update before init"))?;
        let image = luma_array(frame);
        let (rows, cols) = (template.rows(), template.cols());
        if rows > image.nrows() || cols > image.ncols() {
            return Err(TrackError::TrackLost);
        }

        let margin_x = ((cols as f64 * self.config.search_margin).ceil() as usize)
            .max(MIN_SEARCH_MARGIN_PX);
        let margin_y = ((rows as f64 * self.config.search_margin).ceil() as usize)
            .max(MIN_SEARCH_MARGIN_PX);
        let (px, py) = self.position;
        let x_lo = px.saturating_sub(margin_x);
        let y_lo = py.saturating_sub(margin_y);
        let x_hi = (px + margin_x).min(image.ncols() - cols);
        let y_hi = (py + margin_y).min(image.nrows() - rows);

        let best = (y_lo..=y_hi)
            .into_par_iter()
            .flat_map_iter(|y| (x_lo..=x_hi).map(move |x| (x, y)))
            .map(|(x, y)| {
                let window = image.slice(s![y..y + rows, x..x + cols]);
                (template.score(window), x, y)
            })
            .reduce(
                || (f32::NEG_INFINITY, px, py),
                |a, b| if b.0 > a.0 { b } else { a },
            );

        let (score, x, y) = best;
        trace!(variant = %self.variant, score, x, y, "Template match");
        if !score.is_finite() || (score as f64) < self.config.min_score {
            return Err(TrackError::TrackLost);
        }

        self.position = (x, y);
        Ok(FrameRect::from_xywh(x as f64, y as f64, cols as f64, rows as f64))
    }
}

/// Factory that backs every variant with a [`TemplateTracker`].
#[derive(Debug, Clone, Default)]
pub struct TemplateTrackerFactory {
    config: TemplateMatcherConfig,
}

impl TemplateTrackerFactory {
    pub fn new(config: TemplateMatcherConfig) -> Self {
        Self { config }
    }
}

impl TrackerFactory for TemplateTrackerFactory {
    fn name(&self) -> &'static str {
        "template"
    }

    fn create(&self, variant: TrackerVariant) -> TrackResult<Box<dyn VisualTracker>> {
        Ok(Box::new(TemplateTracker::new(variant, self.config)))
    }
}
