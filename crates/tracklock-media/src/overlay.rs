//! Overlay sink: where redraw requests go.
//!
//! The view itself lives outside this crate. The pipeline only hands an
//! [`OverlayFrame`] to whatever sink it was built with.

use crate::selection::OverlayFrame;
use std::sync::{Mutex, PoisonError};

/// Receives redraw requests from the pipeline.
pub trait OverlaySink: Send + Sync {
    fn redraw(&self, frame: OverlayFrame);
}

/// Sink that ignores every redraw.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOverlay;

impl OverlaySink for NullOverlay {
    fn redraw(&self, _frame: OverlayFrame) {}
}

/// Sink that keeps every redraw in order, for replay reports and tests.
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    frames: Mutex<Vec<OverlayFrame>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<OverlayFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<OverlayFrame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }

    pub fn len(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OverlaySink for RecordingOverlay {
    fn redraw(&self, frame: OverlayFrame) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklock_models::{DrawStyle, OverlayRect, TrackingState};

    #[test]
    fn test_recording_keeps_order() {
        let sink = RecordingOverlay::new();
        assert!(sink.is_empty());

        sink.redraw(OverlayFrame {
            rect: None,
            style: DrawStyle::Hidden,
            state: TrackingState::Idle,
        });
        sink.redraw(OverlayFrame {
            rect: Some(OverlayRect::new(1.0, 2.0, 3.0, 4.0)),
            style: DrawStyle::Outline,
            state: TrackingState::Drawing,
        });

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.frames()[0].style, DrawStyle::Hidden);
        assert_eq!(sink.last().unwrap().state, TrackingState::Drawing);
    }
}
