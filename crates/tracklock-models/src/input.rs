//! Discrete input events from the overlay touch surface.

use crate::geometry::Point;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input event in overlay coordinates.
///
/// Maps the touch gestures of the camera preview: first finger down starts
/// a selection, moving it drags the second corner, lifting it ends the
/// selection, and a second finger toggles the target lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    SelectStart { point: Point },
    SelectDrag { point: Point },
    SelectEnd,
    ToggleLock,
}

impl InputEvent {
    pub fn select_start(x: f64, y: f64) -> Self {
        Self::SelectStart {
            point: Point::new(x, y),
        }
    }

    pub fn select_drag(x: f64, y: f64) -> Self {
        Self::SelectDrag {
            point: Point::new(x, y),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::SelectStart { .. } => "select_start",
            InputEvent::SelectDrag { .. } => "select_drag",
            InputEvent::SelectEnd => "select_end",
            InputEvent::ToggleLock => "toggle_lock",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let event: InputEvent =
            serde_json::from_str(r#"{"type":"select_start","point":{"x":1.0,"y":2.0}}"#).unwrap();
        assert_eq!(event, InputEvent::select_start(1.0, 2.0));

        let event: InputEvent = serde_json::from_str(r#"{"type":"toggle_lock"}"#).unwrap();
        assert_eq!(event, InputEvent::ToggleLock);
        assert_eq!(event.kind(), "toggle_lock");
    }
}
