//! Recorded capture session manifests.
//!
//! A manifest lists the captured stills in order and the input events the
//! user produced, each keyed by the index of the frame it preceded:
//!
//! ```json
//! {
//!   "overlay": { "width": 1080, "height": 1920 },
//!   "frame_interval_ms": 33,
//!   "frames": ["frames/0000.jpg", "frames/0001.jpg"],
//!   "events": [
//!     { "frame": 0, "event": { "type": "select_start", "point": { "x": 100.0, "y": 200.0 } } },
//!     { "frame": 0, "event": { "type": "select_drag", "point": { "x": 400.0, "y": 600.0 } } },
//!     { "frame": 1, "event": { "type": "toggle_lock" } }
//!   ]
//! }
//! ```
//!
//! Relative frame paths are resolved against the manifest's directory.

use crate::error::{WorkerError, WorkerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracklock_models::{Extent, InputEvent};

/// An input event delivered before frame `frame` is captured.
///
/// `frame == frames.len()` delivers the event after the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub frame: usize,
    pub event: InputEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Size of the surface the events were recorded on
    pub overlay: Extent,
    /// Capture cadence; the worker default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_interval_ms: Option<u64>,
    pub frames: Vec<PathBuf>,
    #[serde(default)]
    pub events: Vec<TimedEvent>,
}

impl SessionManifest {
    /// Read, parse and validate a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let manifest: SessionManifest = serde_json::from_str(&raw)?;
        manifest.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(manifest.resolve_paths(base))
    }

    pub fn validate(&self) -> WorkerResult<()> {
        if self.overlay.is_empty() {
            return Err(WorkerError::invalid_manifest(format!(
                "overlay extent {} has a zero side",
                self.overlay
            )));
        }
        if self.frames.is_empty() {
            return Err(WorkerError::invalid_manifest("no frames listed"));
        }
        if let Some(timed) = self.events.iter().find(|e| e.frame > self.frames.len()) {
            return Err(WorkerError::invalid_manifest(format!(
                "{} event keyed to frame {} but only {} frames listed",
                timed.event.kind(),
                timed.frame,
                self.frames.len()
            )));
        }
        Ok(())
    }

    /// Make relative frame paths relative to `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        for frame in &mut self.frames {
            if frame.is_relative() {
                *frame = base.join(&*frame);
            }
        }
        self
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval_ms.map(Duration::from_millis)
    }

    /// Events in delivery order (stable within a frame).
    pub fn ordered_events(&self) -> Vec<TimedEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(|e| e.frame);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"{
        "overlay": { "width": 1000, "height": 1000 },
        "frame_interval_ms": 20,
        "frames": ["a.png", "/abs/b.png"],
        "events": [
            { "frame": 1, "event": { "type": "toggle_lock" } },
            { "frame": 0, "event": { "type": "select_start", "point": { "x": 1.0, "y": 2.0 } } },
            { "frame": 0, "event": { "type": "select_end" } }
        ]
    }"#;

    #[tokio::test]
    async fn test_load_resolves_relative_paths() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let manifest = SessionManifest::load(file.path()).await.unwrap();
        let dir = file.path().parent().unwrap();

        assert_eq!(manifest.overlay, Extent::new(1000, 1000));
        assert_eq!(manifest.frame_interval(), Some(Duration::from_millis(20)));
        assert_eq!(manifest.frames[0], dir.join("a.png"));
        assert_eq!(manifest.frames[1], PathBuf::from("/abs/b.png"));
    }

    #[test]
    fn test_events_ordered_stably_by_frame() {
        let manifest: SessionManifest = serde_json::from_str(MANIFEST).unwrap();
        let kinds: Vec<&str> = manifest
            .ordered_events()
            .iter()
            .map(|e| e.event.kind())
            .collect();
        assert_eq!(kinds, ["select_start", "select_end", "toggle_lock"]);
    }

    #[test]
    fn test_rejects_event_past_end() {
        let mut manifest: SessionManifest = serde_json::from_str(MANIFEST).unwrap();
        manifest.events.push(TimedEvent {
            frame: 3,
            event: InputEvent::ToggleLock,
        });
        assert!(matches!(
            manifest.validate(),
            Err(WorkerError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_rejects_empty_overlay_and_frames() {
        let mut manifest: SessionManifest = serde_json::from_str(MANIFEST).unwrap();
        manifest.overlay = Extent::new(0, 10);
        assert!(manifest.validate().is_err());

        let mut manifest: SessionManifest = serde_json::from_str(MANIFEST).unwrap();
        manifest.frames.clear();
        manifest.events.clear();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_load_reports_bad_json_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            tokio_test::block_on(SessionManifest::load(file.path())),
            Err(WorkerError::Json(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            tokio_test::block_on(SessionManifest::load(dir.path().join("absent.json"))),
            Err(WorkerError::Io(_))
        ));
    }
}
