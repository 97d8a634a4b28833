//! Session replay.
//!
//! Drives one recorded session through a [`FramePipeline`] with the same
//! shape as a live camera: three concurrent tasks.
//! - **capture** reads stills at the configured cadence and posts them to a
//!   latest-wins [`FrameMailbox`]
//! - **input** applies the recorded touch events to the pipeline
//! - **processing** takes the newest frame and runs the frame cycle on the
//!   blocking pool
//!
//! Events keyed to frame `i` are applied before frame `i` is posted. Beyond
//! that, nothing orders input against processing, which is the point: a
//! toggle may land in the middle of a tracker call.

use crate::capture::CaptureSource;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::SessionLogger;
use crate::manifest::{SessionManifest, TimedEvent};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, Instrument};
use tracklock_media::{
    default_factory, FrameDecoder, FrameMailbox, FramePipeline, RecordingOverlay,
};
use tracklock_models::{OverlayRect, TrackingState};

/// Frames between two progress lines.
const PROGRESS_EVERY: usize = 100;

/// Summary of one replayed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub frames_total: usize,
    /// Frames accepted by the mailbox
    pub frames_posted: u64,
    /// Frames overwritten in the mailbox before processing
    pub frames_dropped: u64,
    /// Frames the capture source could not read or decode
    pub capture_failures: u64,
    /// Frame cycles run, by outcome
    pub outcomes: BTreeMap<String, u64>,
    pub lock_cycles: u64,
    pub overlay_redraws: usize,
    pub final_state: TrackingState,
    pub final_rect: Option<OverlayRect>,
    pub elapsed_ms: u64,
}

impl SessionReport {
    /// Total frame cycles run.
    pub fn frames_processed(&self) -> u64 {
        self.outcomes.values().sum()
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.outcomes.get(outcome).copied().unwrap_or(0)
    }
}

/// Replays a [`SessionManifest`] through the tracking pipeline.
#[derive(Debug)]
pub struct SessionRunner {
    config: WorkerConfig,
    manifest: SessionManifest,
    logger: SessionLogger,
}

impl SessionRunner {
    pub fn new(config: WorkerConfig, manifest: SessionManifest) -> WorkerResult<Self> {
        manifest.validate()?;
        Ok(Self {
            config,
            manifest,
            logger: SessionLogger::new("replay"),
        })
    }

    pub fn session_id(&self) -> &str {
        self.logger.session_id()
    }

    fn frame_interval(&self) -> Duration {
        self.manifest
            .frame_interval()
            .unwrap_or(self.config.frame_interval)
    }

    pub async fn run(self) -> WorkerResult<SessionReport> {
        let started = Instant::now();
        let result = self.replay().instrument(self.logger.create_span()).await;

        let status = if result.is_ok() { "completed" } else { "failed" };
        metrics::record_session(status, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            self.logger.log_error(&e.to_string());
        }
        result
    }

    async fn replay(&self) -> WorkerResult<SessionReport> {
        let started = Instant::now();
        let tracking = self.config.tracking.clone();
        let frames_total = self.manifest.frames.len();

        self.logger.log_start(&format!(
            "{} frames, tracker {}, overlay {}",
            frames_total, tracking.tracker_variant, self.manifest.overlay
        ));

        let sink = Arc::new(RecordingOverlay::new());
        let pipeline = Arc::new(FramePipeline::new(
            tracking.clone(),
            self.manifest.overlay,
            default_factory(&tracking),
            sink.clone(),
        )?);
        let mailbox = Arc::new(FrameMailbox::new());
        let source = CaptureSource::new(
            FrameDecoder::from_config(&tracking),
            self.manifest.frames.clone(),
        );

        // Capture announces the frame it is about to post; input reports
        // which announcement it has caught up with.
        let (cursor_tx, cursor_rx) = watch::channel(0usize);
        let (applied_tx, applied_rx) = watch::channel(None::<usize>);

        let input = tokio::spawn(
            deliver_events(
                Arc::clone(&pipeline),
                self.manifest.ordered_events(),
                cursor_rx,
                applied_tx,
            )
            .in_current_span(),
        );

        let processing = tokio::spawn(
            process_frames(Arc::clone(&pipeline), Arc::clone(&mailbox)).in_current_span(),
        );

        let capture = tokio::spawn(
            capture_frames(
                source,
                Arc::clone(&mailbox),
                self.frame_interval(),
                cursor_tx,
                applied_rx,
                self.logger.clone(),
            )
            .in_current_span(),
        );

        let capture_result = capture.await;
        // Whatever happened to capture, let processing drain and stop
        mailbox.close();

        let capture_failures = capture_result??;
        let lock_cycles = input.await??;
        let outcomes = processing.await??;

        let report = SessionReport {
            session_id: self.logger.session_id().to_string(),
            frames_total,
            frames_posted: mailbox.posted(),
            frames_dropped: mailbox.dropped(),
            capture_failures,
            outcomes,
            lock_cycles,
            overlay_redraws: sink.len(),
            final_state: pipeline.state(),
            final_rect: pipeline.rect(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        self.logger.log_completion(&format!(
            "processed {}, dropped {}, lock cycles {}, final state {}",
            report.frames_processed(),
            report.frames_dropped,
            report.lock_cycles,
            report.final_state
        ));
        Ok(report)
    }
}

/// Post every frame at the given cadence. Returns the capture failure count.
async fn capture_frames(
    source: CaptureSource,
    mailbox: Arc<FrameMailbox>,
    interval: Duration,
    cursor: watch::Sender<usize>,
    mut applied: watch::Receiver<Option<usize>>,
    logger: SessionLogger,
) -> WorkerResult<u64> {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut failures = 0u64;
    let total = source.paths().len();

    for index in 0..total {
        ticker.tick().await;

        if index > 0 && index % PROGRESS_EVERY == 0 {
            logger.log_progress(&format!(
                "captured {} of {} frames, {} posted, {} dropped",
                index,
                total,
                mailbox.posted(),
                mailbox.dropped()
            ));
        }

        announce(&cursor, &mut applied, index).await?;

        match source.read(index).await {
            Ok(frame) => {
                if let Some(displaced) = mailbox.post(frame) {
                    debug!(sequence = displaced, "Unprocessed frame replaced");
                }
            }
            Err(e) => {
                failures += 1;
                metrics::record_capture_failure(e.kind());
                logger.log_warning(&format!(
                    "frame {} ({}) skipped: {}",
                    index,
                    source.paths()[index].display(),
                    e
                ));
            }
        }
    }

    // Flush events keyed past the last frame
    announce(&cursor, &mut applied, usize::MAX).await?;
    Ok(failures)
}

/// Move the cursor to `index` and wait for the input task to catch up.
async fn announce(
    cursor: &watch::Sender<usize>,
    applied: &mut watch::Receiver<Option<usize>>,
    index: usize,
) -> WorkerResult<()> {
    cursor
        .send(index)
        .map_err(|_| WorkerError::task_failed("input task stopped"))?;
    applied
        .wait_for(|done| done.is_some_and(|done| done >= index))
        .await
        .map_err(|_| WorkerError::task_failed("input task stopped"))?;
    Ok(())
}

/// Apply recorded events as the capture cursor advances. Returns the
/// number of lock cycles started.
async fn deliver_events(
    pipeline: Arc<FramePipeline>,
    events: Vec<TimedEvent>,
    mut cursor: watch::Receiver<usize>,
    applied: watch::Sender<Option<usize>>,
) -> WorkerResult<u64> {
    let mut next = 0;
    let mut lock_cycles = 0u64;

    loop {
        let position = *cursor.borrow_and_update();

        while let Some(timed) = events.get(next).filter(|e| e.frame <= position) {
            let transition = pipeline.handle_input(timed.event);
            if transition.lock_changed && transition.to.is_locked() {
                lock_cycles += 1;
            }
            debug!(
                frame = timed.frame,
                event = timed.event.kind(),
                from = %transition.from,
                to = %transition.to,
                "Input applied"
            );
            next += 1;
        }

        // Capture may already be gone after the final announcement
        let _ = applied.send(Some(position));
        if position == usize::MAX || cursor.changed().await.is_err() {
            break;
        }
    }

    Ok(lock_cycles)
}

/// Run frame cycles until the mailbox closes. Returns outcome counts.
async fn process_frames(
    pipeline: Arc<FramePipeline>,
    mailbox: Arc<FrameMailbox>,
) -> WorkerResult<BTreeMap<String, u64>> {
    let mut outcomes = BTreeMap::new();

    while let Some(frame) = mailbox.recv().await {
        let pipeline = Arc::clone(&pipeline);
        let outcome = tokio::task::spawn_blocking(move || pipeline.on_frame(&frame)).await?;
        *outcomes.entry(outcome.as_str().to_string()).or_insert(0) += 1;
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::path::{Path, PathBuf};
    use tracklock_media::TrackingConfig;
    use tracklock_models::{Extent, InputEvent};

    /// Write a textured 240x320 still with a striped block at (bx, by).
    fn write_scene(dir: &Path, index: usize, bx: u32, by: u32) -> PathBuf {
        let gray = GrayImage::from_fn(240, 320, |x, y| {
            let inside = x >= bx && x < bx + 30 && y >= by && y < by + 30;
            if inside {
                Luma([if (x - bx + y - by) % 6 < 3 { 250 } else { 170 }])
            } else {
                Luma([((x * 5 + y * 3) % 30) as u8 + 10])
            }
        });
        let path = dir.join(format!("{:04}.png", index));
        gray.save(&path).unwrap();
        path
    }

    fn config() -> WorkerConfig {
        WorkerConfig {
            tracking: TrackingConfig {
                rotate_frames: false,
                ..Default::default()
            },
            frame_interval: Duration::from_millis(5),
            metrics_enabled: false,
        }
    }

    fn manifest(frames: Vec<PathBuf>, events: Vec<TimedEvent>) -> SessionManifest {
        SessionManifest {
            overlay: Extent::new(240, 320),
            frame_interval_ms: None,
            frames,
            events,
        }
    }

    fn at(frame: usize, event: InputEvent) -> TimedEvent {
        TimedEvent { frame, event }
    }

    #[tokio::test]
    async fn test_replay_locks_and_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<PathBuf> = (0..6)
            .map(|i| write_scene(dir.path(), i, 60 + i as u32 * 2, 100 + i as u32))
            .collect();
        let events = vec![
            at(0, InputEvent::select_start(60.0, 100.0)),
            at(0, InputEvent::select_drag(90.0, 130.0)),
            at(1, InputEvent::ToggleLock),
        ];

        let runner = SessionRunner::new(config(), manifest(frames, events)).unwrap();
        let session_id = runner.session_id().to_string();
        let report = runner.run().await.unwrap();

        assert_eq!(report.session_id, session_id);
        assert_eq!(report.frames_total, 6);
        assert_eq!(report.frames_posted, 6);
        assert_eq!(report.capture_failures, 0);
        assert_eq!(report.frames_processed() + report.frames_dropped, 6);
        assert_eq!(report.lock_cycles, 1);
        assert_eq!(report.outcome_count("dropped"), 0);
        assert_eq!(report.outcome_count("initialized"), 1);
        assert_eq!(report.final_state, TrackingState::LockedTracking);
        assert!(report.final_rect.is_some());
        assert!(report.overlay_redraws >= 3);
    }

    #[tokio::test]
    async fn test_unlock_after_last_frame_ends_idle() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<PathBuf> = (0..3)
            .map(|i| write_scene(dir.path(), i, 60, 100))
            .collect();
        let events = vec![
            at(0, InputEvent::select_start(60.0, 100.0)),
            at(0, InputEvent::select_drag(90.0, 130.0)),
            at(0, InputEvent::ToggleLock),
            at(3, InputEvent::ToggleLock),
        ];

        let report = SessionRunner::new(config(), manifest(frames, events))
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(report.lock_cycles, 1);
        assert_eq!(report.final_state, TrackingState::Idle);
    }

    #[tokio::test]
    async fn test_missing_frames_are_counted_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![
            write_scene(dir.path(), 0, 60, 100),
            dir.path().join("gone.png"),
            write_scene(dir.path(), 2, 60, 100),
        ];

        let report = SessionRunner::new(config(), manifest(frames, Vec::new()))
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(report.capture_failures, 1);
        assert_eq!(report.frames_posted, 2);
        assert_eq!(report.outcome_count("idle") + report.frames_dropped, 2);
        assert_eq!(report.final_state, TrackingState::Idle);
        assert_eq!(report.lock_cycles, 0);
    }

    #[test]
    fn test_runner_rejects_invalid_manifest() {
        let err = SessionRunner::new(config(), manifest(Vec::new(), Vec::new())).unwrap_err();
        assert!(matches!(err, WorkerError::InvalidManifest(_)));
    }
}
