//! Frame processing pipeline.
//!
//! Glues input events and decoded frames to the tracker:
//! - input events drive the [`SelectionMachine`]
//! - each frame either seeds a tracker (first frame after a lock), updates
//!   it (every later frame), or is discarded (no lock)
//!
//! # Concurrency
//! Frames and input events may arrive on different threads. All mutable
//! state (machine, tracker slot, overlay size) lives in one mutex. Tracker
//! calls run outside that mutex: the handle is taken out for the duration
//! of the call and put back afterwards, so a toggle never waits on a slow
//! tracker. The cycle records the lock generation it started under and
//! throws its result away if the generation moved in the meantime.
//!
//! At most one frame cycle runs at a time. A frame arriving while another
//! is in flight is dropped on the spot.

use crate::config::TrackingConfig;
use crate::error::{TrackError, TrackResult};
use crate::frame::Frame;
use crate::mapping::CoordinateMapper;
use crate::metrics;
use crate::overlay::{NullOverlay, OverlaySink};
use crate::selection::{OverlayFrame, SelectionMachine, Transition};
use crate::tracker::{default_factory, TrackerFactory, TrackerHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};
use tracklock_models::{Extent, InputEvent, OverlayRect, TrackingState};

/// Result of one `on_frame` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Another cycle was in flight; the frame was not looked at
    Dropped,
    /// No lock held; nothing to track
    Idle,
    /// Tracker seeded; the lock is now tracking
    Initialized(OverlayRect),
    /// Tracker advanced; the box moved here
    Tracked(OverlayRect),
    /// The tracker lost the target this frame
    Lost,
    /// The tracker could not be seeded; the lock was dropped
    InitFailed,
    /// The lock changed while the tracker ran; the result was discarded
    Superseded,
}

impl FrameOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameOutcome::Dropped => "dropped",
            FrameOutcome::Idle => "idle",
            FrameOutcome::Initialized(_) => "initialized",
            FrameOutcome::Tracked(_) => "tracked",
            FrameOutcome::Lost => "lost",
            FrameOutcome::InitFailed => "init_failed",
            FrameOutcome::Superseded => "superseded",
        }
    }

    /// Overlay box produced by this cycle, if any.
    pub fn rect(&self) -> Option<OverlayRect> {
        match self {
            FrameOutcome::Initialized(rect) | FrameOutcome::Tracked(rect) => Some(*rect),
            _ => None,
        }
    }
}

/// In-flight marker for one frame cycle.
///
/// Cleared on drop, so every exit path (early return, error, unwinding
/// panic) releases it.
#[derive(Debug)]
pub struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    /// Claim the flag, or `None` if a cycle already holds it.
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Everything the mutex protects.
#[derive(Debug)]
struct Session {
    machine: SelectionMachine,
    tracker: Option<TrackerHandle>,
    overlay_extent: Extent,
}

/// Work decided under the lock and carried out after releasing it.
enum Work {
    Init {
        generation: u64,
        seed: Option<OverlayRect>,
        overlay_extent: Extent,
    },
    Update {
        generation: u64,
        handle: TrackerHandle,
        overlay_extent: Extent,
    },
}

/// Per-session tracking pipeline.
pub struct FramePipeline {
    config: TrackingConfig,
    factory: Arc<dyn TrackerFactory>,
    overlay: Arc<dyn OverlaySink>,
    session: Mutex<Session>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("config", &self.config)
            .field("backend", &self.factory.name())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

fn check_overlay_extent(extent: Extent) -> TrackResult<()> {
    if extent.is_empty() {
        return Err(TrackError::invalid_geometry(format!(
            "overlay extent {} has a zero side",
            extent
        )));
    }
    Ok(())
}

impl FramePipeline {
    /// Create a pipeline with an explicit tracker backend and overlay sink.
    pub fn new(
        config: TrackingConfig,
        overlay_extent: Extent,
        factory: Arc<dyn TrackerFactory>,
        overlay: Arc<dyn OverlaySink>,
    ) -> TrackResult<Self> {
        check_overlay_extent(overlay_extent)?;

        info!(
            backend = factory.name(),
            tracker = %config.tracker_variant,
            release_policy = %config.release_policy,
            loss_policy = %config.loss_policy,
            overlay = %overlay_extent,
            "Tracking pipeline created"
        );

        Ok(Self {
            session: Mutex::new(Session {
                machine: SelectionMachine::with_bounds(config.release_policy, overlay_extent),
                tracker: None,
                overlay_extent,
            }),
            config,
            factory,
            overlay,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Create a pipeline with this build's default backend and no overlay.
    pub fn with_defaults(config: TrackingConfig, overlay_extent: Extent) -> TrackResult<Self> {
        let factory = default_factory(&config);
        Self::new(config, overlay_extent, factory, Arc::new(NullOverlay))
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn state(&self) -> TrackingState {
        self.lock().machine.state()
    }

    /// Current box in overlay space.
    pub fn rect(&self) -> Option<OverlayRect> {
        self.lock().machine.rect()
    }

    pub fn generation(&self) -> u64 {
        self.lock().machine.generation()
    }

    /// Whether a tracker handle is parked in the session.
    pub fn has_tracker(&self) -> bool {
        self.lock().tracker.is_some()
    }

    pub fn overlay_frame(&self) -> OverlayFrame {
        self.lock().machine.overlay_frame()
    }

    pub fn overlay_extent(&self) -> Extent {
        self.lock().overlay_extent
    }

    /// Resize the overlay surface. Applies from the next frame cycle.
    pub fn set_overlay_extent(&self, extent: Extent) -> TrackResult<()> {
        check_overlay_extent(extent)?;
        let mut session = self.lock();
        session.overlay_extent = extent;
        session.machine.set_bounds(extent);
        drop(session);
        debug!(overlay = %extent, "Overlay resized");
        Ok(())
    }

    /// True while a frame cycle is running.
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight slot directly. Frames arriving while the
    /// returned guard lives are dropped.
    pub fn try_begin_cycle(&self) -> Option<ProcessingGuard<'_>> {
        ProcessingGuard::try_acquire(&self.in_flight)
    }

    /// Apply one input event.
    ///
    /// Releasing the lock destroys the parked tracker immediately. A tracker
    /// that is out on a frame cycle is destroyed when that cycle completes.
    pub fn handle_input(&self, event: InputEvent) -> Transition {
        let (transition, overlay_frame) = {
            let mut session = self.lock();
            let transition = session.machine.handle(event);

            if transition.released_lock() {
                let had_tracker = session.tracker.take().is_some();
                info!(
                    from = %transition.from,
                    generation = session.machine.generation(),
                    had_tracker,
                    "Lock released"
                );
            } else if transition.lock_changed {
                info!(
                    tracker = %self.config.tracker_variant,
                    generation = session.machine.generation(),
                    seed = ?session.machine.rect(),
                    "Lock cycle started"
                );
                metrics::record_lock_cycle(self.config.tracker_variant.as_str());
            }

            (transition, session.machine.overlay_frame())
        };

        if transition.redraw {
            self.overlay.redraw(overlay_frame);
        }
        transition
    }

    /// Run one frame cycle.
    pub fn on_frame(&self, frame: &Frame) -> FrameOutcome {
        metrics::record_frame_received();

        let Some(_guard) = self.try_begin_cycle() else {
            debug!(sequence = frame.sequence(), "Cycle in flight, frame dropped");
            metrics::record_frame_dropped("busy");
            return FrameOutcome::Dropped;
        };

        let outcome = self.process(frame);
        debug!(
            sequence = frame.sequence(),
            outcome = outcome.as_str(),
            "Frame processed"
        );
        metrics::record_frame_processed(outcome.as_str());
        outcome
    }

    fn process(&self, frame: &Frame) -> FrameOutcome {
        let work = {
            let mut session = self.lock();
            let overlay_extent = session.overlay_extent;
            match session.machine.state() {
                TrackingState::Idle | TrackingState::Drawing => {
                    if session.tracker.take().is_some() {
                        debug!("Released leftover tracker");
                    }
                    return FrameOutcome::Idle;
                }
                TrackingState::LockedInitializing => {
                    session.tracker = None;
                    let generation = session.machine.generation();
                    let seed = session.machine.pending_seed().and_then(|s| s.rect);
                    Work::Init {
                        generation,
                        seed,
                        overlay_extent,
                    }
                }
                TrackingState::LockedTracking => match session.tracker.take() {
                    Some(handle) => Work::Update {
                        generation: session.machine.generation(),
                        handle,
                        overlay_extent,
                    },
                    None => {
                        warn!("Tracking without a tracker handle, frame skipped");
                        return FrameOutcome::Lost;
                    }
                },
            }
        };

        match work {
            Work::Init {
                generation,
                seed,
                overlay_extent,
            } => self.initialize(frame, generation, seed, overlay_extent),
            Work::Update {
                generation,
                handle,
                overlay_extent,
            } => self.update(frame, generation, handle, overlay_extent),
        }
    }

    fn initialize(
        &self,
        frame: &Frame,
        generation: u64,
        seed: Option<OverlayRect>,
        overlay_extent: Extent,
    ) -> FrameOutcome {
        let variant = self.config.tracker_variant;
        let started = Instant::now();

        let result = seed
            .ok_or_else(|| TrackError::invalid_geometry("no selection to lock"))
            .and_then(|seed| {
                let mapper = CoordinateMapper::new(overlay_extent, frame.extent())?;
                if !mapper.is_uniform() {
                    debug!(
                        scale_x = mapper.scale_x(),
                        scale_y = mapper.scale_y(),
                        "Overlay and frame aspect ratios differ"
                    );
                }
                let frame_rect = mapper.to_frame_space(&seed);
                let handle =
                    TrackerHandle::init(self.factory.as_ref(), variant, frame, &frame_rect)?;
                Ok((seed, handle))
            });

        metrics::record_tracker_duration(
            variant.as_str(),
            "init",
            started.elapsed().as_secs_f64(),
        );

        let (outcome, overlay_frame) = {
            let mut session = self.lock();
            let outcome = match result {
                Ok((seed, handle)) => {
                    if session.machine.complete_init(generation) {
                        session.tracker = Some(handle);
                        info!(tracker = %variant, generation, rect = %seed, "Tracking started");
                        FrameOutcome::Initialized(seed)
                    } else {
                        debug!(generation, "Lock changed during init, tracker discarded");
                        FrameOutcome::Superseded
                    }
                }
                Err(e) => {
                    if session.machine.abort_init(generation) {
                        metrics::record_init_failure(variant.as_str(), e.kind());
                        warn!(tracker = %variant, error = %e, "Tracker init failed, lock dropped");
                        FrameOutcome::InitFailed
                    } else {
                        FrameOutcome::Superseded
                    }
                }
            };
            (outcome, session.machine.overlay_frame())
        };

        if outcome != FrameOutcome::Superseded {
            self.overlay.redraw(overlay_frame);
        }
        outcome
    }

    fn update(
        &self,
        frame: &Frame,
        generation: u64,
        mut handle: TrackerHandle,
        overlay_extent: Extent,
    ) -> FrameOutcome {
        let variant = handle.variant();
        let started = Instant::now();

        let result = CoordinateMapper::new(overlay_extent, frame.extent()).and_then(|mapper| {
            handle
                .update(frame)
                .map(|rect| mapper.to_overlay_space(&rect))
        });

        metrics::record_tracker_duration(
            variant.as_str(),
            "update",
            started.elapsed().as_secs_f64(),
        );

        let (outcome, overlay_frame) = {
            let mut session = self.lock();
            if !session.machine.is_current(generation)
                || session.machine.state() != TrackingState::LockedTracking
            {
                debug!(generation, "Lock changed during update, tracker discarded");
                return FrameOutcome::Superseded;
            }

            let outcome = match result {
                Ok(rect) => {
                    session.machine.apply_track(generation, rect);
                    session.tracker = Some(handle);
                    FrameOutcome::Tracked(rect)
                }
                Err(e) => {
                    metrics::record_track_loss(variant.as_str());
                    if session.machine.track_lost(generation, self.config.loss_policy) {
                        info!(tracker = %variant, error = %e, "Target lost, lock released");
                    } else {
                        debug!(tracker = %variant, error = %e, "Target lost, keeping last box");
                        session.tracker = Some(handle);
                    }
                    FrameOutcome::Lost
                }
            };
            (outcome, session.machine.overlay_frame())
        };

        self.overlay.redraw(overlay_frame);
        outcome
    }
}
