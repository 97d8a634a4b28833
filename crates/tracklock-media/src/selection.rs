//! Selection state machine.
//!
//! Tracks whether the user is drawing a selection, holds a locked target, or
//! has nothing selected, and decides when the pipeline must seed a new
//! tracker versus update the existing one.
//!
//! The machine is plain data with no locking of its own; the pipeline owns
//! it inside its session mutex so input events and frame completions are
//! applied one at a time.
//!
//! Every lock toggle bumps a *generation* counter. A frame cycle remembers
//! the generation it started under and its result is only applied if the
//! generation is unchanged when it finishes, so an unlock that races with a
//! slow tracker call always wins.

use tracing::debug;
use tracklock_models::{
    DrawStyle, Extent, InputEvent, OverlayRect, Point, ReleasePolicy, TrackLossPolicy,
    TrackingState,
};

/// Outcome of applying one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: TrackingState,
    pub to: TrackingState,
    /// The overlay must be redrawn
    pub redraw: bool,
    /// The lock was acquired or released by this event
    pub lock_changed: bool,
}

impl Transition {
    fn unchanged(state: TrackingState) -> Self {
        Self {
            from: state,
            to: state,
            redraw: false,
            lock_changed: false,
        }
    }

    /// True when the event left the lock released after holding it.
    pub fn released_lock(&self) -> bool {
        self.lock_changed && self.from.is_locked() && !self.to.is_locked()
    }
}

/// What the overlay should draw for the current state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayFrame {
    pub rect: Option<OverlayRect>,
    pub style: DrawStyle,
    pub state: TrackingState,
}

impl OverlayFrame {
    /// Center of the crosshair lines, drawn only while tracking.
    pub fn crosshair(&self) -> Option<Point> {
        match (self.style, self.rect) {
            (DrawStyle::Crosshair, Some(rect)) => Some(rect.center()),
            _ => None,
        }
    }
}

/// Seed handed to the pipeline when a lock is waiting for its first frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockSeed {
    pub generation: u64,
    pub rect: Option<OverlayRect>,
}

/// Selection and lock state for one overlay surface.
#[derive(Debug, Clone)]
pub struct SelectionMachine {
    state: TrackingState,
    rect: Option<OverlayRect>,
    pre_lock_rect: Option<OverlayRect>,
    generation: u64,
    release_policy: ReleasePolicy,
    /// Touch points are pulled inside this surface when set
    bounds: Option<Extent>,
}

impl SelectionMachine {
    pub fn new(release_policy: ReleasePolicy) -> Self {
        Self {
            state: TrackingState::Idle,
            rect: None,
            pre_lock_rect: None,
            generation: 0,
            release_policy,
            bounds: None,
        }
    }

    /// Machine whose touch points are clamped to `bounds`.
    pub fn with_bounds(release_policy: ReleasePolicy, bounds: Extent) -> Self {
        let mut machine = Self::new(release_policy);
        machine.bounds = Some(bounds);
        machine
    }

    pub fn bounds(&self) -> Option<Extent> {
        self.bounds
    }

    /// Resize the touch surface. Boxes already drawn are pulled inside it.
    pub fn set_bounds(&mut self, bounds: Extent) {
        self.bounds = Some(bounds);
        self.rect = self.rect.map(|r| r.clamp_to(bounds));
        self.pre_lock_rect = self.pre_lock_rect.map(|r| r.clamp_to(bounds));
    }

    fn clamp(&self, point: Point) -> Point {
        match self.bounds {
            Some(bounds) => point.clamp_to(bounds),
            None => point,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Current selection in overlay space, as drawn or as last tracked.
    pub fn rect(&self) -> Option<OverlayRect> {
        self.rect
    }

    /// Lock generation; changes on every lock toggle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Apply one input event.
    pub fn handle(&mut self, event: InputEvent) -> Transition {
        let from = self.state;

        match event {
            InputEvent::ToggleLock => return self.toggle_lock(),
            // Box is driven by the tracker while locked
            _ if from.is_locked() => return Transition::unchanged(from),
            InputEvent::SelectStart { point } => {
                self.state = TrackingState::Drawing;
                self.rect = Some(OverlayRect::at_point(self.clamp(point)));
            }
            InputEvent::SelectDrag { point } => {
                if from != TrackingState::Drawing {
                    return Transition::unchanged(from);
                }
                let point = self.clamp(point);
                self.rect = self.rect.map(|r| r.with_second_corner(point));
            }
            InputEvent::SelectEnd => {
                if from != TrackingState::Drawing {
                    return Transition::unchanged(from);
                }
                self.state = TrackingState::Idle;
                if self.release_policy == ReleasePolicy::Discard {
                    self.rect = None;
                }
            }
        }

        Transition {
            from,
            to: self.state,
            redraw: true,
            lock_changed: false,
        }
    }

    fn toggle_lock(&mut self) -> Transition {
        let from = self.state;
        self.generation = self.generation.wrapping_add(1);

        if from.is_locked() {
            if from == TrackingState::LockedInitializing {
                self.rect = self.pre_lock_rect;
            }
            self.state = TrackingState::Idle;
        } else {
            self.pre_lock_rect = self.rect;
            self.state = TrackingState::LockedInitializing;
        }

        debug!(
            from = %from,
            to = %self.state,
            generation = self.generation,
            "Lock toggled"
        );

        Transition {
            from,
            to: self.state,
            redraw: true,
            lock_changed: true,
        }
    }

    /// Seed for tracker initialization, if a lock awaits its first frame.
    pub fn pending_seed(&self) -> Option<LockSeed> {
        (self.state == TrackingState::LockedInitializing).then_some(LockSeed {
            generation: self.generation,
            rect: self.rect,
        })
    }

    /// Whether a frame cycle started under `generation` may still apply.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Tracker seeded successfully: start tracking.
    ///
    /// Returns false if the lock changed while the tracker was being seeded.
    pub fn complete_init(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) || self.state != TrackingState::LockedInitializing {
            return false;
        }
        self.state = TrackingState::LockedTracking;
        true
    }

    /// Tracker could not be seeded: drop the lock and restore the pre-lock box.
    pub fn abort_init(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) || self.state != TrackingState::LockedInitializing {
            return false;
        }
        self.state = TrackingState::Idle;
        self.rect = self.pre_lock_rect;
        true
    }

    /// Replace the box with the tracker's latest estimate.
    pub fn apply_track(&mut self, generation: u64, rect: OverlayRect) -> bool {
        if !self.is_current(generation) || self.state != TrackingState::LockedTracking {
            return false;
        }
        self.rect = Some(rect);
        true
    }

    /// Handle a lost target. Returns true if the lock was released.
    pub fn track_lost(&mut self, generation: u64, policy: TrackLossPolicy) -> bool {
        if !self.is_current(generation) || self.state != TrackingState::LockedTracking {
            return false;
        }
        match policy {
            TrackLossPolicy::KeepLastKnown => false,
            TrackLossPolicy::RevertToIdle => {
                self.state = TrackingState::Idle;
                self.generation = self.generation.wrapping_add(1);
                true
            }
        }
    }

    pub fn draw_style(&self) -> DrawStyle {
        match (self.state, self.rect) {
            (_, None) => DrawStyle::Hidden,
            (TrackingState::LockedTracking, Some(_)) => DrawStyle::Crosshair,
            _ => DrawStyle::Outline,
        }
    }

    pub fn overlay_frame(&self) -> OverlayFrame {
        OverlayFrame {
            rect: self.rect,
            style: self.draw_style(),
            state: self.state,
        }
    }
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new(ReleasePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawn(machine: &mut SelectionMachine) {
        machine.handle(InputEvent::select_start(100.0, 100.0));
        machine.handle(InputEvent::select_drag(200.0, 250.0));
        machine.handle(InputEvent::select_drag(300.0, 300.0));
    }

    #[test]
    fn test_start_sets_both_corners() {
        let mut machine = SelectionMachine::default();
        let t = machine.handle(InputEvent::select_start(10.0, 20.0));

        assert_eq!(t.from, TrackingState::Idle);
        assert_eq!(t.to, TrackingState::Drawing);
        assert!(t.redraw);
        assert_eq!(machine.rect(), Some(OverlayRect::new(10.0, 20.0, 10.0, 20.0)));
    }

    #[test]
    fn test_drag_moves_second_corner_only() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        assert_eq!(machine.state(), TrackingState::Drawing);
        assert_eq!(machine.rect(), Some(OverlayRect::new(100.0, 100.0, 300.0, 300.0)));
        assert_eq!(machine.draw_style(), DrawStyle::Outline);
    }

    #[test]
    fn test_release_discards_box_by_default() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        let t = machine.handle(InputEvent::SelectEnd);

        assert_eq!(t.to, TrackingState::Idle);
        assert_eq!(machine.rect(), None);
        assert_eq!(machine.draw_style(), DrawStyle::Hidden);
    }

    #[test]
    fn test_release_keeps_box_with_keep_policy() {
        let mut machine = SelectionMachine::new(ReleasePolicy::Keep);
        drawn(&mut machine);
        machine.handle(InputEvent::SelectEnd);

        assert_eq!(machine.state(), TrackingState::Idle);
        assert_eq!(machine.rect(), Some(OverlayRect::new(100.0, 100.0, 300.0, 300.0)));

        machine.handle(InputEvent::ToggleLock);
        let seed = machine.pending_seed().unwrap();
        assert_eq!(seed.rect, Some(OverlayRect::new(100.0, 100.0, 300.0, 300.0)));
    }

    #[test]
    fn test_drag_without_start_is_ignored() {
        let mut machine = SelectionMachine::default();
        let t = machine.handle(InputEvent::select_drag(5.0, 5.0));
        assert!(!t.redraw);
        assert_eq!(machine.rect(), None);
        assert!(!machine.handle(InputEvent::SelectEnd).redraw);
    }

    #[test]
    fn test_lock_enters_initializing_with_seed() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        let t = machine.handle(InputEvent::ToggleLock);

        assert_eq!(t.to, TrackingState::LockedInitializing);
        assert!(t.lock_changed);
        assert!(!t.released_lock());
        let seed = machine.pending_seed().unwrap();
        assert_eq!(seed.generation, machine.generation());
        assert_eq!(seed.rect, Some(OverlayRect::new(100.0, 100.0, 300.0, 300.0)));
        assert_eq!(machine.draw_style(), DrawStyle::Outline);
    }

    #[test]
    fn test_drawing_ignored_while_locked() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        machine.handle(InputEvent::ToggleLock);
        let before = machine.rect();

        for event in [
            InputEvent::select_start(1.0, 1.0),
            InputEvent::select_drag(2.0, 2.0),
            InputEvent::SelectEnd,
        ] {
            let t = machine.handle(event);
            assert!(!t.redraw);
            assert_eq!(t.to, TrackingState::LockedInitializing);
        }
        assert_eq!(machine.rect(), before);
    }

    #[test]
    fn test_double_toggle_restores_pre_lock_box() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        let before = machine.rect();

        machine.handle(InputEvent::ToggleLock);
        let t = machine.handle(InputEvent::ToggleLock);

        assert!(t.released_lock());
        assert_eq!(machine.state(), TrackingState::Idle);
        assert_eq!(machine.rect(), before);
    }

    #[test]
    fn test_tracking_requires_initializing_first() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        // Not locked: init completion must be refused
        assert!(!machine.complete_init(machine.generation()));
        assert_eq!(machine.state(), TrackingState::Drawing);

        machine.handle(InputEvent::ToggleLock);
        let gen = machine.generation();
        assert!(machine.complete_init(gen));
        assert_eq!(machine.state(), TrackingState::LockedTracking);
        assert_eq!(machine.draw_style(), DrawStyle::Crosshair);

        // Completing again is refused
        assert!(!machine.complete_init(gen));
    }

    #[test]
    fn test_stale_generation_is_refused() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        machine.handle(InputEvent::ToggleLock);
        let gen = machine.generation();
        machine.complete_init(gen);

        machine.handle(InputEvent::ToggleLock);
        assert!(!machine.apply_track(gen, OverlayRect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(machine.state(), TrackingState::Idle);
    }

    #[test]
    fn test_abort_init_restores_box() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        let before = machine.rect();
        machine.handle(InputEvent::ToggleLock);

        assert!(machine.abort_init(machine.generation()));
        assert_eq!(machine.state(), TrackingState::Idle);
        assert_eq!(machine.rect(), before);
    }

    #[test]
    fn test_track_lost_policies() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        machine.handle(InputEvent::ToggleLock);
        let gen = machine.generation();
        machine.complete_init(gen);

        assert!(!machine.track_lost(gen, TrackLossPolicy::KeepLastKnown));
        assert_eq!(machine.state(), TrackingState::LockedTracking);

        assert!(machine.track_lost(gen, TrackLossPolicy::RevertToIdle));
        assert_eq!(machine.state(), TrackingState::Idle);
        assert_ne!(machine.generation(), gen);
    }

    #[test]
    fn test_crosshair_at_box_center() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        assert_eq!(machine.overlay_frame().crosshair(), None);

        machine.handle(InputEvent::ToggleLock);
        machine.complete_init(machine.generation());
        assert_eq!(
            machine.overlay_frame().crosshair(),
            Some(Point::new(200.0, 200.0))
        );
    }

    #[test]
    fn test_points_clamped_to_bounds() {
        let mut machine =
            SelectionMachine::with_bounds(ReleasePolicy::Keep, Extent::new(1000, 1000));
        machine.handle(InputEvent::select_start(100.0, 100.0));
        machine.handle(InputEvent::select_drag(-20.0, -5.0));
        assert_eq!(machine.rect(), Some(OverlayRect::new(100.0, 100.0, 0.0, 0.0)));

        machine.handle(InputEvent::select_start(900.0, 1200.0));
        machine.handle(InputEvent::select_drag(1010.0, 950.0));
        let rect = machine.rect().unwrap();
        assert_eq!(rect, OverlayRect::new(900.0, 1000.0, 1000.0, 950.0));
        assert!(rect.is_non_negative());
    }

    #[test]
    fn test_set_bounds_pulls_box_inside() {
        let mut machine = SelectionMachine::default();
        drawn(&mut machine);
        machine.set_bounds(Extent::new(250, 250));

        assert_eq!(machine.bounds(), Some(Extent::new(250, 250)));
        assert_eq!(machine.rect(), Some(OverlayRect::new(100.0, 100.0, 250.0, 250.0)));
    }
}
