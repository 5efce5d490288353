// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-toplevel frame pacing state machine.
//!
//! A [`SyncHelper`] sits between repaint requests and a subcompositor. It
//! decides, per frame, whether pacing follows the host's frame clock or the
//! render target's presentation feedback, defers repaints while the host is
//! still consuming the previous frame, and releases frame callbacks once a
//! frame is truly done.
//!
//! Frame notes reach the helper through its [`FrameObserver`]
//! implementation: every scene call the helper makes passes itself as the
//! observer. A deferred repaint that becomes due while a note is being
//! handled is performed once the scene call returns.

use std::fmt;

use weft_core::backend::{
    CompletionKey, FrameNote, FrameObserver, RenderMode, RenderTarget, SynchronizationType,
};
use weft_core::subcompositor::UpdateOutcome;
use weft_core::trace::{PacingDecision, PacingEvent};
use weft_core::view::{Scene, SubcompositorId};

use crate::clock::FrameClock;
use crate::frame_time::FrameTimeReconciler;
use crate::time::{MonotonicTime, TimeSource};

/// Pacing preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SyncConfig {
    /// Pace with presentation feedback when the target supports it.
    pub prefer_presentation: bool,
    /// Ask the frame clock to accept frames before the host drew the last.
    pub allow_batch: bool,
}

impl SyncConfig {
    /// Presentation when available, no batching.
    pub const DEFAULT: Self = Self {
        prefer_presentation: true,
        allow_batch: false,
    };
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where the current frame is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// No frame in flight.
    Idle,
    /// The subcompositor started a frame and the target has not finished it.
    Drawing {
        /// The frame clock accepted the frame; the host must acknowledge it.
        clock_frame: bool,
    },
    /// The target finished; the host has not drawn the frame yet.
    AwaitingHost,
}

/// Frame pacing for one subcompositor.
pub struct SyncHelper<C> {
    sub: SubcompositorId,
    clock: C,
    config: SyncConfig,
    state: FrameState,
    /// A repaint was requested while it was unsafe to draw.
    frame_pending: bool,
    /// The next frame must be paced by the frame clock.
    force_frame_clock: bool,
    /// A pending repaint became due during a scene call.
    drain_requested: bool,
    pending_frame_id: Option<u64>,
    sync_type: Option<SynchronizationType>,
    last_presentation: Option<(u64, u64)>,
    reconciler: FrameTimeReconciler,
    time: Box<dyn TimeSource>,
    frame_done: Option<Box<dyn FnMut(u32)>>,
    resize_begin: Option<Box<dyn FnMut()>>,
    /// Decisions taken while the scene was borrowed, not yet traced.
    decisions: Vec<PacingDecision>,
}

impl<C: fmt::Debug> fmt::Debug for SyncHelper<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHelper")
            .field("sub", &self.sub)
            .field("clock", &self.clock)
            .field("state", &self.state)
            .field("frame_pending", &self.frame_pending)
            .field("force_frame_clock", &self.force_frame_clock)
            .field("sync_type", &self.sync_type)
            .field("last_presentation", &self.last_presentation)
            .finish_non_exhaustive()
    }
}

impl<C: FrameClock> SyncHelper<C> {
    /// Creates a helper pacing `sub` with `clock`, timestamping frame
    /// callbacks with `time`.
    pub fn new(
        sub: SubcompositorId,
        clock: C,
        config: SyncConfig,
        time: impl TimeSource + 'static,
    ) -> Self {
        Self {
            sub,
            clock,
            config,
            state: FrameState::Idle,
            frame_pending: false,
            force_frame_clock: false,
            drain_requested: false,
            pending_frame_id: None,
            sync_type: None,
            last_presentation: None,
            reconciler: FrameTimeReconciler::new(),
            time: Box::new(time),
            frame_done: None,
            resize_begin: None,
            decisions: Vec::new(),
        }
    }

    /// Creates a helper timestamping with `CLOCK_MONOTONIC`.
    pub fn with_monotonic(sub: SubcompositorId, clock: C, config: SyncConfig) -> Self {
        Self::new(sub, clock, config, MonotonicTime)
    }

    /// Sets the callback releasing the surface's frame callbacks. It
    /// receives the protocol timestamp in milliseconds.
    pub fn set_frame_done_callback(&mut self, callback: Option<Box<dyn FnMut(u32)>>) {
        self.frame_done = callback;
    }

    /// Sets the callback run when the host begins a resize.
    pub fn set_resize_begin_callback(&mut self, callback: Option<Box<dyn FnMut()>>) {
        self.resize_begin = callback;
    }

    // -- Accessors --

    /// The paced subcompositor.
    #[must_use]
    pub const fn subcompositor(&self) -> SubcompositorId {
        self.sub
    }

    /// The frame clock.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// The frame clock, mutably, for feeding it host events.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Current frame state.
    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Whether a deferred repaint is waiting.
    #[must_use]
    pub const fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Mechanism chosen for the most recent frame.
    #[must_use]
    pub const fn synchronization(&self) -> Option<SynchronizationType> {
        self.sync_type
    }

    /// `(msc, ust)` of the last presented frame.
    #[must_use]
    pub const fn last_presentation(&self) -> Option<(u64, u64)> {
        self.last_presentation
    }

    /// Returns `true` when nothing is in flight or deferred, so the
    /// embedder may skip waiting for this window.
    #[must_use]
    pub fn can_fast_forward(&self) -> bool {
        self.state == FrameState::Idle && !self.frame_pending
    }

    // -- Operations --

    /// Requests a repaint.
    ///
    /// Returns `None` if drawing is currently unsafe and the repaint was
    /// deferred; it is then performed exactly once, when the host finishes
    /// the previous frame.
    pub fn update(&mut self, scene: &mut Scene) -> Option<UpdateOutcome> {
        if self.unsafe_to_draw() {
            self.frame_pending = true;
            self.decisions.push(PacingDecision::Deferred);
            self.finish(scene);
            return None;
        }
        let outcome = self.run_update(scene);
        self.finish(scene);
        Some(outcome)
    }

    /// Forwards an asynchronous frame completion. Returns `false` for
    /// unknown keys.
    pub fn frame_completed(&mut self, scene: &mut Scene, key: CompletionKey) -> bool {
        let known = scene.complete_frame(self.sub, key, self);
        self.finish(scene);
        known
    }

    /// Forwards a presentation completion. Returns `false` for unknown keys.
    pub fn presentation_completed(
        &mut self,
        scene: &mut Scene,
        key: CompletionKey,
        msc: u64,
        ust: u64,
    ) -> bool {
        let known = scene.complete_presentation(self.sub, key, msc, ust, self);
        self.finish(scene);
        known
    }

    /// The host drew the last frame. `frame_time_us` is the host's time for
    /// it, when supplied.
    pub fn after_frame(&mut self, scene: &mut Scene, frame_time_us: Option<u64>) {
        self.clock.frame_drawn();
        if self.state == FrameState::AwaitingHost {
            self.state = FrameState::Idle;
            self.resolve(frame_time_us);
        }
        self.finish(scene);
    }

    /// The host begins a resize.
    ///
    /// Drops any deferred repaint and paces the next frame with the frame
    /// clock, so the host can observe when the new size was drawn.
    pub fn freeze(&mut self, scene: &mut Scene) {
        self.frame_pending = false;
        self.force_frame_clock = true;
        if let Some(callback) = &mut self.resize_begin {
            callback();
        }
        self.decisions.push(PacingDecision::Freeze);
        self.finish(scene);
    }

    /// The window acknowledged a configure.
    pub fn note_configure(&mut self) {
        self.clock.note_configure();
    }

    // -- Internals --

    fn clock_synchronized(&self) -> bool {
        matches!(
            self.state,
            FrameState::Drawing { clock_frame: true } | FrameState::AwaitingHost
        )
    }

    fn unsafe_to_draw(&self) -> bool {
        self.clock_synchronized() && self.clock.frame_in_progress() && !self.clock.can_batch()
    }

    fn run_update(&mut self, scene: &mut Scene) -> UpdateOutcome {
        let outcome = scene.update(self.sub, self);
        // Nothing to draw: the client still expects its callbacks.
        if outcome == UpdateOutcome::Unchanged && self.state == FrameState::Idle {
            self.resolve(None);
        }
        outcome
    }

    /// Traces pending decisions and performs a repaint that became due.
    fn finish(&mut self, scene: &mut Scene) {
        loop {
            let sub = self.sub.index();
            for decision in self.decisions.drain(..) {
                scene.tracer().pacing(&PacingEvent {
                    subcompositor: sub,
                    decision,
                });
            }
            if !std::mem::take(&mut self.drain_requested) || !self.frame_pending {
                break;
            }
            self.frame_pending = false;
            self.decisions.push(PacingDecision::Drained);
            self.run_update(scene);
        }
    }

    /// The current frame is done: repaint if asked to, otherwise release
    /// frame callbacks.
    fn resolve(&mut self, host_time_us: Option<u64>) {
        if self.frame_pending {
            self.drain_requested = true;
            return;
        }
        let time_ms = self.reconciler.consider(self.time.now_us(), host_time_us);
        if let Some(callback) = &mut self.frame_done {
            callback(time_ms);
        }
        self.decisions.push(PacingDecision::FrameDone { time_ms });
    }

    fn wanted_synchronization(&mut self, target: &dyn RenderTarget) -> SynchronizationType {
        if self.state == FrameState::AwaitingHost {
            SynchronizationType::FrameClock
        } else if std::mem::take(&mut self.force_frame_clock) {
            SynchronizationType::FrameClock
        } else if self.config.prefer_presentation && target.supports_presentation() {
            SynchronizationType::Presentation
        } else {
            SynchronizationType::FrameClock
        }
    }

    fn frame_started(&mut self, frame_id: u64, target: &mut dyn RenderTarget) {
        self.pending_frame_id = Some(frame_id);
        if matches!(self.state, FrameState::Drawing { .. }) {
            return;
        }

        let mut synchronization = self.wanted_synchronization(target);
        if synchronization == SynchronizationType::Presentation {
            let next = self.last_presentation.map_or(0, |(msc, _)| msc + 1);
            if !target.set_render_mode(RenderMode::Vsync, next) {
                log::debug!("vsync render mode rejected; pacing with the frame clock");
                synchronization = SynchronizationType::FrameClock;
            }
        }

        let clock_frame = if synchronization == SynchronizationType::FrameClock {
            target.set_render_mode(RenderMode::Async, 0);
            let started = self.clock.start_frame(self.config.allow_batch);
            if !started {
                log::debug!("frame clock refused frame {frame_id}");
            }
            started
        } else {
            false
        };

        self.sync_type = Some(synchronization);
        self.state = FrameState::Drawing { clock_frame };
        self.decisions.push(PacingDecision::FrameStarted {
            synchronization,
            clock_frame,
        });
    }

    fn frame_finished(&mut self, frame_id: u64) {
        if self.pending_frame_id != Some(frame_id) {
            return;
        }
        self.pending_frame_id = None;
        match self.state {
            FrameState::Drawing { clock_frame: true } => {
                self.clock.end_frame();
                self.state = FrameState::AwaitingHost;
                self.decisions.push(PacingDecision::AwaitingHost);
            }
            FrameState::Drawing { clock_frame: false } => {
                self.state = FrameState::Idle;
                self.resolve(None);
            }
            FrameState::Idle | FrameState::AwaitingHost => {}
        }
    }
}

impl<C: FrameClock> FrameObserver for SyncHelper<C> {
    fn note_frame(&mut self, note: FrameNote, target: &mut dyn RenderTarget) {
        match note {
            FrameNote::Started { frame_id } => self.frame_started(frame_id, target),
            FrameNote::Complete { frame_id } => self.frame_finished(frame_id),
            FrameNote::Presented { frame_id, msc, ust } => {
                if self.pending_frame_id == Some(frame_id) {
                    self.last_presentation = Some((msc, ust));
                }
                self.frame_finished(frame_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use weft_core::backend::{
        Buffer, CompletionKey, RenderMode, ResourceKey, SynchronizationType,
    };
    use weft_core::region::{Rect, Region};
    use weft_core::subcompositor::{SubcompositorConfig, UpdateOutcome};
    use weft_core::trace::{PacingDecision, PacingEvent, TraceSink};
    use weft_core::view::{Scene, ViewId};
    use weft_render::{SoftwareTarget, SwapchainConfig};

    use super::{FrameState, SyncConfig, SyncHelper};
    use crate::clock::{CounterClock, FrameClock};
    use crate::time::ManualTime;

    const CLOCK_ONLY: SyncConfig = SyncConfig {
        prefer_presentation: false,
        allow_batch: false,
    };

    struct Fixture {
        scene: Scene,
        view: ViewId,
        target: SoftwareTarget,
        helper: SyncHelper<CounterClock>,
        done: Rc<RefCell<Vec<u32>>>,
    }

    impl Fixture {
        fn new(swapchain: SwapchainConfig, config: SyncConfig) -> Self {
            let mut scene = Scene::new();
            let sub = scene.create_subcompositor(SubcompositorConfig::OFFSCREEN);
            let target = SoftwareTarget::new(swapchain);
            scene.set_target(sub, Some(Box::new(target.clone())));
            let view = scene.create_view();
            scene.attach_buffer(view, Some(Rc::new(Buffer::new(ResourceKey(1), 16, 16))));
            scene.insert(sub, view);

            let mut helper =
                SyncHelper::new(sub, CounterClock::new(false), config, ManualTime::new(7_000));
            let done = Rc::new(RefCell::new(Vec::new()));
            let log = Rc::clone(&done);
            helper.set_frame_done_callback(Some(Box::new(move |ms| log.borrow_mut().push(ms))));
            Self {
                scene,
                view,
                target,
                helper,
                done,
            }
        }

        fn damage(&mut self) {
            self.scene
                .damage(self.view, &Region::from_rect(Rect::new(0, 0, 4, 4)));
        }

        fn frames(&self) -> u64 {
            self.scene.frame_counter(self.helper.subcompositor())
        }

        /// Reports every outstanding presentation to the helper.
        fn present_all(&mut self) {
            for c in self.target.take_completions() {
                assert!(
                    self.helper
                        .presentation_completed(&mut self.scene, c.key, c.msc, c.ust),
                    "completion {:?} should be known",
                    c.key
                );
            }
        }
    }

    #[test]
    fn deferred_repaint_drains_once_after_host_draws() {
        let mut f = Fixture::new(SwapchainConfig::DEFAULT, CLOCK_ONLY);
        let outcome = f.helper.update(&mut f.scene);
        assert!(matches!(outcome, Some(UpdateOutcome::Composited { .. })));
        assert_eq!(f.helper.state(), FrameState::AwaitingHost);
        assert_eq!(f.helper.clock().value(), 2);

        f.damage();
        assert_eq!(f.helper.update(&mut f.scene), None);
        assert!(f.helper.frame_pending());
        assert_eq!(f.frames(), 1, "nothing drawn while deferred");

        // A second request while deferred does not queue another frame.
        assert_eq!(f.helper.update(&mut f.scene), None);

        f.helper.after_frame(&mut f.scene, Some(30_000));
        assert_eq!(f.frames(), 2, "the deferred repaint ran exactly once");
        assert!(!f.helper.frame_pending());
        assert_eq!(f.helper.state(), FrameState::AwaitingHost);
        assert!(f.done.borrow().is_empty(), "draining replaces the callbacks");

        f.helper.after_frame(&mut f.scene, Some(46_000));
        assert_eq!(f.frames(), 2);
        assert_eq!(*f.done.borrow(), [46]);
        assert!(f.helper.can_fast_forward());
    }

    #[test]
    fn presentation_paces_with_vsync() {
        let swapchain = SwapchainConfig {
            presentation: true,
            vsync: true,
            ..SwapchainConfig::DEFAULT
        };
        let mut f = Fixture::new(swapchain, SyncConfig::DEFAULT);
        f.helper.update(&mut f.scene);
        assert_eq!(
            f.helper.synchronization(),
            Some(SynchronizationType::Presentation)
        );
        assert_eq!(f.target.render_mode(), RenderMode::Vsync);
        assert_eq!(f.helper.state(), FrameState::Drawing { clock_frame: false });
        assert!(!f.helper.can_fast_forward());
        assert!(f.done.borrow().is_empty());

        f.present_all();
        assert_eq!(f.helper.state(), FrameState::Idle);
        assert_eq!(f.helper.last_presentation(), Some((1, 16_667)));
        assert_eq!(*f.done.borrow(), [7]);
        // The frame clock was never involved.
        assert_eq!(f.helper.clock().value(), 0);

        // Presentation pacing never defers.
        f.damage();
        assert!(f.helper.update(&mut f.scene).is_some());
        f.damage();
        assert!(f.helper.update(&mut f.scene).is_some());
    }

    #[test]
    fn rejected_vsync_falls_back_to_frame_clock() {
        let swapchain = SwapchainConfig {
            presentation: true,
            vsync: false,
            ..SwapchainConfig::DEFAULT
        };
        let mut f = Fixture::new(swapchain, SyncConfig::DEFAULT);
        f.helper.update(&mut f.scene);
        assert_eq!(
            f.helper.synchronization(),
            Some(SynchronizationType::FrameClock)
        );
        assert_eq!(f.target.render_mode(), RenderMode::Async);
        assert_eq!(f.helper.state(), FrameState::Drawing { clock_frame: true });
        assert_eq!(f.helper.clock().value(), 1);

        f.present_all();
        assert_eq!(f.helper.state(), FrameState::AwaitingHost);
        assert_eq!(f.helper.clock().value(), 2);
        assert!(f.done.borrow().is_empty());

        f.helper.after_frame(&mut f.scene, None);
        assert_eq!(f.helper.state(), FrameState::Idle);
        assert_eq!(f.done.borrow().len(), 1);
    }

    #[test]
    fn freeze_forces_one_frame_clock_frame() {
        let swapchain = SwapchainConfig {
            presentation: true,
            vsync: true,
            ..SwapchainConfig::DEFAULT
        };
        let mut f = Fixture::new(swapchain, SyncConfig::DEFAULT);
        let resizes = Rc::new(RefCell::new(0_u32));
        let counter = Rc::clone(&resizes);
        f.helper
            .set_resize_begin_callback(Some(Box::new(move || *counter.borrow_mut() += 1)));

        f.helper.freeze(&mut f.scene);
        assert_eq!(*resizes.borrow(), 1);

        f.helper.update(&mut f.scene);
        assert_eq!(
            f.helper.synchronization(),
            Some(SynchronizationType::FrameClock)
        );
        f.present_all();
        f.helper.after_frame(&mut f.scene, None);
        assert_eq!(f.done.borrow().len(), 1);

        // One-shot: the next frame goes back to presentation.
        f.damage();
        f.helper.update(&mut f.scene);
        assert_eq!(
            f.helper.synchronization(),
            Some(SynchronizationType::Presentation)
        );
    }

    #[test]
    fn freeze_drops_deferred_repaint() {
        let mut f = Fixture::new(SwapchainConfig::DEFAULT, CLOCK_ONLY);
        f.helper.update(&mut f.scene);
        f.damage();
        assert_eq!(f.helper.update(&mut f.scene), None);

        f.helper.freeze(&mut f.scene);
        assert!(!f.helper.frame_pending());

        f.helper.after_frame(&mut f.scene, None);
        assert_eq!(f.frames(), 1, "the stale repaint must not run");
        assert_eq!(f.done.borrow().len(), 1);
    }

    #[test]
    fn unchanged_update_releases_callbacks_when_idle() {
        // A single buffer keeps the target age at zero.
        let swapchain = SwapchainConfig {
            buffers: 1,
            ..SwapchainConfig::DEFAULT
        };
        let mut f = Fixture::new(swapchain, CLOCK_ONLY);
        f.helper.update(&mut f.scene);
        f.helper.after_frame(&mut f.scene, None);
        assert_eq!(f.done.borrow().len(), 1);

        let outcome = f.helper.update(&mut f.scene);
        assert_eq!(outcome, Some(UpdateOutcome::Unchanged));
        assert_eq!(f.done.borrow().len(), 2);
        assert_eq!(f.helper.clock().value(), 2, "no frame was started");
    }

    #[test]
    fn batching_clock_never_defers() {
        let mut f = Fixture::new(
            SwapchainConfig::DEFAULT,
            SyncConfig {
                prefer_presentation: false,
                allow_batch: true,
            },
        );
        *f.helper.clock_mut() = CounterClock::new(true);
        f.helper.update(&mut f.scene);
        assert!(f.helper.clock().frame_in_progress());
        f.damage();
        assert!(f.helper.update(&mut f.scene).is_some());
        assert_eq!(f.frames(), 2);
    }

    #[test]
    fn unknown_completion_keys_are_rejected() {
        let mut f = Fixture::new(SwapchainConfig::DEFAULT, CLOCK_ONLY);
        let key = CompletionKey(99);
        assert!(!f.helper.frame_completed(&mut f.scene, key));
        assert!(!f.helper.presentation_completed(&mut f.scene, key, 1, 1));
    }

    #[derive(Default)]
    struct Decisions(Vec<PacingDecision>);

    impl TraceSink for Decisions {
        fn on_pacing(&mut self, e: &PacingEvent) {
            self.0.push(e.decision);
        }
    }

    #[test]
    fn decisions_are_traced_in_order() {
        let mut f = Fixture::new(SwapchainConfig::DEFAULT, CLOCK_ONLY);
        let sink = Rc::new(RefCell::new(Decisions::default()));
        f.scene.set_trace_sink(Some(Box::new(Rc::clone(&sink))));

        f.helper.update(&mut f.scene);
        f.damage();
        f.helper.update(&mut f.scene);
        f.helper.after_frame(&mut f.scene, None);

        let started = PacingDecision::FrameStarted {
            synchronization: SynchronizationType::FrameClock,
            clock_frame: true,
        };
        assert_eq!(
            sink.borrow().0,
            [
                started,
                PacingDecision::AwaitingHost,
                PacingDecision::Deferred,
                PacingDecision::Drained,
                started,
                PacingDecision::AwaitingHost,
            ]
        );
    }
}
