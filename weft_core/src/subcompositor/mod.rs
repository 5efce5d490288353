// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subcompositors: paint lists bound to render targets.
//!
//! A subcompositor owns the flattened paint list of the views inserted into
//! it, tracks their bounding box, and repaints them onto an optional
//! [`RenderTarget`]. Repainting is damage driven: views accumulate damage
//! between updates and [`Scene::update`] redraws only what changed, using
//! the target's [`age`](RenderTarget::age) to decide how much previously
//! drawn damage must be replayed. Structural changes *garbage* the
//! subcompositor, forcing the next update to redraw everything.
//!
//! Outward notifications (opaque or input shape changed, bounds changed,
//! direct presentation disabled) are delivered through optional callbacks.
//! Frame lifecycle notes go to the [`FrameObserver`](crate::backend::FrameObserver)
//! passed to each update.

mod bounds;
mod expose;
mod lookup;
mod update;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::backend::{CompletionKey, RenderTarget};
use crate::region::Region;
use crate::view::{INVALID, Scene, SubcompositorId};

pub use bounds::Bounds;
pub use update::UpdateOutcome;

/// Tunables for a subcompositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubcompositorConfig {
    /// When an update region holds more rectangles than this, it is replaced
    /// by its extents.
    pub damage_rect_limit: usize,
    /// Whether single fullscreen views may be presented without compositing.
    pub direct_present: bool,
}

impl SubcompositorConfig {
    /// Defaults suitable for toplevel windows.
    pub const DEFAULT: Self = Self {
        damage_rect_limit: 64,
        direct_present: true,
    };

    /// Defaults for targets that never present client buffers directly,
    /// such as offscreen pictures.
    pub const OFFSCREEN: Self = Self {
        damage_rect_limit: 64,
        direct_present: false,
    };
}

impl Default for SubcompositorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// An asynchronous finish or presentation the target has not reported yet.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PendingCompletion {
    pub(crate) key: CompletionKey,
    /// `None` for exposure repaints, which are not frames.
    pub(crate) frame_id: Option<u64>,
}

#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) opaque_changed: Option<Box<dyn FnMut(&Region)>>,
    pub(crate) input_changed: Option<Box<dyn FnMut(&Region)>>,
    pub(crate) bounds_changed: Option<Box<dyn FnMut(Bounds)>>,
    pub(crate) direct_present_disabled: Option<Box<dyn FnMut()>>,
}

pub(crate) struct SubcompositorState {
    // -- Paint list and top-level children --
    pub(crate) head: u32,
    pub(crate) tail: u32,
    pub(crate) first_child: u32,
    pub(crate) last_child: u32,

    pub(crate) bounds: Bounds,
    pub(crate) target: Option<Box<dyn RenderTarget>>,
    /// Size last passed to `note_target_size`.
    pub(crate) noted_size: Option<(i32, i32)>,

    /// Update regions of the two most recent frames, newest first.
    pub(crate) prior_damage: [Region; 2],
    pub(crate) garbaged: bool,
    pub(crate) frozen: bool,
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) frame_counter: u64,

    /// Target-space unions last reported through the callbacks.
    pub(crate) opaque: Region,
    pub(crate) input: Region,

    pub(crate) pending: Vec<PendingCompletion>,
    pub(crate) callbacks: Callbacks,
    pub(crate) config: SubcompositorConfig,
}

impl SubcompositorState {
    fn new(config: SubcompositorConfig) -> Self {
        Self {
            head: INVALID,
            tail: INVALID,
            first_child: INVALID,
            last_child: INVALID,
            bounds: Bounds::EMPTY,
            target: None,
            noted_size: None,
            prior_damage: [Region::new(), Region::new()],
            garbaged: true,
            frozen: false,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            frame_counter: 0,
            opaque: Region::new(),
            input: Region::new(),
            pending: Vec::new(),
            callbacks: Callbacks::default(),
            config,
        }
    }

    /// Cancels every outstanding completion on the current target.
    fn cancel_pending(&mut self) {
        let pending = core::mem::take(&mut self.pending);
        if let Some(target) = self.target.as_deref_mut() {
            for p in pending {
                target.cancel_completion(p.key);
            }
        }
    }
}

impl fmt::Debug for SubcompositorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubcompositorState")
            .field("bounds", &self.bounds)
            .field("has_target", &self.target.is_some())
            .field("garbaged", &self.garbaged)
            .field("frozen", &self.frozen)
            .field("frame_counter", &self.frame_counter)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Scene {
    // -- Lifecycle --

    /// Creates an empty subcompositor with no render target.
    pub fn create_subcompositor(&mut self, config: SubcompositorConfig) -> SubcompositorId {
        let idx = if let Some(idx) = self.sub_free.pop() {
            self.subs[idx as usize] = SubcompositorState::new(config);
            self.sub_alive[idx as usize] = true;
            idx
        } else {
            let idx = u32::try_from(self.subs.len()).unwrap_or(INVALID);
            assert!(idx != INVALID, "too many subcompositors");
            self.subs.push(SubcompositorState::new(config));
            self.sub_generation.push(0);
            self.sub_alive.push(true);
            idx
        };
        self.sub_id(idx)
    }

    /// Destroys a subcompositor, cancelling outstanding completions and
    /// dropping its render target.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or views are still inserted.
    pub fn destroy_subcompositor(&mut self, id: SubcompositorId) {
        self.validate_sub(id);
        let i = id.idx as usize;
        assert!(
            self.subs[i].head == INVALID && self.subs[i].first_child == INVALID,
            "cannot destroy a subcompositor that still has views"
        );
        self.subs[i].cancel_pending();
        self.subs[i] = SubcompositorState::new(SubcompositorConfig::DEFAULT);
        self.sub_alive[i] = false;
        self.sub_generation[i] += 1;
        self.sub_free.push(id.idx);
    }

    /// Returns whether the handle refers to a live subcompositor.
    #[must_use]
    pub fn is_subcompositor_alive(&self, id: SubcompositorId) -> bool {
        (id.idx as usize) < self.subs.len()
            && self.sub_alive[id.idx as usize]
            && self.sub_generation[id.idx as usize] == id.generation
    }

    pub(crate) fn validate_sub(&self, id: SubcompositorId) {
        assert!(self.is_subcompositor_alive(id), "stale SubcompositorId");
    }

    // -- Target --

    /// Attaches a render target (or detaches with `None`), returning the
    /// previous one. Completions outstanding on the old target are
    /// cancelled, and the next update redraws everything.
    pub fn set_target(
        &mut self,
        id: SubcompositorId,
        target: Option<Box<dyn RenderTarget>>,
    ) -> Option<Box<dyn RenderTarget>> {
        self.validate_sub(id);
        let state = &mut self.subs[id.idx as usize];
        state.cancel_pending();
        state.noted_size = None;
        state.garbaged = true;
        core::mem::replace(&mut state.target, target)
    }

    /// Mutable access to the render target, if attached.
    pub fn target_mut(
        &mut self,
        id: SubcompositorId,
    ) -> Option<&mut (dyn RenderTarget + 'static)> {
        self.validate_sub(id);
        self.subs[id.idx as usize].target.as_deref_mut()
    }

    /// Returns `true` if a render target is attached.
    #[must_use]
    pub fn has_target(&self, id: SubcompositorId) -> bool {
        self.validate_sub(id);
        self.subs[id.idx as usize].target.is_some()
    }

    // -- State --

    /// Suppresses updates until [`unfreeze`](Self::unfreeze). Exposure
    /// repaints still go through.
    pub fn freeze(&mut self, id: SubcompositorId) {
        self.validate_sub(id);
        self.subs[id.idx as usize].frozen = true;
    }

    /// Re-enables updates. Does not repaint by itself.
    pub fn unfreeze(&mut self, id: SubcompositorId) {
        self.validate_sub(id);
        self.subs[id.idx as usize].frozen = false;
    }

    /// Returns `true` while frozen.
    #[must_use]
    pub fn is_frozen(&self, id: SubcompositorId) -> bool {
        self.validate_sub(id);
        self.subs[id.idx as usize].frozen
    }

    /// Forces the next update to redraw the whole target.
    pub fn garbage(&mut self, id: SubcompositorId) {
        self.validate_sub(id);
        self.subs[id.idx as usize].garbaged = true;
    }

    /// Returns `true` if the next update will redraw everything.
    #[must_use]
    pub fn is_garbaged(&self, id: SubcompositorId) -> bool {
        self.validate_sub(id);
        self.subs[id.idx as usize].garbaged
    }

    /// Number of frames started so far.
    #[must_use]
    pub fn frame_counter(&self, id: SubcompositorId) -> u64 {
        self.validate_sub(id);
        self.subs[id.idx as usize].frame_counter
    }

    /// Number of completions the target has yet to report.
    #[must_use]
    pub fn pending_completions(&self, id: SubcompositorId) -> usize {
        self.validate_sub(id);
        self.subs[id.idx as usize].pending.len()
    }

    /// Union of the visible views' opaque regions in target coordinates, as
    /// of the last update.
    #[must_use]
    pub fn opaque(&self, id: SubcompositorId) -> &Region {
        self.validate_sub(id);
        &self.subs[id.idx as usize].opaque
    }

    /// Union of the visible views' input regions in target coordinates, as
    /// of the last update.
    #[must_use]
    pub fn input(&self, id: SubcompositorId) -> &Region {
        self.validate_sub(id);
        &self.subs[id.idx as usize].input
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self, id: SubcompositorId) -> SubcompositorConfig {
        self.validate_sub(id);
        self.subs[id.idx as usize].config
    }

    /// Replaces the configuration.
    pub fn set_config(&mut self, id: SubcompositorId, config: SubcompositorConfig) {
        self.validate_sub(id);
        self.subs[id.idx as usize].config = config;
    }

    // -- Callbacks --

    /// Called after an update changes the opaque union.
    pub fn set_opaque_changed_callback(
        &mut self,
        id: SubcompositorId,
        callback: Option<Box<dyn FnMut(&Region)>>,
    ) {
        self.validate_sub(id);
        self.subs[id.idx as usize].callbacks.opaque_changed = callback;
    }

    /// Called after an update changes the input union.
    pub fn set_input_changed_callback(
        &mut self,
        id: SubcompositorId,
        callback: Option<Box<dyn FnMut(&Region)>>,
    ) {
        self.validate_sub(id);
        self.subs[id.idx as usize].callbacks.input_changed = callback;
    }

    /// Called whenever the bounds change.
    pub fn set_bounds_changed_callback(
        &mut self,
        id: SubcompositorId,
        callback: Option<Box<dyn FnMut(Bounds)>>,
    ) {
        self.validate_sub(id);
        self.subs[id.idx as usize].callbacks.bounds_changed = callback;
    }

    /// Called when the target refuses a direct presentation.
    ///
    /// That frame is composited instead. Later frames still try direct
    /// presentation unless the embedder turns it off with
    /// [`set_config`](Self::set_config).
    pub fn set_direct_present_disabled_callback(
        &mut self,
        id: SubcompositorId,
        callback: Option<Box<dyn FnMut()>>,
    ) {
        self.validate_sub(id);
        self.subs[id.idx as usize].callbacks.direct_present_disabled = callback;
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    use super::SubcompositorConfig;
    use crate::backend::{CompletionKey, NoopObserver, TargetAge};
    use crate::testing::{RecordingTarget, solid_buffer};
    use crate::view::Scene;

    #[test]
    #[should_panic(expected = "cannot destroy a subcompositor that still has views")]
    fn destroying_populated_subcompositor_panics() {
        let mut scene = Scene::new();
        let sub = scene.create_subcompositor(SubcompositorConfig::DEFAULT);
        let v = scene.create_view();
        scene.insert(sub, v);
        scene.destroy_subcompositor(sub);
    }

    #[test]
    #[should_panic(expected = "stale SubcompositorId")]
    fn stale_subcompositor_panics() {
        let mut scene = Scene::new();
        let sub = scene.create_subcompositor(SubcompositorConfig::DEFAULT);
        scene.destroy_subcompositor(sub);
        scene.freeze(sub);
    }

    #[test]
    fn destroy_cancels_outstanding_completions() {
        let mut scene = Scene::new();
        let sub = scene.create_subcompositor(SubcompositorConfig::OFFSCREEN);
        let (target, log) = RecordingTarget::new(TargetAge::Invalid);
        log.borrow_mut().async_finish = true;
        scene.set_target(sub, Some(Box::new(target)));

        let v = scene.create_view();
        scene.attach_buffer(v, Some(solid_buffer(1, 10, 10)));
        scene.insert(sub, v);
        scene.update(sub, &mut NoopObserver);
        assert_eq!(scene.pending_completions(sub), 1);

        scene.unparent(v);
        scene.destroy_subcompositor(sub);
        assert_eq!(log.borrow().cancelled, alloc::vec![CompletionKey(1)]);
    }

    #[test]
    fn replacing_target_garbages_and_cancels() {
        let mut scene = Scene::new();
        let sub = scene.create_subcompositor(SubcompositorConfig::OFFSCREEN);
        let (target, log) = RecordingTarget::new(TargetAge::Frames(0));
        log.borrow_mut().async_finish = true;
        scene.set_target(sub, Some(Box::new(target)));
        let v = scene.create_view();
        scene.attach_buffer(v, Some(solid_buffer(1, 10, 10)));
        scene.insert(sub, v);
        scene.update(sub, &mut NoopObserver);
        assert!(!scene.is_garbaged(sub));

        let old = scene.set_target(sub, None);
        assert!(old.is_some());
        assert!(scene.is_garbaged(sub));
        assert_eq!(scene.pending_completions(sub), 0);
        assert_eq!(log.borrow().cancelled.len(), 1);
    }

    #[test]
    fn bounds_callback_reports_growth() {
        let mut scene = Scene::new();
        let sub = scene.create_subcompositor(SubcompositorConfig::DEFAULT);
        let seen = Rc::new(RefCell::new(alloc::vec::Vec::new()));
        let sink = Rc::clone(&seen);
        scene.set_bounds_changed_callback(
            sub,
            Some(Box::new(move |b| sink.borrow_mut().push(b))),
        );
        let v = scene.create_view();
        scene.attach_buffer(v, Some(solid_buffer(1, 30, 20)));
        scene.insert(sub, v);
        scene.move_to(v, 5, 5);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!((seen[1].min_x, seen[1].max_x), (5, 35));
    }
}
