// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena storage for views and subcompositors, plus per-view properties.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Vec2;

use super::id::{INVALID, SubcompositorId, ViewId};
use crate::backend::Buffer;
use crate::dirty;
use crate::region::{Rect, Region};
use crate::subcompositor::SubcompositorState;
use crate::trace::{TraceSink, Tracer};
use crate::transform::{BufferTransform, Viewport};

/// Per-view boolean flags.
///
/// Both flags hide the view and its whole subtree. They differ in intent:
/// `unmapped` is the client's "no content" state, while `skipped` keeps a
/// structurally present view (for example a subsurface added but not yet
/// committed) out of composition, hit-testing and bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ViewFlags {
    /// The view has been unmapped.
    pub unmapped: bool,
    /// The view is skipped.
    pub skipped: bool,
}

impl ViewFlags {
    /// Returns `true` if neither flag hides the view.
    #[inline]
    #[must_use]
    pub const fn shows(self) -> bool {
        !self.unmapped && !self.skipped
    }
}

/// Local state of a single view.
#[derive(Clone, Debug)]
pub(crate) struct ViewState {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) abs_x: i32,
    pub(crate) abs_y: i32,
    pub(crate) buffer: Option<Rc<Buffer>>,
    pub(crate) scale: i32,
    pub(crate) transform: BufferTransform,
    pub(crate) viewport: Viewport,
    pub(crate) fractional_offset: Vec2,
    /// Accumulated damage in buffer pixels.
    pub(crate) damage: Region,
    /// View-local.
    pub(crate) opaque: Region,
    /// View-local; `None` accepts input everywhere.
    pub(crate) input: Option<Region>,
    pub(crate) flags: ViewFlags,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            abs_x: 0,
            abs_y: 0,
            buffer: None,
            scale: 1,
            transform: BufferTransform::Normal,
            viewport: Viewport::NONE,
            fractional_offset: Vec2::ZERO,
            damage: Region::new(),
            opaque: Region::new(),
            input: None,
            flags: ViewFlags::default(),
        }
    }
}

/// Storage for every view and subcompositor of one compositor instance.
///
/// Views are addressed by [`ViewId`] handles and subcompositors by
/// [`SubcompositorId`]s. Topology lives in parallel arrays indexed by slot;
/// destroyed slots are recycled through free lists, and generation counters
/// reject stale handles.
///
/// Besides the tree (parent and ordered child list), every view is a node in
/// a flattened paint list. A subcompositor's list holds all of its views in
/// strict paint order; a detached subtree forms a standalone list. The
/// `inferior` array caches each view's last descendant in that order, so a
/// whole subtree is always the contiguous segment `[view, inferior[view]]`.
pub struct Scene {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) subcompositor: Vec<u32>,

    // -- Paint list --
    pub(crate) paint_next: Vec<u32>,
    pub(crate) paint_prev: Vec<u32>,
    pub(crate) inferior: Vec<u32>,

    // -- Properties --
    pub(crate) views: Vec<ViewState>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Subcompositors --
    pub(crate) subs: Vec<SubcompositorState>,
    pub(crate) sub_generation: Vec<u32>,
    pub(crate) sub_alive: Vec<bool>,
    pub(crate) sub_free: Vec<u32>,

    pub(crate) trace_sink: Option<Box<dyn TraceSink>>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("views", &(self.len as usize - self.free_list.len()))
            .field(
                "subcompositors",
                &self.sub_alive.iter().filter(|a| **a).count(),
            )
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            subcompositor: Vec::new(),
            paint_next: Vec::new(),
            paint_prev: Vec::new(),
            inferior: Vec::new(),
            views: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            subs: Vec::new(),
            sub_generation: Vec::new(),
            sub_alive: Vec::new(),
            sub_free: Vec::new(),
            trace_sink: None,
        }
    }

    // -- Diagnostics --

    /// Installs a trace sink, returning the previous one.
    pub fn set_trace_sink(
        &mut self,
        sink: Option<Box<dyn TraceSink>>,
    ) -> Option<Box<dyn TraceSink>> {
        core::mem::replace(&mut self.trace_sink, sink)
    }

    /// Returns a tracer dispatching to the installed sink, if any.
    pub fn tracer(&mut self) -> Tracer<'_> {
        match self.trace_sink.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        }
    }

    // -- Allocation API --

    /// Creates a new detached view and returns its handle.
    ///
    /// The view starts mapped, unskipped, at `(0, 0)`, with no buffer, scale
    /// 1, the normal transform and no viewport.
    pub fn create_view(&mut self) -> ViewId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; topology was reset on destroy.
            let i = idx as usize;
            self.views[i] = ViewState::default();
            self.paint_next[i] = INVALID;
            self.paint_prev[i] = INVALID;
            self.inferior[i] = idx;
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.subcompositor.push(INVALID);
            self.paint_next.push(INVALID);
            self.paint_prev.push(INVALID);
            self.inferior.push(idx);
            self.views.push(ViewState::default());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        ViewId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a view, releasing its buffer and freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the view is still inserted somewhere,
    /// or it has children.
    pub fn destroy_view(&mut self, id: ViewId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            self.parent[i] == INVALID && self.subcompositor[i] == INVALID,
            "cannot destroy a view that is still inserted"
        );
        assert!(
            self.first_child[i] == INVALID,
            "cannot destroy a view with children"
        );

        // Drops the buffer reference, which may fire its release hook.
        self.views[i] = ViewState::default();
        self.alive[i] = false;
        self.generation[i] += 1;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live view.
    #[must_use]
    pub fn is_alive(&self, id: ViewId) -> bool {
        id.idx < self.len
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    pub(crate) fn validate(&self, id: ViewId) {
        assert!(self.is_alive(id), "stale ViewId");
    }

    pub(crate) fn view_id(&self, idx: u32) -> ViewId {
        ViewId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    pub(crate) fn sub_id(&self, idx: u32) -> SubcompositorId {
        SubcompositorId {
            idx,
            generation: self.sub_generation[idx as usize],
        }
    }

    /// Marks `sub` for a full repaint; `INVALID` is ignored.
    pub(crate) fn garbage_idx(&mut self, sub: u32) {
        if sub != INVALID {
            self.subs[sub as usize].garbaged = true;
        }
    }

    // -- Property getters --

    /// Position relative to the parent (or the subcompositor origin).
    #[must_use]
    pub fn position(&self, id: ViewId) -> (i32, i32) {
        self.validate(id);
        let v = &self.views[id.idx as usize];
        (v.x, v.y)
    }

    /// Position relative to the subcompositor origin. For a detached root
    /// this equals its local position.
    #[must_use]
    pub fn absolute_position(&self, id: ViewId) -> (i32, i32) {
        self.validate(id);
        let v = &self.views[id.idx as usize];
        (v.abs_x, v.abs_y)
    }

    /// The attached buffer, if any.
    #[must_use]
    pub fn buffer(&self, id: ViewId) -> Option<&Rc<Buffer>> {
        self.validate(id);
        self.views[id.idx as usize].buffer.as_ref()
    }

    /// Damage accumulated since the last update, in buffer pixels.
    #[must_use]
    pub fn pending_damage(&self, id: ViewId) -> &Region {
        self.validate(id);
        &self.views[id.idx as usize].damage
    }

    /// The opaque region, view-local.
    #[must_use]
    pub fn opaque_region(&self, id: ViewId) -> &Region {
        self.validate(id);
        &self.views[id.idx as usize].opaque
    }

    /// The input region, view-local. `None` accepts input everywhere.
    #[must_use]
    pub fn input_region(&self, id: ViewId) -> Option<&Region> {
        self.validate(id);
        self.views[id.idx as usize].input.as_ref()
    }

    /// The buffer transform.
    #[must_use]
    pub fn transform(&self, id: ViewId) -> BufferTransform {
        self.validate(id);
        self.views[id.idx as usize].transform
    }

    /// The buffer scale.
    #[must_use]
    pub fn scale(&self, id: ViewId) -> i32 {
        self.validate(id);
        self.views[id.idx as usize].scale
    }

    /// The viewport.
    #[must_use]
    pub fn viewport(&self, id: ViewId) -> Viewport {
        self.validate(id);
        self.views[id.idx as usize].viewport
    }

    /// The fractional offset.
    #[must_use]
    pub fn fractional_offset(&self, id: ViewId) -> Vec2 {
        self.validate(id);
        self.views[id.idx as usize].fractional_offset
    }

    /// The view's flags.
    #[must_use]
    pub fn flags(&self, id: ViewId) -> ViewFlags {
        self.validate(id);
        self.views[id.idx as usize].flags
    }

    /// The subcompositor the view is linked into, if any.
    #[must_use]
    pub fn subcompositor_of(&self, id: ViewId) -> Option<SubcompositorId> {
        self.validate(id);
        let s = self.subcompositor[id.idx as usize];
        (s != INVALID).then(|| self.sub_id(s))
    }

    // -- Property setters --

    /// Attaches a buffer, or detaches it with `None`.
    ///
    /// The previous buffer reference is dropped. A change in the displayed
    /// size of a visible view rescans bounds and forces a full repaint;
    /// same-size attachments rely on the client's damage.
    pub fn attach_buffer(&mut self, id: ViewId, buffer: Option<Rc<Buffer>>) {
        self.validate(id);
        let i = id.idx as usize;
        let old_rect = self.view_rect(id.idx);
        self.views[i].buffer = buffer;
        if self.view_rect(id.idx) != old_rect {
            self.geometry_changed(id.idx);
        }
    }

    /// Moves the view relative to its parent.
    pub fn move_to(&mut self, id: ViewId, x: i32, y: i32) {
        self.validate(id);
        let i = id.idx as usize;
        if (self.views[i].x, self.views[i].y) == (x, y) {
            return;
        }
        self.views[i].x = x;
        self.views[i].y = y;
        self.recompute_absolute(id.idx);
        self.geometry_changed(id.idx);
    }

    /// Adds surface-local damage.
    ///
    /// The region is converted to buffer pixels through the current
    /// transform, scale and viewport. Damage on a view without a buffer is
    /// discarded.
    pub fn damage(&mut self, id: ViewId, region: &Region) {
        self.validate(id);
        let i = id.idx as usize;
        let Some(to_view) = self.views[i].buffer_to_view() else {
            return;
        };
        let in_buffer = region.transformed(to_view.inverse());
        self.damage_buffer_idx(id.idx, &in_buffer);
    }

    /// Adds damage already expressed in buffer pixels.
    pub fn damage_buffer(&mut self, id: ViewId, region: &Region) {
        self.validate(id);
        self.damage_buffer_idx(id.idx, region);
    }

    fn damage_buffer_idx(&mut self, idx: u32, region: &Region) {
        let view = &mut self.views[idx as usize];
        let Some(buffer) = &view.buffer else {
            return;
        };
        let mut clipped = region.clone();
        clipped.intersect_rect(Rect::new(0, 0, buffer.width(), buffer.height()));
        view.damage.union(&clipped);
    }

    /// Sets the opaque region (view-local).
    pub fn set_opaque_region(&mut self, id: ViewId, region: Region) {
        self.validate(id);
        self.views[id.idx as usize].opaque = region;
        let s = self.subcompositor[id.idx as usize];
        if s != INVALID {
            self.subs[s as usize].dirty.mark(id.idx, dirty::OPAQUE);
        }
    }

    /// Sets the input region (view-local). `None` accepts input everywhere.
    pub fn set_input_region(&mut self, id: ViewId, region: Option<Region>) {
        self.validate(id);
        self.views[id.idx as usize].input = region;
        let s = self.subcompositor[id.idx as usize];
        if s != INVALID {
            self.subs[s as usize].dirty.mark(id.idx, dirty::INPUT);
        }
    }

    /// Sets the buffer transform.
    pub fn set_transform(&mut self, id: ViewId, transform: BufferTransform) {
        self.validate(id);
        if self.views[id.idx as usize].transform == transform {
            return;
        }
        self.views[id.idx as usize].transform = transform;
        self.geometry_changed(id.idx);
    }

    /// Sets the buffer scale.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is less than 1.
    pub fn set_scale(&mut self, id: ViewId, scale: i32) {
        self.validate(id);
        assert!(scale >= 1, "buffer scale must be at least 1");
        if self.views[id.idx as usize].scale == scale {
            return;
        }
        self.views[id.idx as usize].scale = scale;
        self.geometry_changed(id.idx);
    }

    /// Sets the viewport.
    ///
    /// # Panics
    ///
    /// Panics if the source rectangle is empty or the destination size is
    /// not positive.
    pub fn set_viewport(&mut self, id: ViewId, viewport: Viewport) {
        self.validate(id);
        if let Some(src) = viewport.source {
            assert!(
                src.width() > 0.0 && src.height() > 0.0,
                "viewport source must not be empty"
            );
        }
        if let Some((w, h)) = viewport.destination {
            assert!(w > 0 && h > 0, "viewport destination must be positive");
        }
        if self.views[id.idx as usize].viewport == viewport {
            return;
        }
        self.views[id.idx as usize].viewport = viewport;
        self.geometry_changed(id.idx);
    }

    /// Sets the sub-pixel offset used for fractional-scale positioning.
    ///
    /// # Panics
    ///
    /// Panics if either component lies outside `[0, 1)`.
    pub fn set_fractional_offset(&mut self, id: ViewId, offset: Vec2) {
        self.validate(id);
        assert!(
            (0.0..1.0).contains(&offset.x) && (0.0..1.0).contains(&offset.y),
            "fractional offset must lie in [0, 1)"
        );
        if self.views[id.idx as usize].fractional_offset == offset {
            return;
        }
        self.views[id.idx as usize].fractional_offset = offset;
        self.garbage_idx(self.subcompositor[id.idx as usize]);
    }

    /// Maps the view.
    pub fn map(&mut self, id: ViewId) {
        self.validate(id);
        let i = id.idx as usize;
        if !self.views[i].flags.unmapped {
            return;
        }
        self.views[i].flags.unmapped = false;
        self.subtree_shown(id.idx);
    }

    /// Unmaps the view, hiding it and its subtree.
    pub fn unmap(&mut self, id: ViewId) {
        self.validate(id);
        let i = id.idx as usize;
        if self.views[i].flags.unmapped {
            return;
        }
        let was_visible = self.is_visible_idx(id.idx);
        self.views[i].flags.unmapped = true;
        if was_visible {
            self.subtree_hidden(id.idx);
        }
    }

    /// Skips the view, excluding it and its subtree from composition,
    /// hit-testing and bounds.
    pub fn skip(&mut self, id: ViewId) {
        self.validate(id);
        let i = id.idx as usize;
        if self.views[i].flags.skipped {
            return;
        }
        let was_visible = self.is_visible_idx(id.idx);
        self.views[i].flags.skipped = true;
        if was_visible {
            self.subtree_hidden(id.idx);
        }
    }

    /// Undoes [`skip`](Self::skip).
    pub fn unskip(&mut self, id: ViewId) {
        self.validate(id);
        let i = id.idx as usize;
        if !self.views[i].flags.skipped {
            return;
        }
        self.views[i].flags.skipped = false;
        self.subtree_shown(id.idx);
    }

    // -- Visibility --

    /// Returns `true` if the view is linked into a subcompositor and neither
    /// it nor any ancestor is unmapped or skipped.
    #[must_use]
    pub fn is_visible(&self, id: ViewId) -> bool {
        self.validate(id);
        self.is_visible_idx(id.idx)
    }

    pub(crate) fn is_visible_idx(&self, idx: u32) -> bool {
        if self.subcompositor[idx as usize] == INVALID {
            return false;
        }
        let mut a = idx;
        while a != INVALID {
            if !self.views[a as usize].flags.shows() {
                return false;
            }
            a = self.parent[a as usize];
        }
        true
    }

    /// A view that was hidden may now be visible: grow bounds by whatever of
    /// its subtree shows and garbage its subcompositor.
    fn subtree_shown(&mut self, idx: u32) {
        let s = self.subcompositor[idx as usize];
        if s == INVALID || !self.is_visible_idx(idx) {
            return;
        }
        self.grow_bounds_for_subtree(s, idx);
        self.garbage_idx(s);
    }

    /// A visible view was hidden: bounds may shrink.
    fn subtree_hidden(&mut self, idx: u32) {
        let s = self.subcompositor[idx as usize];
        if s == INVALID {
            return;
        }
        self.recompute_bounds(s);
        self.garbage_idx(s);
    }

    /// The displayed rectangle or content mapping of a view changed.
    fn geometry_changed(&mut self, idx: u32) {
        let s = self.subcompositor[idx as usize];
        if s == INVALID || !self.is_visible_idx(idx) {
            return;
        }
        self.recompute_bounds(s);
        self.garbage_idx(s);
    }
}
