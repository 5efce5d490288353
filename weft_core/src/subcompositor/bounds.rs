// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subcompositor bounding box maintenance.
//!
//! Bounds only grow when views are inserted, mapped or unskipped, so those
//! paths extend the box by the newly visible subtree. Anything that can
//! shrink it (unparent, unmap, skip, move, resize) rescans the whole paint
//! list, since detecting shrinkage incrementally would need per-edge
//! bookkeeping.

use crate::region::Rect;
use crate::view::{INVALID, Scene, SubcompositorId, VisibleViews};

/// Bounding box of a subcompositor's visible, buffer-backed views.
///
/// `max_x` and `max_y` are exclusive. An empty box is all zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Left edge.
    pub min_x: i32,
    /// Top edge.
    pub min_y: i32,
    /// Right edge (exclusive).
    pub max_x: i32,
    /// Bottom edge (exclusive).
    pub max_y: i32,
}

impl Bounds {
    /// The empty box.
    pub const EMPTY: Self = Self {
        min_x: 0,
        min_y: 0,
        max_x: 0,
        max_y: 0,
    };

    /// Returns `true` if the box has no area.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Width of the box.
    #[inline]
    #[must_use]
    pub const fn width(self) -> i32 {
        self.max_x - self.min_x
    }

    /// Height of the box.
    #[inline]
    #[must_use]
    pub const fn height(self) -> i32 {
        self.max_y - self.min_y
    }

    /// The box in subcompositor coordinates.
    #[must_use]
    pub const fn to_rect(self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// The box in target coordinates, where `(min_x, min_y)` is the origin.
    #[must_use]
    pub const fn target_rect(self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    /// Smallest box containing this one and `rect`.
    #[must_use]
    pub fn union_rect(self, rect: Rect) -> Self {
        if rect.is_empty() {
            return self;
        }
        if self.is_empty() {
            return Self {
                min_x: rect.x0,
                min_y: rect.y0,
                max_x: rect.x1,
                max_y: rect.y1,
            };
        }
        Self {
            min_x: self.min_x.min(rect.x0),
            min_y: self.min_y.min(rect.y0),
            max_x: self.max_x.max(rect.x1),
            max_y: self.max_y.max(rect.y1),
        }
    }
}

impl Scene {
    /// The subcompositor's current bounds.
    #[must_use]
    pub fn bounds(&self, id: SubcompositorId) -> Bounds {
        self.validate_sub(id);
        self.subs[id.idx as usize].bounds
    }

    /// Extends bounds by the visible views of the subtree rooted at `first`.
    /// The caller has checked that `first` itself is visible.
    pub(crate) fn grow_bounds_for_subtree(&mut self, sub: u32, first: u32) {
        let last = self.inferior[first as usize];
        let grown = VisibleViews::new(self, first, last)
            .filter_map(|idx| self.view_rect(idx))
            .fold(self.subs[sub as usize].bounds, Bounds::union_rect);
        self.set_bounds(sub, grown);
    }

    /// Rescans every visible view.
    pub(crate) fn recompute_bounds(&mut self, sub: u32) {
        let head = self.subs[sub as usize].head;
        let bounds = VisibleViews::new(self, head, INVALID)
            .filter_map(|idx| self.view_rect(idx))
            .fold(Bounds::EMPTY, Bounds::union_rect);
        self.set_bounds(sub, bounds);
    }

    fn set_bounds(&mut self, sub: u32, bounds: Bounds) {
        let state = &mut self.subs[sub as usize];
        if state.bounds == bounds {
            return;
        }
        state.bounds = bounds;
        state.garbaged = true;
        if let Some(callback) = state.callbacks.bounds_changed.as_mut() {
            callback(bounds);
        }
    }
}
