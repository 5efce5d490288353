// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing.

use kurbo::Point;

use crate::view::{INVALID, Scene, SubcompositorId, ViewId};

impl Scene {
    /// Finds the topmost visible view accepting input at `(x, y)` in target
    /// coordinates.
    ///
    /// Returns the view and the point in its local coordinates. Views
    /// without a buffer never receive input.
    #[must_use]
    pub fn lookup_view_at(&self, id: SubcompositorId, x: f64, y: f64) -> Option<(ViewId, Point)> {
        self.validate_sub(id);
        let state = &self.subs[id.idx as usize];
        let p = Point::new(
            x + f64::from(state.bounds.min_x),
            y + f64::from(state.bounds.min_y),
        );

        let mut idx = state.tail;
        while idx != INVALID {
            let cur = idx;
            idx = self.paint_prev[cur as usize];
            let Some(rect) = self.view_rect(cur) else {
                continue;
            };
            if !rect.contains_point(p) || !self.is_visible_idx(cur) {
                continue;
            }
            let local = Point::new(p.x - f64::from(rect.x0), p.y - f64::from(rect.y0));
            let accepts = self.views[cur as usize]
                .input
                .as_ref()
                .is_none_or(|input| input.contains_point(local));
            if accepts {
                return Some((self.view_id(cur), local));
            }
        }
        None
    }
}
