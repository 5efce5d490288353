// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exposure repaints.
//!
//! When the host reports that part of the window lost its contents, that
//! area is redrawn from the views as they stand. Damage and bounds are left
//! alone and no frame is started. Finishing still swaps the target, so the
//! back buffer is first brought up to date the same way an update would:
//! the replay ring covers aged buffers, anything else is redrawn in full.

use crate::region::{Rect, Region};
use crate::trace::ExposeEvent;
use crate::view::{Scene, SubcompositorId};

use super::PendingCompletion;
use super::update::paint;

impl Scene {
    /// Redraws `rect` (target coordinates) and finishes unconditionally.
    ///
    /// Works while frozen. Returns `false` if there is no target or `rect`
    /// lies outside it.
    pub fn expose(&mut self, id: SubcompositorId, rect: Rect) -> bool {
        self.validate_sub(id);
        let s = id.idx;
        let si = s as usize;
        let target_rect = self.subs[si].bounds.target_rect();
        let clipped = rect.intersect(target_rect);
        let age = match self.subs[si].target.as_deref() {
            Some(target) if !clipped.is_empty() => target.age(),
            _ => return false,
        };

        let exposed = Region::from_rect(clipped);
        let replay = if self.subs[si].garbaged {
            None
        } else {
            age.incremental()
        };
        let region = match replay {
            Some(n) => {
                let mut region = exposed.clone();
                self.replay_damage(s, n, &mut region);
                region.intersect_rect(target_rect);
                region.simplify(self.subs[si].config.damage_rect_limit);
                region
            }
            None => Region::from_rect(target_rect),
        };

        let items = self.draw_items(s);
        let state = &mut self.subs[si];
        let Some(target) = state.target.as_deref_mut() else {
            return false;
        };
        let composites = paint(target, &self.views, &items, &region, replay.is_some());
        let damage_arg = replay.is_some().then_some(&region);
        if let Some(key) = target.finish_frame(damage_arg) {
            state.pending.push(PendingCompletion {
                key,
                frame_id: None,
            });
        }
        // The swap ages every buffer by one, so the exposed area joins the
        // ring like any frame's damage.
        self.push_prior_damage(s, exposed);

        self.tracer().expose(&ExposeEvent {
            subcompositor: s,
            rect: clipped,
            composites,
        });
        true
    }
}
