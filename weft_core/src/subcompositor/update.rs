// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage-driven repaint.
//!
//! An update first decides how much to redraw:
//!
//! - **Incremental** (not garbaged, target age 0 to 2): walk the visible
//!   views bottom to top. Each view's opaque area is subtracted from the
//!   running update region (whatever lies beneath will be covered) and its
//!   damage is added. The damage of the last `age` swaps is then replayed
//!   on top, since the back buffer missed those frames. An empty result
//!   means nothing to draw and no frame is produced.
//! - **Full** (garbaged, or any other age): the update region is the whole
//!   target.
//!
//! Drawing walks forward from the lowest view still needed to cover the
//! update region. The first view drawn replaces the destination if it covers
//! the region; otherwise the region is cleared first. Every later view
//! blends over. A single fullscreen view with a one-to-one buffer mapping
//! is handed to the target for direct presentation instead.
//!
//! Garbaged and dirty state is cleared only once the frame is finished.

use alloc::rc::Rc;
use alloc::vec::Vec;

use understory_dirty::{Channel, DirtyTracker};

use crate::backend::{Buffer, FrameNote, FrameObserver, Operator, RenderTarget};
use crate::dirty;
use crate::region::{Rect, Region};
use crate::trace::{FrameNoteEvent, RepaintPath, UpdateEvent};
use crate::view::{INVALID, Scene, SubcompositorId, ViewState, VisibleViews};

use super::PendingCompletion;

/// Result of [`Scene::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOutcome {
    /// Frozen or no target; nothing happened.
    Suppressed,
    /// Nothing changed since the target was last drawn; no frame started.
    Unchanged,
    /// A frame was composited.
    Composited {
        /// Frame counter value of the new frame.
        frame_id: u64,
        /// How much was redrawn.
        path: RepaintPath,
    },
    /// A client buffer was handed to the target for direct presentation.
    Presented {
        /// Frame counter value of the new frame.
        frame_id: u64,
    },
}

/// A visible buffer-backed view and its rectangle in target coordinates.
#[derive(Clone, Copy, Debug)]
pub(super) struct DrawItem {
    pub(super) idx: u32,
    pub(super) rect: Rect,
}

/// Drains `channel`, reporting whether anything was marked.
fn take_dirty(tracker: &mut DirtyTracker<u32>, channel: Channel) -> bool {
    let drained: Vec<u32> = tracker.drain(channel).deterministic().run().collect();
    !drained.is_empty()
}

fn opaque_in_target(view: &ViewState, rect: Rect) -> Region {
    let mut r = view.opaque.translated(rect.x0, rect.y0);
    r.intersect_rect(rect);
    r
}

fn input_in_target(view: &ViewState, rect: Rect) -> Region {
    match &view.input {
        None => Region::from_rect(rect),
        Some(input) => {
            let mut r = input.translated(rect.x0, rect.y0);
            r.intersect_rect(rect);
            r
        }
    }
}

fn damage_in_target(view: &ViewState, rect: Rect) -> Region {
    let Some(to_view) = view.buffer_to_view() else {
        return Region::new();
    };
    let mut r = view.damage.transformed(to_view);
    r.translate(rect.x0, rect.y0);
    r.intersect_rect(rect);
    r
}

/// Composites `items` bottom to top, restricted to `region`.
///
/// With `per_rect`, one composite is issued for each non-empty intersection
/// of a view with a region rectangle; otherwise one per view, clipped to the
/// region's extents. Returns the number of composites.
pub(super) fn paint(
    target: &mut dyn RenderTarget,
    views: &[ViewState],
    items: &[DrawItem],
    region: &Region,
    per_rect: bool,
) -> u32 {
    let mut composites = 0;
    let mut first = true;
    let mut dests = Vec::new();
    for item in items {
        let view = &views[item.idx as usize];
        let (Some(buffer), Some(params)) = (view.buffer.as_ref(), view.draw_params()) else {
            continue;
        };

        dests.clear();
        if per_rect {
            dests.extend(
                region
                    .rects()
                    .iter()
                    .map(|r| r.intersect(item.rect))
                    .filter(|r| !r.is_empty()),
            );
        } else {
            let r = item.rect.intersect(region.extents());
            if !r.is_empty() {
                dests.push(r);
            }
        }
        if dests.is_empty() {
            continue;
        }

        let op = if first {
            first = false;
            if region.rects().iter().all(|r| item.rect.contains_rect(*r)) {
                Operator::Source
            } else {
                target.fill_transparent(region.rects());
                Operator::Over
            }
        } else {
            Operator::Over
        };

        for dest in &dests {
            let source = dest.translate(-item.rect.x0, -item.rect.y0);
            target.composite(buffer, op, source, *dest, &params);
            composites += 1;
        }
    }
    if first {
        // Nothing intersected: the region must still not show stale pixels.
        target.fill_transparent(region.rects());
    }
    composites
}

impl Scene {
    /// Repaints a subcompositor onto its target.
    ///
    /// `observer` receives [`FrameNote::Started`] before anything is drawn
    /// and [`FrameNote::Complete`] if the target finishes synchronously.
    /// Asynchronous completions are reported later through
    /// [`complete_frame`](Self::complete_frame) and
    /// [`complete_presentation`](Self::complete_presentation).
    pub fn update(
        &mut self,
        id: SubcompositorId,
        observer: &mut dyn FrameObserver,
    ) -> UpdateOutcome {
        self.validate_sub(id);
        let s = id.idx;
        let si = s as usize;
        if self.subs[si].frozen || self.subs[si].target.is_none() {
            return UpdateOutcome::Suppressed;
        }

        let bounds = self.subs[si].bounds;
        let target_rect = bounds.target_rect();
        self.note_target_size(s);

        let age = match self.subs[si].target.as_deref() {
            Some(target) => target.age(),
            None => return UpdateOutcome::Suppressed,
        };
        let garbaged = self.subs[si].garbaged;
        let replay = if garbaged { None } else { age.incremental() };
        let items = self.draw_items(s);

        let opaque_dirty = take_dirty(&mut self.subs[si].dirty, dirty::OPAQUE);
        let input_dirty = take_dirty(&mut self.subs[si].dirty, dirty::INPUT);

        let mut start = 0;
        let (fresh, update) = match replay {
            Some(n) => {
                let mut fresh = Region::new();
                for item in &items {
                    let view = &self.views[item.idx as usize];
                    if !view.opaque.is_empty() {
                        fresh.subtract(&opaque_in_target(view, item.rect));
                    }
                    if !view.damage.is_empty() {
                        fresh.union(&damage_in_target(view, item.rect));
                    }
                }
                for item in &items {
                    self.views[item.idx as usize].damage.clear();
                }
                fresh.intersect_rect(target_rect);

                let mut update = fresh.clone();
                self.replay_damage(s, n, &mut update);

                let limit = self.subs[si].config.damage_rect_limit;
                let rects = update.len();
                if update.simplify(limit) {
                    fresh.simplify(limit);
                    log::debug!(
                        "subcompositor {s}: {rects} damage rectangles exceed limit {limit}, redrawing extents"
                    );
                }

                if update.is_empty() {
                    self.refresh_shapes(s, &items, opaque_dirty, input_dirty, false);
                    self.tracer().update(&UpdateEvent {
                        subcompositor: s,
                        frame_id: None,
                        path: None,
                        presented: false,
                        age,
                        damage_rects: 0,
                        composites: 0,
                    });
                    return UpdateOutcome::Unchanged;
                }
                start = self.start_item(&items, &update);
                (fresh, update)
            }
            None => {
                for item in &items {
                    self.views[item.idx as usize].damage.clear();
                }
                let full = Region::from_rect(target_rect);
                (full.clone(), full)
            }
        };
        let path = if replay.is_some() {
            RepaintPath::Incremental
        } else {
            RepaintPath::Full
        };

        let frame_id = {
            let state = &mut self.subs[si];
            state.frame_counter += 1;
            state.frame_counter
        };
        self.deliver_note(s, FrameNote::Started { frame_id }, observer);

        let damage_arg = (path == RepaintPath::Incremental).then_some(&update);
        if let Some(buffer) = self.direct_candidate(s, &items, target_rect) {
            let state = &mut self.subs[si];
            let key = match state.target.as_deref_mut() {
                Some(target) => target.present_to_window(&buffer, damage_arg),
                None => None,
            };
            if let Some(key) = key {
                state.pending.push(PendingCompletion {
                    key,
                    frame_id: Some(frame_id),
                });
                self.finish_update(s, &items, fresh, opaque_dirty, input_dirty);
                self.tracer().update(&UpdateEvent {
                    subcompositor: s,
                    frame_id: Some(frame_id),
                    path: Some(path),
                    presented: true,
                    age,
                    damage_rects: 0,
                    composites: 0,
                });
                return UpdateOutcome::Presented { frame_id };
            }
            log::debug!("subcompositor {s}: direct presentation refused, compositing instead");
            if let Some(callback) = state.callbacks.direct_present_disabled.as_mut() {
                callback();
            }
        }

        let state = &mut self.subs[si];
        let Some(target) = state.target.as_deref_mut() else {
            return UpdateOutcome::Suppressed;
        };
        let composites = paint(
            target,
            &self.views,
            &items[start..],
            &update,
            path == RepaintPath::Incremental,
        );
        let completion = target.finish_frame(damage_arg);
        if let Some(key) = completion {
            state.pending.push(PendingCompletion {
                key,
                frame_id: Some(frame_id),
            });
        }

        let damage_rects = u32::try_from(update.len()).unwrap_or(u32::MAX);
        #[cfg(feature = "trace-rich")]
        self.tracer().damage_rects(frame_id, update.rects());
        self.finish_update(s, &items, fresh, opaque_dirty, input_dirty);
        self.tracer().update(&UpdateEvent {
            subcompositor: s,
            frame_id: Some(frame_id),
            path: Some(path),
            presented: false,
            age,
            damage_rects,
            composites,
        });

        if completion.is_none() {
            self.deliver_note(s, FrameNote::Complete { frame_id }, observer);
        }
        UpdateOutcome::Composited { frame_id, path }
    }

    /// Reports that the target finished an asynchronous frame. Returns
    /// `false` for unknown keys.
    pub fn complete_frame(
        &mut self,
        id: SubcompositorId,
        key: crate::backend::CompletionKey,
        observer: &mut dyn FrameObserver,
    ) -> bool {
        self.validate_sub(id);
        let Some(frame_id) = self.take_pending(id.idx, key) else {
            return false;
        };
        if let Some(frame_id) = frame_id {
            self.deliver_note(id.idx, FrameNote::Complete { frame_id }, observer);
        }
        true
    }

    /// Reports that a frame reached the display at media stream counter
    /// `msc` and time `ust` (microseconds). Returns `false` for unknown keys.
    pub fn complete_presentation(
        &mut self,
        id: SubcompositorId,
        key: crate::backend::CompletionKey,
        msc: u64,
        ust: u64,
        observer: &mut dyn FrameObserver,
    ) -> bool {
        self.validate_sub(id);
        let Some(frame_id) = self.take_pending(id.idx, key) else {
            return false;
        };
        if let Some(frame_id) = frame_id {
            self.deliver_note(
                id.idx,
                FrameNote::Presented { frame_id, msc, ust },
                observer,
            );
        }
        true
    }

    /// Removes a pending completion, returning its frame id slot.
    fn take_pending(&mut self, s: u32, key: crate::backend::CompletionKey) -> Option<Option<u64>> {
        let pending = &mut self.subs[s as usize].pending;
        let pos = pending.iter().position(|p| p.key == key)?;
        Some(pending.remove(pos).frame_id)
    }

    pub(super) fn deliver_note(
        &mut self,
        s: u32,
        note: FrameNote,
        observer: &mut dyn FrameObserver,
    ) {
        if let Some(target) = self.subs[s as usize].target.as_deref_mut() {
            observer.note_frame(note, target);
        }
        self.tracer().frame_note(&FrameNoteEvent {
            subcompositor: s,
            note,
        });
    }

    /// Visible buffer-backed views in paint order, in target coordinates.
    pub(super) fn draw_items(&self, s: u32) -> Vec<DrawItem> {
        let state = &self.subs[s as usize];
        let (ox, oy) = (state.bounds.min_x, state.bounds.min_y);
        VisibleViews::new(self, state.head, INVALID)
            .filter_map(|idx| {
                self.view_rect(idx).map(|r| DrawItem {
                    idx,
                    rect: r.translate(-ox, -oy),
                })
            })
            .collect()
    }

    /// Index of the lowest item that must be drawn: the one at which opaque
    /// coverage accumulated from the top first swallows `update`.
    fn start_item(&self, items: &[DrawItem], update: &Region) -> usize {
        let mut covered = Region::new();
        for (i, item) in items.iter().enumerate().rev() {
            let view = &self.views[item.idx as usize];
            if view.opaque.is_empty() {
                continue;
            }
            covered.union(&opaque_in_target(view, item.rect));
            if covered.covers(update) {
                return i;
            }
        }
        0
    }

    /// The buffer to present directly, if the frame qualifies.
    fn direct_candidate(&self, s: u32, items: &[DrawItem], target_rect: Rect) -> Option<Rc<Buffer>> {
        if !self.subs[s as usize].config.direct_present {
            return None;
        }
        let [item] = items else {
            return None;
        };
        let view = &self.views[item.idx as usize];
        if !view.is_untransformed() || item.rect != target_rect {
            return None;
        }
        view.buffer.clone()
    }

    fn note_target_size(&mut self, s: u32) {
        let state = &mut self.subs[s as usize];
        let size = (state.bounds.width(), state.bounds.height());
        if state.noted_size == Some(size) {
            return;
        }
        if let Some(target) = state.target.as_deref_mut() {
            target.note_target_size(size.0, size.1);
        }
        state.noted_size = Some(size);
        state.garbaged = true;
    }

    /// Records the frame's own damage for later replays and clears
    /// per-frame state.
    fn finish_update(
        &mut self,
        s: u32,
        items: &[DrawItem],
        fresh: Region,
        opaque_dirty: bool,
        input_dirty: bool,
    ) {
        let garbaged = self.subs[s as usize].garbaged;
        self.refresh_shapes(s, items, opaque_dirty, input_dirty, garbaged);
        self.push_prior_damage(s, fresh);
        self.subs[s as usize].garbaged = false;
    }

    /// Adds the damage of the last `age` finished frames to `region`.
    pub(super) fn replay_damage(&self, s: u32, age: u8, region: &mut Region) {
        let ring = &self.subs[s as usize].prior_damage;
        for prior in ring.iter().take(usize::from(age)) {
            region.union(prior);
        }
    }

    /// Records what a finished frame changed, dropping the oldest entry.
    pub(super) fn push_prior_damage(&mut self, s: u32, fresh: Region) {
        let [newest, older] = &mut self.subs[s as usize].prior_damage;
        core::mem::swap(newest, older);
        *newest = fresh;
    }

    /// Recomputes the opaque and input unions when they may have changed,
    /// reporting differences through the callbacks.
    fn refresh_shapes(
        &mut self,
        s: u32,
        items: &[DrawItem],
        opaque_dirty: bool,
        input_dirty: bool,
        garbaged: bool,
    ) {
        if garbaged || opaque_dirty {
            let mut opaque = Region::new();
            for item in items {
                opaque.union(&opaque_in_target(&self.views[item.idx as usize], item.rect));
            }
            let state = &mut self.subs[s as usize];
            if opaque != state.opaque {
                state.opaque = opaque;
                if let Some(callback) = state.callbacks.opaque_changed.as_mut() {
                    callback(&state.opaque);
                }
            }
        }
        if garbaged || input_dirty {
            let mut input = Region::new();
            for item in items {
                input.union(&input_in_target(&self.views[item.idx as usize], item.rect));
            }
            let state = &mut self.subs[s as usize];
            if input != state.input {
                state.input = input;
                if let Some(callback) = state.callbacks.input_changed.as_mut() {
                    callback(&state.input);
                }
            }
        }
    }
}
