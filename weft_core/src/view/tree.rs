// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree topology and paint-list splicing.
//!
//! Every structural edit keeps two structures in step: the tree (parent and
//! sibling links) and the flattened paint list. Because a subtree is always
//! the contiguous segment `[view, inferior[view]]`, inserting or removing it
//! is a constant-time splice plus a walk up the ancestors whose cached
//! inferior pointed at the old segment boundary. Nothing is re-flattened.

use alloc::vec::Vec;

use super::id::{INVALID, ParentId, SubcompositorId, ViewId};
use super::store::Scene;
use super::traverse::{Children, PaintOrder};

/// Where among its new siblings an inserted view goes.
#[derive(Clone, Copy, Debug)]
enum Position {
    End,
    Start,
    Before(u32),
    After(u32),
}

impl Scene {
    // -- Insertion --

    /// Inserts `child` as the topmost child of `parent`.
    ///
    /// `parent` is either a view or a subcompositor. The child's whole
    /// subtree moves with it.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, `child` is already inserted somewhere, or
    /// `parent` lies inside `child`'s subtree.
    pub fn insert(&mut self, parent: impl Into<ParentId>, child: ViewId) {
        self.insert_at(parent.into(), child, Position::End);
    }

    /// Inserts `child` as the bottommost child of `parent`.
    ///
    /// # Panics
    ///
    /// As for [`insert`](Self::insert).
    pub fn insert_start(&mut self, parent: impl Into<ParentId>, child: ViewId) {
        self.insert_at(parent.into(), child, Position::Start);
    }

    /// Inserts `child` directly below `sibling` among `parent`'s children.
    ///
    /// # Panics
    ///
    /// As for [`insert`](Self::insert), and if `sibling` is not a child of
    /// `parent`.
    pub fn insert_before(&mut self, parent: impl Into<ParentId>, child: ViewId, sibling: ViewId) {
        self.validate(sibling);
        self.insert_at(parent.into(), child, Position::Before(sibling.idx));
    }

    /// Inserts `child` directly above `sibling` among `parent`'s children.
    ///
    /// # Panics
    ///
    /// As for [`insert_before`](Self::insert_before).
    pub fn insert_after(&mut self, parent: impl Into<ParentId>, child: ViewId, sibling: ViewId) {
        self.validate(sibling);
        self.insert_at(parent.into(), child, Position::After(sibling.idx));
    }

    fn insert_at(&mut self, parent: ParentId, child: ViewId, pos: Position) {
        self.validate(child);
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID && self.subcompositor[c as usize] == INVALID,
            "view is already inserted"
        );

        let (p, sub) = match parent {
            ParentId::View(pid) => {
                self.validate(pid);
                let mut a = pid.idx;
                while a != INVALID {
                    assert!(a != c, "cannot insert a view into its own subtree");
                    a = self.parent[a as usize];
                }
                (pid.idx, self.subcompositor[pid.idx as usize])
            }
            ParentId::Subcompositor(sid) => {
                self.validate_sub(sid);
                (INVALID, sid.idx)
            }
        };

        if let Position::Before(s) | Position::After(s) = pos {
            let s_ok = self.parent[s as usize] == p
                && (p != INVALID || self.subcompositor[s as usize] == sub);
            assert!(s_ok, "sibling is not a child of the given parent");
        }

        let last = self.inferior[c as usize];

        // -- Paint list --
        if p != INVALID {
            let boundary = self.inferior[p as usize];
            let (anchor, old_boundary) = match pos {
                Position::End => (boundary, Some(boundary)),
                Position::Start => (p, (boundary == p).then_some(p)),
                Position::Before(s) => (self.paint_prev[s as usize], None),
                Position::After(s) => {
                    let s_last = self.inferior[s as usize];
                    (s_last, (s_last == boundary).then_some(s_last))
                }
            };
            self.splice_after(sub, anchor, c, last);
            if let Some(old) = old_boundary {
                self.retarget_inferiors(p, old, last);
            }
        } else {
            let anchor = match pos {
                Position::End => self.subs[sub as usize].tail,
                Position::Start => INVALID,
                Position::Before(s) => self.paint_prev[s as usize],
                Position::After(s) => self.inferior[s as usize],
            };
            if anchor == INVALID {
                self.splice_head(sub, c, last);
            } else {
                self.splice_after(sub, anchor, c, last);
            }
        }

        // -- Tree --
        self.link_child(p, sub, c, pos);
        self.parent[c as usize] = p;
        self.set_subcompositor(c, sub);
        self.recompute_absolute(c);

        if sub != INVALID {
            if self.is_visible_idx(c) {
                self.grow_bounds_for_subtree(sub, c);
            }
            self.garbage_idx(sub);
        }
    }

    // -- Removal --

    /// Detaches a view (with its subtree) from its parent or subcompositor.
    ///
    /// The view becomes a detached root: its absolute position resets to its
    /// local position and it is no longer visible. The old subcompositor's
    /// bounds are rescanned and it is garbaged. Unparenting a detached root
    /// does nothing.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn unparent(&mut self, id: ViewId) {
        self.validate(id);
        let c = id.idx;
        let p = self.parent[c as usize];
        let sub = self.subcompositor[c as usize];
        if p == INVALID && sub == INVALID {
            return;
        }

        let last = self.inferior[c as usize];
        if p != INVALID {
            let prev = self.prev_sibling[c as usize];
            let new_boundary = if prev != INVALID {
                self.inferior[prev as usize]
            } else {
                p
            };
            self.retarget_inferiors(p, last, new_boundary);
        }

        let was_visible = sub != INVALID && self.is_visible_idx(c);
        self.unsplice(sub, c, last);
        self.unlink_child(c);
        self.parent[c as usize] = INVALID;

        if sub != INVALID {
            let segment: Vec<u32> = self.segment(c).collect();
            let tracker = &mut self.subs[sub as usize].dirty;
            for idx in segment {
                tracker.remove_key(idx);
            }
        }
        self.set_subcompositor(c, INVALID);
        self.recompute_absolute(c);

        if sub != INVALID {
            if was_visible {
                self.recompute_bounds(sub);
            }
            self.garbage_idx(sub);
        }
    }

    // -- Queries --

    /// Returns the parent view, if any. Top-level views of a subcompositor
    /// and detached roots have none.
    #[must_use]
    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.view_id(p))
    }

    /// Returns an iterator over the direct children of a view or the
    /// top-level views of a subcompositor, bottom to top.
    #[must_use]
    pub fn children(&self, parent: impl Into<ParentId>) -> Children<'_> {
        let first = match parent.into() {
            ParentId::View(id) => {
                self.validate(id);
                self.first_child[id.idx as usize]
            }
            ParentId::Subcompositor(sid) => {
                self.validate_sub(sid);
                self.subs[sid.idx as usize].first_child
            }
        };
        Children::new(self, first)
    }

    /// Returns every view of a subcompositor in paint order, bottom to top,
    /// including hidden ones.
    #[must_use]
    pub fn paint_order(&self, sub: SubcompositorId) -> PaintOrder<'_> {
        self.validate_sub(sub);
        PaintOrder::new(self, self.subs[sub.idx as usize].head, INVALID)
    }

    /// Returns a view and its descendants in paint order.
    #[must_use]
    pub fn subtree_paint_order(&self, id: ViewId) -> PaintOrder<'_> {
        self.validate(id);
        PaintOrder::new(self, id.idx, self.inferior[id.idx as usize])
    }

    /// Returns the last descendant of a view in paint order (the view itself
    /// when it has no children).
    #[must_use]
    pub fn inferior(&self, id: ViewId) -> ViewId {
        self.validate(id);
        self.view_id(self.inferior[id.idx as usize])
    }

    // -- Internal helpers --

    /// Raw indices of the segment `[first, inferior[first]]`.
    pub(crate) fn segment(&self, first: u32) -> impl Iterator<Item = u32> + '_ {
        let last = self.inferior[first as usize];
        let mut current = first;
        core::iter::from_fn(move || {
            if current == INVALID {
                return None;
            }
            let idx = current;
            current = if idx == last {
                INVALID
            } else {
                self.paint_next[idx as usize]
            };
            Some(idx)
        })
    }

    /// Points every view of a subtree at `sub`.
    pub(crate) fn set_subcompositor(&mut self, first: u32, sub: u32) {
        let last = self.inferior[first as usize];
        let mut n = first;
        loop {
            self.subcompositor[n as usize] = sub;
            if n == last {
                break;
            }
            n = self.paint_next[n as usize];
        }
    }

    /// Recomputes absolute positions for a subtree. Pre-order guarantees a
    /// parent is updated before its children.
    pub(crate) fn recompute_absolute(&mut self, first: u32) {
        let last = self.inferior[first as usize];
        let mut n = first;
        loop {
            let p = self.parent[n as usize];
            let (bx, by) = if p == INVALID {
                (0, 0)
            } else {
                let pv = &self.views[p as usize];
                (pv.abs_x, pv.abs_y)
            };
            let v = &mut self.views[n as usize];
            v.abs_x = bx + v.x;
            v.abs_y = by + v.y;
            if n == last {
                break;
            }
            n = self.paint_next[n as usize];
        }
    }

    /// Links the detached segment `[first, last]` after `anchor`.
    fn splice_after(&mut self, sub: u32, anchor: u32, first: u32, last: u32) {
        let next = self.paint_next[anchor as usize];
        self.paint_next[anchor as usize] = first;
        self.paint_prev[first as usize] = anchor;
        self.paint_next[last as usize] = next;
        if next != INVALID {
            self.paint_prev[next as usize] = last;
        } else if sub != INVALID {
            self.subs[sub as usize].tail = last;
        }
    }

    /// Links the detached segment `[first, last]` at the bottom of `sub`.
    fn splice_head(&mut self, sub: u32, first: u32, last: u32) {
        let state = &mut self.subs[sub as usize];
        let head = state.head;
        state.head = first;
        if head == INVALID {
            state.tail = last;
        }
        self.paint_prev[first as usize] = INVALID;
        self.paint_next[last as usize] = head;
        if head != INVALID {
            self.paint_prev[head as usize] = last;
        }
    }

    /// Cuts `[first, last]` out of its list, leaving it standalone.
    fn unsplice(&mut self, sub: u32, first: u32, last: u32) {
        let prev = self.paint_prev[first as usize];
        let next = self.paint_next[last as usize];
        if prev != INVALID {
            self.paint_next[prev as usize] = next;
        } else if sub != INVALID {
            self.subs[sub as usize].head = next;
        }
        if next != INVALID {
            self.paint_prev[next as usize] = prev;
        } else if sub != INVALID {
            self.subs[sub as usize].tail = prev;
        }
        self.paint_prev[first as usize] = INVALID;
        self.paint_next[last as usize] = INVALID;
    }

    /// Walks up from `from`, replacing `old` inferiors with `new`. Ancestors
    /// sharing a boundary form an unbroken chain, so the walk stops at the
    /// first mismatch.
    fn retarget_inferiors(&mut self, from: u32, old: u32, new: u32) {
        let mut a = from;
        while a != INVALID && self.inferior[a as usize] == old {
            self.inferior[a as usize] = new;
            a = self.parent[a as usize];
        }
    }

    fn set_first_child(&mut self, p: u32, sub: u32, v: u32) {
        if p != INVALID {
            self.first_child[p as usize] = v;
        } else {
            self.subs[sub as usize].first_child = v;
        }
    }

    fn set_last_child(&mut self, p: u32, sub: u32, v: u32) {
        if p != INVALID {
            self.last_child[p as usize] = v;
        } else {
            self.subs[sub as usize].last_child = v;
        }
    }

    fn link_child(&mut self, p: u32, sub: u32, c: u32, pos: Position) {
        let (first, last) = if p != INVALID {
            (self.first_child[p as usize], self.last_child[p as usize])
        } else {
            let state = &self.subs[sub as usize];
            (state.first_child, state.last_child)
        };
        let (prev, next) = match pos {
            Position::End => (last, INVALID),
            Position::Start => (INVALID, first),
            Position::Before(s) => (self.prev_sibling[s as usize], s),
            Position::After(s) => (s, self.next_sibling[s as usize]),
        };
        self.prev_sibling[c as usize] = prev;
        self.next_sibling[c as usize] = next;
        if prev != INVALID {
            self.next_sibling[prev as usize] = c;
        } else {
            self.set_first_child(p, sub, c);
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = c;
        } else {
            self.set_last_child(p, sub, c);
        }
    }

    fn unlink_child(&mut self, c: u32) {
        let p = self.parent[c as usize];
        let sub = self.subcompositor[c as usize];
        let prev = self.prev_sibling[c as usize];
        let next = self.next_sibling[c as usize];
        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.set_first_child(p, sub, next);
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        } else {
            self.set_last_child(p, sub, prev);
        }
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
    }
}
