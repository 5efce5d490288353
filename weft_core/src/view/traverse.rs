// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child and paint-order traversal.

use super::id::{INVALID, ViewId};
use super::store::Scene;

/// An iterator over the direct children of a view or subcompositor, bottom
/// to top.
///
/// Created by [`Scene::children`].
#[derive(Debug)]
pub struct Children<'a> {
    scene: &'a Scene,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(scene: &'a Scene, first: u32) -> Self {
        Self {
            scene,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = ViewId;

    fn next(&mut self) -> Option<ViewId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.scene.next_sibling[idx as usize];
        Some(self.scene.view_id(idx))
    }
}

/// An iterator over a paint list, bottom to top.
///
/// Created by [`Scene::paint_order`] and [`Scene::subtree_paint_order`].
#[derive(Debug)]
pub struct PaintOrder<'a> {
    scene: &'a Scene,
    current: u32,
    last: u32,
}

impl<'a> PaintOrder<'a> {
    pub(crate) fn new(scene: &'a Scene, first: u32, last: u32) -> Self {
        Self {
            scene,
            current: first,
            last,
        }
    }
}

impl Iterator for PaintOrder<'_> {
    type Item = ViewId;

    fn next(&mut self) -> Option<ViewId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = if idx == self.last {
            INVALID
        } else {
            self.scene.paint_next[idx as usize]
        };
        Some(self.scene.view_id(idx))
    }
}

/// Raw indices of the visible views in a paint-list segment, bottom to top.
///
/// Walks from `first` through `last` (or to the end of the list when `last`
/// is [`INVALID`]). A hidden view is skipped together with its subtree by
/// jumping to its inferior, so every yielded view has all ancestors within
/// the segment shown. Callers must start at a view whose ancestors are
/// visible.
pub(crate) struct VisibleViews<'a> {
    scene: &'a Scene,
    current: u32,
    last: u32,
}

impl<'a> VisibleViews<'a> {
    pub(crate) fn new(scene: &'a Scene, first: u32, last: u32) -> Self {
        Self {
            scene,
            current: first,
            last,
        }
    }
}

impl Iterator for VisibleViews<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        while self.current != INVALID {
            let idx = self.current;
            let shows = self.scene.views[idx as usize].flags.shows();
            let end = if shows {
                idx
            } else {
                self.scene.inferior[idx as usize]
            };
            self.current = if end == self.last {
                INVALID
            } else {
                self.scene.paint_next[end as usize]
            };
            if shows {
                return Some(idx);
            }
        }
        None
    }
}
