// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View and subcompositor identity types.

use core::fmt;

/// Sentinel value indicating "no view" or "no subcompositor" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a view in a [`Scene`](super::Scene).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a view is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ViewId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a subcompositor in a [`Scene`](super::Scene).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubcompositorId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl SubcompositorId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for SubcompositorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubcompositorId({}@gen{})", self.idx, self.generation)
    }
}

/// Where a view is inserted: under another view, or at the top level of a
/// subcompositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParentId {
    /// A view parent.
    View(ViewId),
    /// The subcompositor itself.
    Subcompositor(SubcompositorId),
}

impl From<ViewId> for ParentId {
    fn from(id: ViewId) -> Self {
        Self::View(id)
    }
}

impl From<SubcompositorId> for ParentId {
    fn from(id: SubcompositorId) -> Self {
        Self::Subcompositor(id)
    }
}
