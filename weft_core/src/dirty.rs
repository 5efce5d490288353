// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Each subcompositor keeps a [`DirtyTracker`](understory_dirty::DirtyTracker)
//! keyed by raw view slot index. Setting a view's opaque or input region
//! marks the matching channel; the next
//! [`Scene::update`](crate::view::Scene::update) drains both channels and,
//! if anything was marked, recomputes the subcompositor-wide union and
//! reports it through the corresponding callback.
//!
//! Both channels are local-only: a view's shapes do not depend on its
//! ancestors' shapes, so no dependency edges are added. Keys are removed
//! when a view leaves the subcompositor.
//!
//! Geometry changes (moves, maps, resizes) do not go through these channels.
//! They garbage the subcompositor, and a garbaged update always recomputes
//! both unions.

use understory_dirty::Channel;

/// Opaque region changed.
pub const OPAQUE: Channel = Channel::new(0);

/// Input region changed.
pub const INPUT: Channel = Channel::new(1);
