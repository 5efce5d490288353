// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View hierarchy and damage-driven repaint for a Wayland-on-X11 compositor.
//!
//! `weft_core` holds the scene graph that client surfaces are mapped onto
//! and the incremental repaint that turns it into pixels on a host window.
//! It is `no_std` compatible (with `alloc`) and stores views as
//! struct-of-arrays behind generational handles.
//!
//! # Architecture
//!
//! ```text
//!   protocol layer (commits)
//!       │ attach / move / damage / insert ...
//!       ▼
//!   Scene ── views, paint lists, bounds, pending damage
//!       │
//!       │ Scene::update(sub, observer)
//!       ▼
//!   RenderTarget ──► finish_frame / present_to_window
//!       │
//!       ▼ FrameNote (Started, Complete, Presented)
//!   FrameObserver (frame pacing)
//! ```
//!
//! **[`view`]**: The view forest. Each subcompositor keeps its views in
//! one flattened paint list; a view's subtree is the contiguous segment
//! from the view to its *inferior*, so reparenting splices segments
//! instead of re-flattening.
//!
//! **[`subcompositor`]**: Bounds, repaint, exposure and hit testing. Views
//! accumulate damage; [`Scene::update`](view::Scene::update) redraws only
//! what changed, replaying earlier damage according to the target's age.
//!
//! **[`backend`]**: The [`RenderTarget`](backend::RenderTarget) contract
//! and shared client [`Buffer`](backend::Buffer)s.
//!
//! **[`region`]**: Integer rectangles and rectangle-set regions.
//!
//! **[`transform`]**: Buffer transforms and viewports.
//!
//! **[`dirty`]**: Channels for per-view opaque and input changes.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types
//! for repaint and pacing instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-update
//!   damage-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod dirty;
pub mod region;
pub mod subcompositor;
pub mod trace;
pub mod transform;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
