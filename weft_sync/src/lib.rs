// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame pacing for weft toplevels.
//!
//! This crate throttles subcompositor repaints to what the host can consume:
//!
//! - [`FrameClock`]: the host compositing manager's frame protocol, with
//!   [`CounterClock`] as an extended-sync-counter implementation
//! - [`SyncHelper`]: the per-window pacing state machine choosing between
//!   frame clock and presentation feedback, deferring unsafe repaints
//! - [`FrameTimeReconciler`]: monotonic frame callback timestamps from a
//!   host clock that wraps and only sometimes reports
//! - [`TimeSource`]: the local monotonic clock

mod clock;
mod frame_time;
mod helper;
mod time;

pub use clock::{CounterClock, FrameClock};
pub use frame_time::FrameTimeReconciler;
pub use helper::{FrameState, SyncConfig, SyncHelper};
pub use time::{ManualTime, MonotonicTime, TimeSource};
