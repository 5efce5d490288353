// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host compositing manager's frame protocol.
//!
//! A [`FrameClock`] tells the host when the window starts and finishes
//! drawing a frame, and learns from the host when that frame has actually
//! been composited. Until then the window should not start another frame
//! unless the host allows batching.

/// Frame synchronization with the host compositing manager.
pub trait FrameClock {
    /// Announces a new frame. Returns `false` if the clock refuses, for
    /// example because the previous frame has not been drawn and batching
    /// is not allowed.
    fn start_frame(&mut self, allow_batch: bool) -> bool;

    /// Announces that the frame's contents are complete.
    fn end_frame(&mut self);

    /// Returns `true` while the host has not drawn the last frame.
    fn frame_in_progress(&self) -> bool;

    /// Returns `true` if the host accepts frames before drawing the
    /// previous one.
    fn can_batch(&self) -> bool;

    /// The host reported that it drew the last frame.
    fn frame_drawn(&mut self);

    /// The window acknowledged a geometry change from the host.
    fn note_configure(&mut self);
}

/// A frame clock driven by an extended synchronization counter.
///
/// The counter is odd while a frame is being drawn and even otherwise. The
/// host may ask, with a sync request, for the counter to reach a given
/// value once a configure has been handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CounterClock {
    value: u64,
    in_progress: bool,
    batching: bool,
    sync_request: Option<u64>,
    frames_drawn: u64,
}

impl CounterClock {
    /// Creates a clock. `batching` reflects whether the host accepts
    /// several frames before drawing.
    #[must_use]
    pub const fn new(batching: bool) -> Self {
        Self {
            value: 0,
            in_progress: false,
            batching,
            sync_request: None,
            frames_drawn: 0,
        }
    }

    /// Current counter value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Number of frames the host reported drawn.
    #[must_use]
    pub const fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Records the value the host asked for with a sync request.
    pub fn request_sync(&mut self, value: u64) {
        self.sync_request = Some(value);
    }
}

impl FrameClock for CounterClock {
    fn start_frame(&mut self, allow_batch: bool) -> bool {
        if self.in_progress && !(allow_batch && self.batching) {
            return false;
        }
        if self.value % 2 == 0 {
            self.value += 1;
        }
        self.in_progress = true;
        true
    }

    fn end_frame(&mut self) {
        if self.value % 2 == 1 {
            self.value += 1;
        }
    }

    fn frame_in_progress(&self) -> bool {
        self.in_progress
    }

    fn can_batch(&self) -> bool {
        self.batching
    }

    fn frame_drawn(&mut self) {
        if self.in_progress {
            self.in_progress = false;
            self.frames_drawn += 1;
        }
    }

    fn note_configure(&mut self) {
        let Some(requested) = self.sync_request.take() else {
            return;
        };
        // The requested value marks a finished frame, so it must be even.
        let requested = requested + requested % 2;
        if requested > self.value && self.value % 2 == 0 {
            self.value = requested;
        } else if requested > self.value {
            // Mid-frame: the frame's end lands on the requested value.
            self.value = requested - 1;
        }
    }
}
