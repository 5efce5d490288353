// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for repaint and frame pacing.
//!
//! This module provides a [`TraceSink`] trait with one method per event.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine. A [`Scene`](crate::view::Scene) owns at most one sink
//! (see [`Scene::set_trace_sink`](crate::view::Scene::set_trace_sink)) and
//! reports every update, expose and frame note to it; the pacing layer
//! reports its decisions through the same sink.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies.
//! - `trace-rich` (implies `trace`): gates [`DamageRect`] events and the
//!   corresponding `TraceSink` method.

use crate::backend::{FrameNote, SynchronizationType, TargetAge};
use crate::region::Rect;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How an update was carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepaintPath {
    /// Only the damaged area (plus replayed prior damage) was redrawn.
    Incremental,
    /// The whole target was redrawn.
    Full,
}

/// What the pacing layer decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacingDecision {
    /// A repaint was requested while unsafe to draw and was deferred.
    Deferred,
    /// A deferred repaint is being performed.
    Drained,
    /// A new frame started with the given pacing.
    FrameStarted {
        /// Mechanism chosen for this frame.
        synchronization: SynchronizationType,
        /// Whether the frame clock accepted the frame.
        clock_frame: bool,
    },
    /// The frame was drawn by the target; waiting for the host.
    AwaitingHost,
    /// Frame callbacks were released with this timestamp.
    FrameDone {
        /// Protocol timestamp in milliseconds.
        time_ms: u32,
    },
    /// The host froze the window for a resize.
    Freeze,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the end of every subcompositor update that reached the target.
#[derive(Clone, Copy, Debug)]
pub struct UpdateEvent {
    /// Raw subcompositor slot index.
    pub subcompositor: u32,
    /// Frame counter value, or `None` when nothing changed.
    pub frame_id: Option<u64>,
    /// Repaint strategy, or `None` when nothing changed.
    pub path: Option<RepaintPath>,
    /// Whether the frame was presented directly instead of composited.
    pub presented: bool,
    /// Target age reported at the start of the update.
    pub age: TargetAge,
    /// Rectangles in the update region.
    pub damage_rects: u32,
    /// Composite operations issued.
    pub composites: u32,
}

/// Emitted after an exposure repaint.
#[derive(Clone, Copy, Debug)]
pub struct ExposeEvent {
    /// Raw subcompositor slot index.
    pub subcompositor: u32,
    /// Exposed rectangle, clipped to the target.
    pub rect: Rect,
    /// Composite operations issued.
    pub composites: u32,
}

/// Emitted whenever a frame note is delivered.
#[derive(Clone, Copy, Debug)]
pub struct FrameNoteEvent {
    /// Raw subcompositor slot index.
    pub subcompositor: u32,
    /// The note.
    pub note: FrameNote,
}

/// Emitted by the pacing layer.
#[derive(Clone, Copy, Debug)]
pub struct PacingEvent {
    /// Raw subcompositor slot index.
    pub subcompositor: u32,
    /// The decision taken.
    pub decision: PacingDecision,
}

/// An axis-aligned damage rectangle.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl From<Rect> for DamageRect {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width().unsigned_abs(),
            height: r.height().unsigned_abs(),
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after an update.
    fn on_update(&mut self, e: &UpdateEvent) {
        _ = e;
    }

    /// Called after an exposure repaint.
    fn on_expose(&mut self, e: &ExposeEvent) {
        _ = e;
    }

    /// Called when a frame note is delivered.
    fn on_frame_note(&mut self, e: &FrameNoteEvent) {
        _ = e;
    }

    /// Called when the pacing layer takes a decision.
    fn on_pacing(&mut self, e: &PacingEvent) {
        _ = e;
    }

    /// Called with the update region of a frame (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_id: u64, rects: &[DamageRect]) {
        _ = (frame_id, rects);
    }
}

/// Shared sinks, so the installer can keep a handle to read them back.
impl<T: TraceSink + ?Sized> TraceSink for alloc::rc::Rc<core::cell::RefCell<T>> {
    fn on_update(&mut self, e: &UpdateEvent) {
        self.borrow_mut().on_update(e);
    }

    fn on_expose(&mut self, e: &ExposeEvent) {
        self.borrow_mut().on_expose(e);
    }

    fn on_frame_note(&mut self, e: &FrameNoteEvent) {
        self.borrow_mut().on_frame_note(e);
    }

    fn on_pacing(&mut self, e: &PacingEvent) {
        self.borrow_mut().on_pacing(e);
    }

    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_id: u64, rects: &[DamageRect]) {
        self.borrow_mut().on_damage_rects(frame_id, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`UpdateEvent`].
    #[inline]
    pub fn update(&mut self, e: &UpdateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ExposeEvent`].
    #[inline]
    pub fn expose(&mut self, e: &ExposeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_expose(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameNoteEvent`].
    #[inline]
    pub fn frame_note(&mut self, e: &FrameNoteEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_note(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PacingEvent`].
    #[inline]
    pub fn pacing(&mut self, e: &PacingEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pacing(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits the rectangles of an update region (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_id: u64, rects: &[Rect]) {
        if let Some(s) = &mut self.sink {
            let converted: alloc::vec::Vec<DamageRect> =
                rects.iter().copied().map(DamageRect::from).collect();
            s.on_damage_rects(frame_id, &converted);
        }
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        updates: u32,
        pacing: u32,
    }

    impl TraceSink for Counting {
        fn on_update(&mut self, _e: &UpdateEvent) {
            self.updates += 1;
        }
        fn on_pacing(&mut self, _e: &PacingEvent) {
            self.pacing += 1;
        }
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let mut sink = Counting::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.update(&UpdateEvent {
                subcompositor: 0,
                frame_id: Some(1),
                path: Some(RepaintPath::Full),
                presented: false,
                age: TargetAge::Invalid,
                damage_rects: 1,
                composites: 1,
            });
            tracer.pacing(&PacingEvent {
                subcompositor: 0,
                decision: PacingDecision::Deferred,
            });
            tracer.expose(&ExposeEvent {
                subcompositor: 0,
                rect: Rect::EMPTY,
                composites: 0,
            });
        }
        assert_eq!(sink.updates, 1);
        assert_eq!(sink.pacing, 1);
    }

    #[test]
    fn none_tracer_is_silent() {
        let mut tracer = Tracer::none();
        tracer.pacing(&PacingEvent {
            subcompositor: 0,
            decision: PacingDecision::Freeze,
        });
    }

    #[test]
    fn scene_reports_to_shared_sink() {
        use alloc::boxed::Box;
        use alloc::rc::Rc;
        use core::cell::RefCell;

        use crate::backend::NoopObserver;
        use crate::subcompositor::SubcompositorConfig;
        use crate::testing::{RecordingTarget, solid_buffer};
        use crate::view::Scene;

        let sink = Rc::new(RefCell::new(Counting::default()));
        let mut scene = Scene::new();
        scene.set_trace_sink(Some(Box::new(Rc::clone(&sink))));
        let sub = scene.create_subcompositor(SubcompositorConfig::OFFSCREEN);
        let (target, _log) = RecordingTarget::new(TargetAge::Frames(0));
        scene.set_target(sub, Some(Box::new(target)));
        let v = scene.create_view();
        scene.attach_buffer(v, Some(solid_buffer(1, 8, 8)));
        scene.insert(sub, v);

        scene.update(sub, &mut NoopObserver);
        scene.update(sub, &mut NoopObserver);
        assert_eq!(sink.borrow().updates, 2);
    }
}
