// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use weft_core::backend::{FrameNote, TargetAge};
use weft_core::trace::{
    DamageRect, ExposeEvent, FrameNoteEvent, PacingDecision, PacingEvent, TraceSink, UpdateEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn age_label(age: TargetAge) -> String {
    match age {
        TargetAge::Invalid => "invalid".to_owned(),
        TargetAge::Frames(n) => n.to_string(),
        TargetAge::PresentOnly => "present-only".to_owned(),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update(&mut self, e: &UpdateEvent) {
        let age = age_label(e.age);
        let _ = match e.frame_id {
            None => writeln!(
                self.writer,
                "[update] sub={} unchanged age={age}",
                e.subcompositor,
            ),
            Some(frame) if e.presented => writeln!(
                self.writer,
                "[update] sub={} frame={frame} presented directly age={age}",
                e.subcompositor,
            ),
            Some(frame) => {
                let path = e.path.map_or_else(|| "-".to_owned(), |p| format!("{p:?}"));
                writeln!(
                    self.writer,
                    "[update] sub={} frame={frame} path={path} age={age} rects={} composites={}",
                    e.subcompositor, e.damage_rects, e.composites,
                )
            }
        };
    }

    fn on_expose(&mut self, e: &ExposeEvent) {
        let r = e.rect;
        let _ = writeln!(
            self.writer,
            "[expose] sub={} rect=({}, {})..({}, {}) composites={}",
            e.subcompositor, r.x0, r.y0, r.x1, r.y1, e.composites,
        );
    }

    fn on_frame_note(&mut self, e: &FrameNoteEvent) {
        let _ = match e.note {
            FrameNote::Started { frame_id } => writeln!(
                self.writer,
                "[note] sub={} frame={frame_id} started",
                e.subcompositor,
            ),
            FrameNote::Complete { frame_id } => writeln!(
                self.writer,
                "[note] sub={} frame={frame_id} complete",
                e.subcompositor,
            ),
            FrameNote::Presented { frame_id, msc, ust } => writeln!(
                self.writer,
                "[note] sub={} frame={frame_id} presented msc={msc} ust={ust}µs",
                e.subcompositor,
            ),
        };
    }

    fn on_pacing(&mut self, e: &PacingEvent) {
        let _ = match e.decision {
            PacingDecision::FrameStarted {
                synchronization,
                clock_frame,
            } => writeln!(
                self.writer,
                "[pacing] sub={} frame-started sync={synchronization:?} clock_frame={clock_frame}",
                e.subcompositor,
            ),
            PacingDecision::FrameDone { time_ms } => writeln!(
                self.writer,
                "[pacing] sub={} frame-done time={time_ms}ms",
                e.subcompositor,
            ),
            PacingDecision::Deferred => {
                writeln!(self.writer, "[pacing] sub={} deferred", e.subcompositor)
            }
            PacingDecision::Drained => {
                writeln!(self.writer, "[pacing] sub={} drained", e.subcompositor)
            }
            PacingDecision::AwaitingHost => {
                writeln!(self.writer, "[pacing] sub={} awaiting-host", e.subcompositor)
            }
            PacingDecision::Freeze => {
                writeln!(self.writer, "[pacing] sub={} freeze", e.subcompositor)
            }
        };
    }

    fn on_damage_rects(&mut self, frame_id: u64, rects: &[DamageRect]) {
        let _ = writeln!(
            self.writer,
            "[damage] frame={frame_id} rects={}",
            rects.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::backend::SynchronizationType;
    use weft_core::trace::RepaintPath;

    fn sink() -> PrettyPrintSink<Vec<u8>> {
        PrettyPrintSink::with_writer(Vec::new())
    }

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn pretty_print_update() {
        let mut s = sink();
        s.on_update(&UpdateEvent {
            subcompositor: 0,
            frame_id: Some(3),
            path: Some(RepaintPath::Incremental),
            presented: false,
            age: TargetAge::Frames(1),
            damage_rects: 2,
            composites: 4,
        });
        s.on_update(&UpdateEvent {
            subcompositor: 0,
            frame_id: None,
            path: None,
            presented: false,
            age: TargetAge::Invalid,
            damage_rects: 0,
            composites: 0,
        });
        let out = output(s);
        assert!(
            out.contains("frame=3 path=Incremental age=1 rects=2 composites=4"),
            "got: {out}"
        );
        assert!(out.contains("unchanged age=invalid"), "got: {out}");
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn pretty_print_pacing() {
        let mut s = sink();
        s.on_pacing(&PacingEvent {
            subcompositor: 1,
            decision: PacingDecision::FrameStarted {
                synchronization: SynchronizationType::FrameClock,
                clock_frame: true,
            },
        });
        s.on_pacing(&PacingEvent {
            subcompositor: 1,
            decision: PacingDecision::FrameDone { time_ms: 16 },
        });
        let out = output(s);
        assert!(out.contains("sync=FrameClock clock_frame=true"), "got: {out}");
        assert!(out.contains("[pacing] sub=1 frame-done time=16ms"), "got: {out}");
    }

    #[test]
    fn pretty_print_presented_note() {
        let mut s = sink();
        s.on_frame_note(&FrameNoteEvent {
            subcompositor: 0,
            note: FrameNote::Presented {
                frame_id: 5,
                msc: 10,
                ust: 166_670,
            },
        });
        let out = output(s);
        assert!(out.contains("frame=5 presented msc=10"), "got: {out}");
    }
}
