// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each stamped with the
//! microseconds elapsed since the recorder was created. [`decode`] reads
//! them back as an iterator of [`Record`].
//!
//! Damage rectangle events ([`on_damage_rects`](TraceSink::on_damage_rects))
//! store only the count.

use std::time::Instant;

use weft_core::backend::{FrameNote, SynchronizationType, TargetAge};
use weft_core::region::Rect;
use weft_core::trace::{
    DamageRect, ExposeEvent, FrameNoteEvent, PacingDecision, PacingEvent, RepaintPath, TraceSink,
    UpdateEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_UPDATE: u8 = 1;
const TAG_EXPOSE: u8 = 2;
const TAG_FRAME_NOTE: u8 = 3;
const TAG_PACING: u8 = 4;
const TAG_DAMAGE_RECTS_COUNT: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    origin: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            origin: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        let elapsed = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.write_u8(tag);
        self.write_u64(elapsed);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_path(&mut self, p: Option<RepaintPath>) {
        self.write_u8(match p {
            None => 0,
            Some(RepaintPath::Incremental) => 1,
            Some(RepaintPath::Full) => 2,
        });
    }

    fn write_synchronization(&mut self, s: SynchronizationType) {
        self.write_u8(match s {
            SynchronizationType::FrameClock => 0,
            SynchronizationType::Presentation => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_update(&mut self, e: &UpdateEvent) {
        self.begin(TAG_UPDATE);
        self.write_u32(e.subcompositor);
        self.write_option_u64(e.frame_id);
        self.write_path(e.path);
        self.write_bool(e.presented);
        self.write_i32(e.age.to_raw());
        self.write_u32(e.damage_rects);
        self.write_u32(e.composites);
    }

    fn on_expose(&mut self, e: &ExposeEvent) {
        self.begin(TAG_EXPOSE);
        self.write_u32(e.subcompositor);
        self.write_i32(e.rect.x0);
        self.write_i32(e.rect.y0);
        self.write_i32(e.rect.x1);
        self.write_i32(e.rect.y1);
        self.write_u32(e.composites);
    }

    fn on_frame_note(&mut self, e: &FrameNoteEvent) {
        self.begin(TAG_FRAME_NOTE);
        self.write_u32(e.subcompositor);
        let (kind, msc, ust) = match e.note {
            FrameNote::Started { .. } => (0, 0, 0),
            FrameNote::Complete { .. } => (1, 0, 0),
            FrameNote::Presented { msc, ust, .. } => (2, msc, ust),
        };
        self.write_u8(kind);
        self.write_u64(e.note.frame_id());
        self.write_u64(msc);
        self.write_u64(ust);
    }

    fn on_pacing(&mut self, e: &PacingEvent) {
        self.begin(TAG_PACING);
        self.write_u32(e.subcompositor);
        match e.decision {
            PacingDecision::Deferred => self.write_u8(0),
            PacingDecision::Drained => self.write_u8(1),
            PacingDecision::FrameStarted {
                synchronization,
                clock_frame,
            } => {
                self.write_u8(2);
                self.write_synchronization(synchronization);
                self.write_bool(clock_frame);
            }
            PacingDecision::AwaitingHost => self.write_u8(3),
            PacingDecision::FrameDone { time_ms } => {
                self.write_u8(4);
                self.write_u32(time_ms);
            }
            PacingDecision::Freeze => self.write_u8(5),
        }
    }

    fn on_damage_rects(&mut self, frame_id: u64, rects: &[DamageRect]) {
        self.begin(TAG_DAMAGE_RECTS_COUNT);
        self.write_u64(frame_id);
        self.write_u32(u32::try_from(rects.len()).unwrap_or(u32::MAX));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// An [`UpdateEvent`].
    Update(UpdateEvent),
    /// An [`ExposeEvent`].
    Expose(ExposeEvent),
    /// A [`FrameNoteEvent`].
    FrameNote(FrameNoteEvent),
    /// A [`PacingEvent`].
    Pacing(PacingEvent),
    /// Damage-rect count for a frame.
    DamageRectsCount {
        /// Frame counter.
        frame_id: u64,
        /// Number of damage rects.
        count: u32,
    },
}

/// A decoded event and when it was recorded.
#[derive(Clone, Copy, Debug)]
pub struct Record {
    /// Microseconds since the recorder was created.
    pub at_us: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take::<1>()?[0])
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_path(&mut self) -> Option<Option<RepaintPath>> {
        Some(match self.read_u8()? {
            0 => None,
            1 => Some(RepaintPath::Incremental),
            _ => Some(RepaintPath::Full),
        })
    }

    fn read_synchronization(&mut self) -> Option<SynchronizationType> {
        Some(match self.read_u8()? {
            0 => SynchronizationType::FrameClock,
            _ => SynchronizationType::Presentation,
        })
    }

    fn decode_update(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Update(UpdateEvent {
            subcompositor: self.read_u32()?,
            frame_id: self.read_option_u64()?,
            path: self.read_path()?,
            presented: self.read_bool()?,
            age: TargetAge::from_raw(self.read_i32()?),
            damage_rects: self.read_u32()?,
            composites: self.read_u32()?,
        }))
    }

    fn decode_expose(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Expose(ExposeEvent {
            subcompositor: self.read_u32()?,
            rect: Rect::new(
                self.read_i32()?,
                self.read_i32()?,
                self.read_i32()?,
                self.read_i32()?,
            ),
            composites: self.read_u32()?,
        }))
    }

    fn decode_frame_note(&mut self) -> Option<RecordedEvent> {
        let subcompositor = self.read_u32()?;
        let kind = self.read_u8()?;
        let frame_id = self.read_u64()?;
        let msc = self.read_u64()?;
        let ust = self.read_u64()?;
        let note = match kind {
            0 => FrameNote::Started { frame_id },
            1 => FrameNote::Complete { frame_id },
            _ => FrameNote::Presented { frame_id, msc, ust },
        };
        Some(RecordedEvent::FrameNote(FrameNoteEvent {
            subcompositor,
            note,
        }))
    }

    fn decode_pacing(&mut self) -> Option<RecordedEvent> {
        let subcompositor = self.read_u32()?;
        let decision = match self.read_u8()? {
            0 => PacingDecision::Deferred,
            1 => PacingDecision::Drained,
            2 => PacingDecision::FrameStarted {
                synchronization: self.read_synchronization()?,
                clock_frame: self.read_bool()?,
            },
            3 => PacingDecision::AwaitingHost,
            4 => PacingDecision::FrameDone {
                time_ms: self.read_u32()?,
            },
            _ => PacingDecision::Freeze,
        };
        Some(RecordedEvent::Pacing(PacingEvent {
            subcompositor,
            decision,
        }))
    }

    fn decode_damage_rects_count(&mut self) -> Option<RecordedEvent> {
        let frame_id = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::DamageRectsCount { frame_id, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_us = self.read_u64()?;
        let event = match tag {
            TAG_UPDATE => self.decode_update(),
            TAG_EXPOSE => self.decode_expose(),
            TAG_FRAME_NOTE => self.decode_frame_note(),
            TAG_PACING => self.decode_pacing(),
            TAG_DAMAGE_RECTS_COUNT => self.decode_damage_rects_count(),
            _ => None, // unknown tag → stop iteration
        }?;
        Some(Record { at_us, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
