// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each subcompositor becomes a process. Frames are async slices from their
//! start note to their completion or presentation note; everything else is
//! an instant event.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use weft_core::backend::FrameNote;
use weft_core::trace::PacingDecision;

use crate::recorder::{RecordedEvent, decode};

/// Thread id for subcompositor events.
const TID_COMPOSITOR: u32 = 0;
/// Thread id for pacing decisions.
const TID_PACING: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = record.at_us;
        match record.event {
            RecordedEvent::Update(e) => {
                let name = match (e.frame_id, e.presented) {
                    (None, _) => "Unchanged",
                    (Some(_), true) => "DirectPresent",
                    (Some(_), false) => "Update",
                };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Subcompositor",
                    "ts": ts,
                    "pid": e.subcompositor,
                    "tid": TID_COMPOSITOR,
                    "s": "t",
                    "args": {
                        "frame_id": e.frame_id,
                        "path": e.path.map(|p| format!("{p:?}")),
                        "age": e.age.to_raw(),
                        "damage_rects": e.damage_rects,
                        "composites": e.composites,
                    }
                }));
            }
            RecordedEvent::Expose(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Expose",
                    "cat": "Subcompositor",
                    "ts": ts,
                    "pid": e.subcompositor,
                    "tid": TID_COMPOSITOR,
                    "s": "t",
                    "args": {
                        "rect": [e.rect.x0, e.rect.y0, e.rect.x1, e.rect.y1],
                        "composites": e.composites,
                    }
                }));
            }
            RecordedEvent::FrameNote(e) => {
                let (ph, args) = match e.note {
                    FrameNote::Started { .. } => ("b", json!({})),
                    FrameNote::Complete { .. } => ("e", json!({})),
                    FrameNote::Presented { msc, ust, .. } => {
                        ("e", json!({ "msc": msc, "ust": ust }))
                    }
                };
                events.push(json!({
                    "ph": ph,
                    "name": "Frame",
                    "cat": "Frame",
                    "id": e.note.frame_id(),
                    "ts": ts,
                    "pid": e.subcompositor,
                    "tid": TID_COMPOSITOR,
                    "args": args,
                }));
            }
            RecordedEvent::Pacing(e) => {
                let (name, args) = match e.decision {
                    PacingDecision::Deferred => ("Deferred", json!({})),
                    PacingDecision::Drained => ("Drained", json!({})),
                    PacingDecision::FrameStarted {
                        synchronization,
                        clock_frame,
                    } => (
                        "FrameStarted",
                        json!({
                            "synchronization": format!("{synchronization:?}"),
                            "clock_frame": clock_frame,
                        }),
                    ),
                    PacingDecision::AwaitingHost => ("AwaitingHost", json!({})),
                    PacingDecision::FrameDone { time_ms } => {
                        ("FrameDone", json!({ "time_ms": time_ms }))
                    }
                    PacingDecision::Freeze => ("Freeze", json!({})),
                };
                events.push(json!({
                    "ph": "i",
                    "name": name,
                    "cat": "Pacing",
                    "ts": ts,
                    "pid": e.subcompositor,
                    "tid": TID_PACING,
                    "s": "t",
                    "args": args,
                }));
            }
            RecordedEvent::DamageRectsCount { frame_id, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": TID_COMPOSITOR,
                    "s": "p",
                    "args": {
                        "frame_id": frame_id,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
