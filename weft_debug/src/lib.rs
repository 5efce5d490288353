// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for weft
//! diagnostics.
//!
//! This crate provides [`TraceSink`](weft_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from
//!   recorded bytes.
//!
//! Install a sink with [`Scene::set_trace_sink`](weft_core::view::Scene::set_trace_sink);
//! wrap it in `Rc<RefCell<_>>` to read it back afterwards.

pub mod chrome;
pub mod pretty;
pub mod recorder;
