// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software rendering for weft.
//!
//! This crate provides a CPU implementation of the
//! [`RenderTarget`](weft_core::backend::RenderTarget) contract. It is small
//! enough to reason about pixel by pixel, which makes it the reference
//! against which incremental repaint is checked. It defines:
//!
//! - [`Rgba`] and [`Pixmap`]: premultiplied pixel storage
//! - [`BufferStore`]: pixel contents of client buffers by resource key
//! - [`SoftwareTarget`]: a swap chain with buffer ages, optional direct
//!   presentation and presentation feedback
//!
//! Sampling is nearest-neighbour at pixel centers through
//! [`DrawParams::view_to_buffer`](weft_core::backend::DrawParams::view_to_buffer);
//! the fractional offset is ignored.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod pixmap;
mod store;
mod swapchain;

#[cfg(test)]
mod oracle;

pub use pixmap::{Pixmap, Rgba};
pub use store::BufferStore;
pub use swapchain::{Completion, SoftwareTarget, Stats, SwapchainConfig};
