// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A software swap chain implementing [`RenderTarget`].
//!
//! The chain cycles through a fixed number of back buffers. Finishing a
//! frame shows the whole back buffer in the window, so stale pixels left
//! by wrong age bookkeeping become visible instead of being papered over
//! by a partial copy. Each buffer remembers the frame it was last drawn
//! in, which is what [`age`](RenderTarget::age) reports.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::Point;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use weft_core::backend::{
    Buffer, CompletionKey, DrawParams, Operator, RenderMode, RenderTarget, ResourceKey, TargetAge,
};
use weft_core::region::{Rect, Region};

use crate::pixmap::{Pixmap, Rgba};
use crate::store::BufferStore;

/// Microseconds per refresh of the simulated display.
const REFRESH_US: u64 = 16_667;

/// Capabilities of a [`SoftwareTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SwapchainConfig {
    /// Number of buffers in the chain, at least 1.
    pub buffers: usize,
    /// Accept client buffers for direct presentation.
    pub direct_present: bool,
    /// Report presentation completion instead of finishing synchronously.
    pub presentation: bool,
    /// Accept [`RenderMode::Vsync`].
    pub vsync: bool,
}

impl SwapchainConfig {
    /// Double buffered, synchronous, no extras.
    pub const DEFAULT: Self = Self {
        buffers: 2,
        direct_present: false,
        presentation: false,
        vsync: false,
    };
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Work counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Stats {
    /// Composite calls.
    pub composites: u64,
    /// Pixels written by composites and fills.
    pub pixels_drawn: u64,
    /// Composited frames shown.
    pub frames: u64,
    /// Client buffers presented directly.
    pub direct_presents: u64,
}

/// A completion the target has reported but the scene has not consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Completion {
    /// Key handed out by `finish_frame` or `present_to_window`.
    pub key: CompletionKey,
    /// Media stream counter at which the frame was shown.
    pub msc: u64,
    /// Time the frame was shown, in microseconds.
    pub ust: u64,
}

#[derive(Debug)]
struct Slot {
    pixmap: Pixmap,
    /// Frame number the buffer was last shown in.
    drawn_at: Option<u64>,
}

#[derive(Debug)]
struct State {
    config: SwapchainConfig,
    store: BufferStore,
    slots: Vec<Slot>,
    back: usize,
    window: Pixmap,
    /// Frames shown so far, composited or direct.
    shown: u64,
    /// The window currently shows a client buffer.
    direct_shown: bool,
    msc: u64,
    next_key: u64,
    pending: Vec<Completion>,
    mode: RenderMode,
    stats: Stats,
}

impl State {
    fn key(&mut self) -> CompletionKey {
        self.next_key += 1;
        CompletionKey(self.next_key)
    }

    fn show(&mut self) -> Completion {
        self.shown += 1;
        self.msc += 1;
        let key = self.key();
        Completion {
            key,
            msc: self.msc,
            ust: self.msc * REFRESH_US,
        }
    }
}

/// Software render target backed by a swap chain of pixmaps.
///
/// Clones share the same chain, so a caller can hand one clone to a
/// subcompositor and keep another to inspect the window.
#[derive(Clone)]
pub struct SoftwareTarget {
    state: Rc<RefCell<State>>,
}

impl fmt::Debug for SoftwareTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SoftwareTarget")
            .field("config", &state.config)
            .field("size", &(state.window.width(), state.window.height()))
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

impl SoftwareTarget {
    /// Creates an empty chain. It is sized by the first
    /// [`note_target_size`](RenderTarget::note_target_size).
    ///
    /// # Panics
    ///
    /// Panics if `config.buffers` is zero.
    #[must_use]
    pub fn new(config: SwapchainConfig) -> Self {
        assert!(config.buffers > 0, "a swap chain needs at least one buffer");
        let slots = (0..config.buffers)
            .map(|_| Slot {
                pixmap: Pixmap::new(0, 0),
                drawn_at: None,
            })
            .collect();
        Self {
            state: Rc::new(RefCell::new(State {
                config,
                store: BufferStore::new(),
                slots,
                back: 0,
                window: Pixmap::new(0, 0),
                shown: 0,
                direct_shown: false,
                msc: 0,
                next_key: 0,
                pending: Vec::new(),
                mode: RenderMode::Async,
                stats: Stats::default(),
            })),
        }
    }

    /// Registers or replaces the pixel contents of a client buffer.
    pub fn register(&self, key: ResourceKey, pixmap: Pixmap) {
        self.state.borrow_mut().store.insert(key, pixmap);
    }

    /// Runs `f` with the buffer store.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut BufferStore) -> R) -> R {
        f(&mut self.state.borrow_mut().store)
    }

    /// What the window currently shows.
    #[must_use]
    pub fn window(&self) -> Pixmap {
        self.state.borrow().window.clone()
    }

    /// Work done so far.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.state.borrow().stats
    }

    /// The active render mode.
    #[must_use]
    pub fn render_mode(&self) -> RenderMode {
        self.state.borrow().mode
    }

    /// Removes and returns every completion not yet consumed.
    pub fn take_completions(&self) -> Vec<Completion> {
        core::mem::take(&mut self.state.borrow_mut().pending)
    }
}

/// Maps a destination pixel center to the buffer pixel it samples.
#[expect(
    clippy::cast_possible_truncation,
    reason = "buffer coordinates are bounded by i32 buffer sizes"
)]
fn sample_at(params: &DrawParams, source: Rect, dest: Rect, x: i32, y: i32) -> (i32, i32) {
    let view = Point::new(
        f64::from(source.x0 + (x - dest.x0)) + 0.5,
        f64::from(source.y0 + (y - dest.y0)) + 0.5,
    );
    let p = params.view_to_buffer * view;
    (p.x.floor() as i32, p.y.floor() as i32)
}

impl RenderTarget for SoftwareTarget {
    fn composite(
        &mut self,
        buffer: &Buffer,
        op: Operator,
        source: Rect,
        dest: Rect,
        params: &DrawParams,
    ) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let contents = state.store.get(buffer.key());
        let bounds = Rect::new(0, 0, buffer.width(), buffer.height());
        let back = &mut state.slots[state.back].pixmap;
        let clip = dest.intersect(back.rect());

        for y in clip.y0..clip.y1 {
            for x in clip.x0..clip.x1 {
                let (bx, by) = sample_at(params, source, dest, x, y);
                let texel = match contents {
                    Some(pixmap) if bounds.contains_point(Point::new(
                        f64::from(bx) + 0.5,
                        f64::from(by) + 0.5,
                    )) =>
                    {
                        pixmap.get(bx, by)
                    }
                    _ => Rgba::TRANSPARENT,
                };
                let out = match op {
                    Operator::Source => texel,
                    Operator::Over => texel.over(back.get(x, y)),
                };
                back.set(x, y, out);
            }
        }
        state.stats.composites += 1;
        state.stats.pixels_drawn += u64::try_from(clip.area()).unwrap_or(0);
    }

    fn fill_transparent(&mut self, rects: &[Rect]) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let back = &mut state.slots[state.back].pixmap;
        for rect in rects {
            back.fill_rect(*rect, Rgba::TRANSPARENT);
            state.stats.pixels_drawn +=
                u64::try_from(rect.intersect(back.rect()).area()).unwrap_or(0);
        }
    }

    fn age(&self) -> TargetAge {
        let state = self.state.borrow();
        if state.direct_shown {
            return TargetAge::PresentOnly;
        }
        match state.slots[state.back].drawn_at {
            None => TargetAge::Invalid,
            Some(at) => TargetAge::Frames(u8::try_from(state.shown - at - 1).unwrap_or(u8::MAX)),
        }
    }

    fn finish_frame(&mut self, _damage: Option<&Region>) -> Option<CompletionKey> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let back = state.back;
        state.window.clone_from(&state.slots[back].pixmap);
        state.slots[back].drawn_at = Some(state.shown);
        state.back = (back + 1) % state.slots.len();
        state.direct_shown = false;
        state.stats.frames += 1;
        let completion = state.show();
        if state.config.presentation {
            state.pending.push(completion);
            Some(completion.key)
        } else {
            None
        }
    }

    fn present_to_window(
        &mut self,
        buffer: &Buffer,
        _damage: Option<&Region>,
    ) -> Option<CompletionKey> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.config.direct_present {
            return None;
        }
        let pixmap = state.store.get(buffer.key())?;
        if pixmap.rect() != state.window.rect() {
            return None;
        }
        state.window.clone_from(pixmap);
        state.direct_shown = true;
        state.stats.direct_presents += 1;
        let completion = state.show();
        state.pending.push(completion);
        Some(completion.key)
    }

    fn cancel_completion(&mut self, key: CompletionKey) {
        self.state.borrow_mut().pending.retain(|c| c.key != key);
    }

    fn set_render_mode(&mut self, mode: RenderMode, _next_frame: u64) -> bool {
        let mut state = self.state.borrow_mut();
        if mode == RenderMode::Vsync && !state.config.vsync {
            return false;
        }
        state.mode = mode;
        true
    }

    fn note_target_size(&mut self, width: i32, height: i32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if (state.window.width(), state.window.height()) == (width, height) {
            return;
        }
        for slot in &mut state.slots {
            slot.pixmap = Pixmap::new(width, height);
            slot.drawn_at = None;
        }
        state.back = 0;
        state.window = Pixmap::new(width, height);
        state.direct_shown = false;
    }

    fn supports_presentation(&self) -> bool {
        self.state.borrow().config.presentation
    }
}
