// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render backend contract.
//!
//! The scene graph never touches pixels itself. Each subcompositor owns an
//! optional [`RenderTarget`] (a window's back buffer, an offscreen picture,
//! a GPU surface) and drives it through the narrow set of operations below:
//!
//! - **Composite**: copy or blend a region of a [`Buffer`] onto the target,
//!   applying the view's [`DrawParams`].
//! - **Fill**: clear rectangles to transparent.
//! - **Age**: report how stale the target's contents are
//!   ([`TargetAge`]), which selects incremental or full repaint.
//! - **Finish / present**: end the frame, either by swapping composited
//!   contents or by handing a client buffer straight to the window.
//!
//! Operations that complete asynchronously return a [`CompletionKey`]. The
//! embedder later reports completion through
//! [`Scene::complete_frame`](crate::view::Scene::complete_frame) or
//! [`Scene::complete_presentation`](crate::view::Scene::complete_presentation),
//! and the scene forwards it to a [`FrameObserver`] as a [`FrameNote`].
//!
//! Capability gaps are not errors: a target that cannot present directly
//! returns `None` from [`RenderTarget::present_to_window`], and one that
//! cannot synchronize to vblank returns `false` from
//! [`RenderTarget::set_render_mode`]. Callers always have a fallback.

use alloc::boxed::Box;
use core::fmt;

use kurbo::{Affine, Vec2};

use crate::region::{Rect, Region};
use crate::transform::{BufferTransform, Viewport};

/// Identifies a client buffer's backing storage in the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(pub u64);

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({})", self.0)
    }
}

/// Identifies an outstanding asynchronous backend operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionKey(pub u64);

impl fmt::Debug for CompletionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompletionKey({})", self.0)
    }
}

/// A client buffer attached to one or more views.
///
/// Views hold buffers through `Rc<Buffer>`, so several views can show the
/// same contents. When the last reference is dropped the release hook (if
/// any) runs exactly once, telling the client the storage may be reused.
pub struct Buffer {
    key: ResourceKey,
    width: i32,
    height: i32,
    on_release: Option<Box<dyn FnOnce(ResourceKey)>>,
}

impl Buffer {
    /// Creates a buffer with no release hook.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn new(key: ResourceKey, width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "buffer dimensions must be positive");
        Self {
            key,
            width,
            height,
            on_release: None,
        }
    }

    /// Creates a buffer whose `release` hook runs when it is dropped.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is not positive.
    #[must_use]
    pub fn with_release(
        key: ResourceKey,
        width: i32,
        height: i32,
        release: impl FnOnce(ResourceKey) + 'static,
    ) -> Self {
        let mut buffer = Self::new(key, width, height);
        buffer.on_release = Some(Box::new(release));
        buffer
    }

    /// Backend storage key.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> ResourceKey {
        self.key
    }

    /// Width in buffer pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height in buffer pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release(self.key);
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("key", &self.key)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Porter-Duff operator for a composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Replace destination pixels, ignoring what was there.
    Source,
    /// Blend premultiplied source over destination.
    Over,
}

/// Per-view drawing parameters handed to [`RenderTarget::composite`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawParams {
    /// Buffer orientation.
    pub transform: BufferTransform,
    /// Integer buffer scale.
    pub scale: i32,
    /// Crop and stretch.
    pub viewport: Viewport,
    /// Sub-pixel placement in `[0, 1)`.
    pub offset: Vec2,
    /// Maps view-local coordinates to buffer pixel coordinates. Combines the
    /// inverse of the transform, scale and viewport above; backends that
    /// sample per pixel can use it directly.
    pub view_to_buffer: Affine,
}

/// How stale a render target's contents are.
///
/// Backends report ages as small integers; [`TargetAge::from_raw`] converts
/// that encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetAge {
    /// Contents are undefined and must be fully redrawn (`-1`).
    Invalid,
    /// Contents match the end of the update this many updates before the
    /// most recent one (`0` = most recent).
    Frames(u8),
    /// Contents are only valid for direct presentation (`-2`).
    PresentOnly,
}

impl TargetAge {
    /// Converts the backend integer encoding.
    #[must_use]
    pub fn from_raw(age: i32) -> Self {
        if age == -2 {
            return Self::PresentOnly;
        }
        u8::try_from(age).map_or(Self::Invalid, Self::Frames)
    }

    /// Converts back to the backend integer encoding.
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Invalid => -1,
            Self::Frames(n) => i32::from(n),
            Self::PresentOnly => -2,
        }
    }

    /// Returns how many prior updates must be replayed if the age allows an
    /// incremental repaint (`0..=2`), or `None` if a full repaint is needed.
    #[must_use]
    pub const fn incremental(self) -> Option<u8> {
        match self {
            Self::Frames(n) if n <= 2 => Some(n),
            _ => None,
        }
    }
}

/// Whether the target waits for vblank when finishing a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Swap as soon as possible.
    Async,
    /// Swap on the next vertical blank.
    Vsync,
}

/// Which mechanism paces a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SynchronizationType {
    /// The host compositing manager's frame-drawn protocol.
    FrameClock,
    /// Presentation completion from the render backend.
    Presentation,
}

/// A render target owned by a subcompositor.
///
/// All coordinates passed to a target are in target pixels, with the
/// subcompositor's bounds origin at `(0, 0)`.
pub trait RenderTarget {
    /// Draws the `source` rectangle of a view onto `dest`.
    ///
    /// `source` is in view-local pixels and has the same size as `dest`;
    /// `params.view_to_buffer` maps it into the buffer.
    fn composite(
        &mut self,
        buffer: &Buffer,
        op: Operator,
        source: Rect,
        dest: Rect,
        params: &DrawParams,
    );

    /// Clears rectangles to transparent.
    fn fill_transparent(&mut self, rects: &[Rect]);

    /// Reports how stale the current back buffer is.
    fn age(&self) -> TargetAge;

    /// Ends a composited frame.
    ///
    /// `damage` is the precise changed area, or `None` when everything may
    /// have changed. Returns `None` if the frame completed synchronously,
    /// otherwise a key to be reported later.
    fn finish_frame(&mut self, damage: Option<&Region>) -> Option<CompletionKey>;

    /// Presents a client buffer directly, bypassing composition.
    ///
    /// Returns `None` if the target cannot do so for this buffer.
    fn present_to_window(
        &mut self,
        buffer: &Buffer,
        damage: Option<&Region>,
    ) -> Option<CompletionKey> {
        _ = (buffer, damage);
        None
    }

    /// Cancels an outstanding completion. Unknown keys are ignored.
    fn cancel_completion(&mut self, key: CompletionKey) {
        _ = key;
    }

    /// Switches between asynchronous and vblank-synchronized swaps, starting
    /// at media stream counter `next_frame`. Returns `false` if the mode is
    /// unsupported.
    fn set_render_mode(&mut self, mode: RenderMode, next_frame: u64) -> bool {
        _ = next_frame;
        mode == RenderMode::Async
    }

    /// Informs the target of the size it must cover.
    fn note_target_size(&mut self, width: i32, height: i32) {
        _ = (width, height);
    }

    /// Returns `true` if the target can report presentation completion.
    fn supports_presentation(&self) -> bool {
        false
    }
}

/// Frame lifecycle notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameNote {
    /// A frame began; it will be drawn into the target next.
    Started {
        /// Subcompositor frame counter value.
        frame_id: u64,
    },
    /// The target finished the frame.
    Complete {
        /// Frame counter value passed to [`FrameNote::Started`].
        frame_id: u64,
    },
    /// The frame reached the display.
    Presented {
        /// Frame counter value passed to [`FrameNote::Started`].
        frame_id: u64,
        /// Media stream counter at presentation.
        msc: u64,
        /// Presentation time in microseconds.
        ust: u64,
    },
}

impl FrameNote {
    /// The frame this note is about.
    #[must_use]
    pub const fn frame_id(self) -> u64 {
        match self {
            Self::Started { frame_id }
            | Self::Complete { frame_id }
            | Self::Presented { frame_id, .. } => frame_id,
        }
    }
}

/// Receives [`FrameNote`]s, with mutable access to the target the frame is
/// drawn into.
pub trait FrameObserver {
    /// Handles a frame note.
    fn note_frame(&mut self, note: FrameNote, target: &mut dyn RenderTarget);
}

impl<F: FnMut(FrameNote, &mut dyn RenderTarget)> FrameObserver for F {
    fn note_frame(&mut self, note: FrameNote, target: &mut dyn RenderTarget) {
        self(note, target);
    }
}

/// A [`FrameObserver`] that ignores every note.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl FrameObserver for NoopObserver {
    fn note_frame(&mut self, note: FrameNote, target: &mut dyn RenderTarget) {
        _ = (note, target);
    }
}
