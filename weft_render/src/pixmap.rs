// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Premultiplied RGBA pixel storage.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use weft_core::region::Rect;

/// A premultiplied RGBA8 pixel.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    /// An opaque color.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// A color with straight (non-premultiplied) components.
    #[must_use]
    pub fn straight(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([mul(r, a), mul(g, a), mul(b, a), a])
    }

    /// Alpha component.
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Composites `self` over `dst`.
    #[must_use]
    pub fn over(self, dst: Self) -> Self {
        let inv = 255 - self.alpha();
        let mut out = [0; 4];
        for (o, (s, d)) in out.iter_mut().zip(self.0.into_iter().zip(dst.0)) {
            *o = s.saturating_add(mul(d, inv));
        }
        Self(out)
    }
}

impl fmt::Debug for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// `a * b / 255`, rounded.
fn mul(a: u8, b: u8) -> u8 {
    let t = u16::from(a) * u16::from(b) + 128;
    // (t + t / 256) / 256 is exact division by 255 for this range.
    u8::try_from((t + (t >> 8)) >> 8).unwrap_or(u8::MAX)
}

/// A rectangular grid of pixels, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: i32,
    height: i32,
    data: Vec<Rgba>,
}

impl Pixmap {
    /// Creates a transparent pixmap. Negative sizes are treated as zero.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    /// Creates a pixmap of one color.
    #[must_use]
    pub fn filled(width: i32, height: i32, color: Rgba) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let len = usize::try_from(i64::from(width) * i64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            data: vec![color; len],
        }
    }

    /// Creates a pixmap by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: i32, height: i32, mut f: impl FnMut(i32, i32) -> Rgba) -> Self {
        let mut pixmap = Self::new(width, height);
        for y in 0..pixmap.height {
            for x in 0..pixmap.width {
                pixmap.set(x, y, f(x, y));
            }
        }
        pixmap
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// The pixmap's full extent.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(y * self.width + x).ok()
    }

    /// The pixel at `(x, y)`, or transparent outside the pixmap.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Rgba {
        self.index(x, y)
            .map_or(Rgba::TRANSPARENT, |i| self.data[i])
    }

    /// Writes a pixel; writes outside the pixmap are dropped.
    pub fn set(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = color;
        }
    }

    /// Fills the part of `rect` inside the pixmap.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let r = rect.intersect(self.rect());
        for y in r.y0..r.y1 {
            for x in r.x0..r.x1 {
                self.set(x, y, color);
            }
        }
    }

    /// Every pixel, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Rgba] {
        &self.data
    }

    /// Returns `true` if every pixel is fully opaque.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.data.iter().all(|p| p.alpha() == 255)
    }

    /// First pixel at which two equally sized pixmaps differ.
    #[must_use]
    pub fn first_difference(&self, other: &Self) -> Option<(i32, i32)> {
        if self.width != other.width || self.height != other.height {
            return Some((0, 0));
        }
        let i = self
            .data
            .iter()
            .zip(&other.data)
            .position(|(a, b)| a != b)?;
        let i = i32::try_from(i).ok()?;
        Some((i % self.width, i / self.width))
    }
}

impl fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{Pixmap, Rgba};
    use weft_core::region::Rect;

    #[test]
    fn opaque_source_replaces_destination() {
        let red = Rgba::opaque(255, 0, 0);
        assert_eq!(red.over(Rgba::opaque(0, 0, 255)), red);
    }

    #[test]
    fn half_transparent_blends() {
        let src = Rgba::straight(255, 255, 255, 128);
        let out = src.over(Rgba::opaque(0, 0, 0));
        assert_eq!(out, Rgba([128, 128, 128, 255]));
        assert_eq!(Rgba::TRANSPARENT.over(out), out);
    }

    #[test]
    fn fill_is_clipped() {
        let mut p = Pixmap::new(4, 4);
        p.fill_rect(Rect::new(2, 2, 10, 10), Rgba::opaque(1, 2, 3));
        assert_eq!(p.get(3, 3), Rgba::opaque(1, 2, 3));
        assert_eq!(p.get(1, 1), Rgba::TRANSPARENT);
        assert_eq!(p.get(9, 9), Rgba::TRANSPARENT);
        assert_eq!(p.first_difference(&Pixmap::new(4, 4)), Some((2, 2)));
    }
}
