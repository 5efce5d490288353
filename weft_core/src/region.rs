// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangles and rectangle sets.
//!
//! A [`Region`] is a set of pairwise-disjoint, non-empty [`Rect`]s. Every
//! operation preserves disjointness, so the area of a region is the sum of
//! the areas of its rectangles and iterating [`Region::rects`] never visits
//! a pixel twice. Damage, opaque and input shapes are all regions.
//!
//! Regions are not kept in a canonical banded form: two regions covering
//! the same pixels may hold different rectangles. Equality
//! ([`PartialEq`]) therefore compares covered area, not representation.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Affine, Point};

/// A half-open integer rectangle `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x0: i32,
    /// Top edge (inclusive).
    pub y0: i32,
    /// Right edge (exclusive).
    pub x1: i32,
    /// Bottom edge (exclusive).
    pub y1: i32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const EMPTY: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle from its edges.
    #[inline]
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Creates a rectangle from an origin and a size.
    #[inline]
    #[must_use]
    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Width in pixels (zero or negative for empty rectangles).
    #[inline]
    #[must_use]
    pub const fn width(self) -> i32 {
        self.x1 - self.x0
    }

    /// Height in pixels (zero or negative for empty rectangles).
    #[inline]
    #[must_use]
    pub const fn height(self) -> i32 {
        self.y1 - self.y0
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Number of covered pixels.
    #[must_use]
    pub fn area(self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    /// Intersection of two rectangles. Empty results are normalised to
    /// [`Rect::EMPTY`].
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let r = Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if r.is_empty() { Self::EMPTY } else { r }
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Returns `true` if every pixel of `other` lies inside `self`.
    ///
    /// An empty `other` is contained in everything.
    #[must_use]
    pub fn contains_rect(self, other: Self) -> bool {
        other.is_empty()
            || (self.x0 <= other.x0
                && self.y0 <= other.y0
                && self.x1 >= other.x1
                && self.y1 >= other.y1)
    }

    /// Returns `true` if the (possibly fractional) point lies inside.
    #[must_use]
    pub fn contains_point(self, p: Point) -> bool {
        p.x >= f64::from(self.x0)
            && p.x < f64::from(self.x1)
            && p.y >= f64::from(self.y0)
            && p.y < f64::from(self.y1)
    }

    /// Returns the rectangle offset by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    #[must_use]
    pub fn union_bounds(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Converts to a floating-point `kurbo` rectangle.
    #[must_use]
    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }

    /// Converts a floating-point rectangle, rounding every edge outward.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "edges are rounded and clamped to the i32 pixel grid"
    )]
    pub fn from_kurbo_outward(rect: kurbo::Rect) -> Self {
        let r = rect.abs().expand();
        let clamp = |v: f64| v.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        Self::new(clamp(r.x0), clamp(r.y0), clamp(r.x1), clamp(r.y1))
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({},{} {}x{})",
            self.x0,
            self.y0,
            self.width(),
            self.height()
        )
    }
}

/// Pushes the parts of `a` not covered by `b` (at most four rectangles).
fn push_difference(a: Rect, b: Rect, out: &mut Vec<Rect>) {
    let i = a.intersect(b);
    if i.is_empty() {
        out.push(a);
        return;
    }
    if a.y0 < i.y0 {
        out.push(Rect::new(a.x0, a.y0, a.x1, i.y0));
    }
    if i.y1 < a.y1 {
        out.push(Rect::new(a.x0, i.y1, a.x1, a.y1));
    }
    if a.x0 < i.x0 {
        out.push(Rect::new(a.x0, i.y0, i.x0, i.y1));
    }
    if i.x1 < a.x1 {
        out.push(Rect::new(i.x1, i.y0, a.x1, i.y1));
    }
}

/// A set of pixels represented as disjoint rectangles.
#[derive(Clone, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region covering a single rectangle.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    /// Returns `true` if the region covers no pixels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The disjoint rectangles making up this region.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Number of rectangles in the current representation.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Removes every rectangle.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Bounding box of the region ([`Rect::EMPTY`] when empty).
    #[must_use]
    pub fn extents(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::EMPTY, |acc, r| acc.union_bounds(*r))
    }

    /// Number of covered pixels.
    #[must_use]
    pub fn area(&self) -> i64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Returns `true` if the point lies inside the region.
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        self.rects.iter().any(|r| r.contains_point(p))
    }

    /// Adds a rectangle.
    pub fn union_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut pieces = alloc::vec![rect];
        let mut scratch = Vec::new();
        for existing in &self.rects {
            if !existing.intersects(rect) {
                continue;
            }
            scratch.clear();
            for piece in &pieces {
                push_difference(*piece, *existing, &mut scratch);
            }
            core::mem::swap(&mut pieces, &mut scratch);
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
    }

    /// Adds every pixel of `other`.
    pub fn union(&mut self, other: &Self) {
        for r in &other.rects {
            self.union_rect(*r);
        }
    }

    /// Removes a rectangle.
    pub fn subtract_rect(&mut self, rect: Rect) {
        if rect.is_empty() || !self.rects.iter().any(|r| r.intersects(rect)) {
            return;
        }
        let mut out = Vec::with_capacity(self.rects.len() + 3);
        for r in &self.rects {
            push_difference(*r, rect, &mut out);
        }
        self.rects = out;
    }

    /// Removes every pixel of `other`.
    pub fn subtract(&mut self, other: &Self) {
        for r in &other.rects {
            if self.is_empty() {
                break;
            }
            self.subtract_rect(*r);
        }
    }

    /// Keeps only the pixels inside `rect`.
    pub fn intersect_rect(&mut self, rect: Rect) {
        self.rects.retain_mut(|r| {
            *r = r.intersect(rect);
            !r.is_empty()
        });
    }

    /// Keeps only the pixels also in `other`.
    pub fn intersect(&mut self, other: &Self) {
        let mut out = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                let i = a.intersect(*b);
                if !i.is_empty() {
                    out.push(i);
                }
            }
        }
        self.rects = out;
    }

    /// Offsets every rectangle by `(dx, dy)`.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for r in &mut self.rects {
            *r = r.translate(dx, dy);
        }
    }

    /// Returns a copy offset by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let mut out = self.clone();
        out.translate(dx, dy);
        out
    }

    /// Returns `true` if every pixel of `rect` is in the region.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        let mut rest = Self::from_rect(rect);
        rest.subtract(self);
        rest.is_empty()
    }

    /// Returns `true` if every pixel of `other` is in the region.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        let mut rest = other.clone();
        rest.subtract(self);
        rest.is_empty()
    }

    /// Maps the region through an affine transform.
    ///
    /// Each rectangle is replaced by the outward-rounded bounding box of its
    /// image, so the result covers at least the exact image. Axis-aligned
    /// transforms with integer coefficients (the buffer transforms) are
    /// exact.
    #[must_use]
    pub fn transformed(&self, affine: Affine) -> Self {
        let mut out = Self::new();
        for r in &self.rects {
            out.union_rect(Rect::from_kurbo_outward(
                affine.transform_rect_bbox(r.to_kurbo()),
            ));
        }
        out
    }

    /// Replaces the region by its extents when it holds more than `limit`
    /// rectangles. Returns `true` if it was simplified.
    ///
    /// Only valid for shapes where covering extra pixels is harmless, such as
    /// damage.
    pub fn simplify(&mut self, limit: usize) -> bool {
        if self.rects.len() <= limit {
            return false;
        }
        let extents = self.extents();
        self.rects.clear();
        self.rects.push(extents);
        true
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl FromIterator<Rect> for Region {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        let mut region = Self::new();
        for r in iter {
            region.union_rect(r);
        }
        region
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.area() == other.area() && self.covers(other)
    }
}

impl Eq for Region {}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rects.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_overlapping_rects_counts_pixels_once() {
        let mut region = Region::from_rect(Rect::from_xywh(0, 0, 10, 10));
        region.union_rect(Rect::from_xywh(5, 5, 10, 10));
        assert_eq!(region.area(), 100 + 100 - 25);
        assert_eq!(region.extents(), Rect::new(0, 0, 15, 15));
    }

    #[test]
    fn union_of_contained_rect_is_noop() {
        let mut region = Region::from_rect(Rect::from_xywh(0, 0, 10, 10));
        region.union_rect(Rect::from_xywh(2, 2, 3, 3));
        assert_eq!(region.len(), 1);
    }

    #[test]
    fn subtract_punches_hole() {
        let mut region = Region::from_rect(Rect::from_xywh(0, 0, 10, 10));
        region.subtract_rect(Rect::from_xywh(3, 3, 4, 4));
        assert_eq!(region.area(), 100 - 16);
        assert!(!region.contains_point(Point::new(5.0, 5.0)));
        assert!(region.contains_point(Point::new(1.0, 5.0)));
        assert!(!region.contains_rect(Rect::from_xywh(2, 2, 3, 3)));
        assert!(region.contains_rect(Rect::from_xywh(0, 0, 10, 3)));
    }

    #[test]
    fn subtract_everything_leaves_empty() {
        let mut region = Region::from_rect(Rect::from_xywh(0, 0, 10, 10));
        region.union_rect(Rect::from_xywh(20, 0, 5, 5));
        region.subtract_rect(Rect::new(-5, -5, 100, 100));
        assert!(region.is_empty());
    }

    #[test]
    fn intersect_keeps_overlap_only() {
        let mut a = Region::from_rect(Rect::from_xywh(0, 0, 10, 10));
        a.union_rect(Rect::from_xywh(20, 0, 10, 10));
        let b = Region::from_rect(Rect::from_xywh(5, 0, 20, 5));
        a.intersect(&b);
        assert_eq!(a.area(), 5 * 5 + 5 * 5);
        assert_eq!(a.extents(), Rect::new(5, 0, 25, 5));
    }

    #[test]
    fn equality_compares_covered_pixels() {
        let a: Region = [Rect::from_xywh(0, 0, 10, 5), Rect::from_xywh(0, 5, 10, 5)]
            .into_iter()
            .collect();
        let b = Region::from_rect(Rect::from_xywh(0, 0, 10, 10));
        assert_eq!(a, b);
        assert_ne!(a, Region::from_rect(Rect::from_xywh(0, 0, 10, 9)));
    }

    #[test]
    fn translate_moves_every_rect() {
        let region = Region::from_rect(Rect::from_xywh(1, 2, 3, 4)).translated(10, -2);
        assert_eq!(region.extents(), Rect::from_xywh(11, 0, 3, 4));
    }

    #[test]
    fn transformed_quarter_turn_is_exact() {
        // (x, y) -> (y, 20 - x)
        let affine = Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, 20.0]);
        let region = Region::from_rect(Rect::from_xywh(0, 0, 20, 10)).transformed(affine);
        assert_eq!(region.extents(), Rect::new(0, 0, 10, 20));
        assert_eq!(region.area(), 200);
    }

    #[test]
    fn transformed_rounds_fractional_edges_outward() {
        let region = Region::from_rect(Rect::from_xywh(1, 1, 1, 1)).transformed(Affine::scale(0.5));
        assert_eq!(region.extents(), Rect::new(0, 0, 1, 1));
    }

    #[test]
    fn simplify_collapses_to_extents() {
        let mut region: Region = (0..8).map(|i| Rect::from_xywh(i * 4, 0, 2, 2)).collect();
        assert!(!region.simplify(8));
        assert!(region.simplify(4));
        assert_eq!(region.len(), 1);
        assert_eq!(region.extents(), Rect::new(0, 0, 30, 2));
    }

    #[test]
    fn empty_rects_are_ignored() {
        let mut region = Region::new();
        region.union_rect(Rect::from_xywh(5, 5, 0, 10));
        assert!(region.is_empty());
        assert_eq!(region.extents(), Rect::EMPTY);
    }
}
