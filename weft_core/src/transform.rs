// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffer transforms and viewports.
//!
//! A client may render its buffer rotated or mirrored relative to how the
//! surface is displayed. [`BufferTransform`] names the eight dihedral
//! orientations and produces the affine map between buffer pixels and
//! surface-oriented pixels. A [`Viewport`] then crops and stretches the
//! surface independently of the buffer size.

use kurbo::Affine;

/// Orientation of buffer contents relative to the displayed surface.
///
/// Rotations are counter-clockwise, matching the output transform semantics
/// of the Wayland core protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferTransform {
    /// Contents are displayed as stored.
    #[default]
    Normal,
    /// Rotated 90 degrees.
    Rotate90,
    /// Rotated 180 degrees.
    Rotate180,
    /// Rotated 270 degrees.
    Rotate270,
    /// Mirrored around the vertical axis.
    Flipped,
    /// Mirrored, then rotated 90 degrees.
    Flipped90,
    /// Mirrored, then rotated 180 degrees.
    Flipped180,
    /// Mirrored, then rotated 270 degrees.
    Flipped270,
}

impl BufferTransform {
    /// Every transform, in protocol order.
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::Rotate90,
        Self::Rotate180,
        Self::Rotate270,
        Self::Flipped,
        Self::Flipped90,
        Self::Flipped180,
        Self::Flipped270,
    ];

    /// Returns `true` if the transform exchanges width and height.
    #[inline]
    #[must_use]
    pub const fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Rotate90 | Self::Rotate270 | Self::Flipped90 | Self::Flipped270
        )
    }

    /// Returns `true` for [`BufferTransform::Normal`].
    #[inline]
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Maps surface-oriented coordinates to buffer coordinates.
    ///
    /// `width` and `height` are the dimensions *after* the transform has been
    /// applied (that is, in surface orientation, still in buffer pixels).
    #[must_use]
    pub fn surface_to_buffer(self, width: f64, height: f64) -> Affine {
        let (w, h) = (width, height);
        // Coefficients are [a, b, c, d, e, f] with
        // x' = a*x + c*y + e, y' = b*x + d*y + f.
        let coeffs = match self {
            Self::Normal => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            Self::Rotate90 => [0.0, -1.0, 1.0, 0.0, 0.0, w],
            Self::Rotate180 => [-1.0, 0.0, 0.0, -1.0, w, h],
            Self::Rotate270 => [0.0, 1.0, -1.0, 0.0, h, 0.0],
            Self::Flipped => [-1.0, 0.0, 0.0, 1.0, w, 0.0],
            Self::Flipped90 => [0.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            Self::Flipped180 => [1.0, 0.0, 0.0, -1.0, 0.0, h],
            Self::Flipped270 => [0.0, -1.0, -1.0, 0.0, h, w],
        };
        Affine::new(coeffs)
    }

    /// Maps buffer coordinates to surface-oriented coordinates.
    ///
    /// `buffer_width` and `buffer_height` are the stored buffer dimensions.
    #[must_use]
    pub fn buffer_to_surface(self, buffer_width: f64, buffer_height: f64) -> Affine {
        let (w, h) = if self.swaps_dimensions() {
            (buffer_height, buffer_width)
        } else {
            (buffer_width, buffer_height)
        };
        self.surface_to_buffer(w, h).inverse()
    }
}

/// Crop and scale applied after the buffer transform and scale.
///
/// With neither field set the viewport has no effect. A source rectangle
/// alone crops and displays at the cropped size; a destination alone
/// stretches the whole surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    /// Region of the surface to display, in surface units.
    pub source: Option<kurbo::Rect>,
    /// Displayed size in surface units.
    pub destination: Option<(i32, i32)>,
}

impl Viewport {
    /// A viewport that changes nothing.
    pub const NONE: Self = Self {
        source: None,
        destination: None,
    };

    /// Returns `true` if neither a source nor a destination is set.
    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.source.is_none() && self.destination.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn corners_map_into_buffer() {
        // Buffer is 40x20; every transform must map the surface rectangle onto
        // the buffer rectangle.
        let (bw, bh) = (40.0, 20.0);
        for t in BufferTransform::ALL {
            let (w, h) = if t.swaps_dimensions() { (bh, bw) } else { (bw, bh) };
            let m = t.surface_to_buffer(w, h);
            let image = m.transform_rect_bbox(kurbo::Rect::new(0.0, 0.0, w, h));
            assert!(
                (image.width() - bw).abs() < 1e-9 && (image.height() - bh).abs() < 1e-9,
                "{t:?} maps to {image:?}"
            );
            assert!(image.x0.abs() < 1e-9 && image.y0.abs() < 1e-9, "{t:?}");
        }
    }

    #[test]
    fn rotate90_moves_origin_to_bottom_left() {
        let m = BufferTransform::Rotate90.surface_to_buffer(20.0, 40.0);
        assert!(close(m * Point::new(0.0, 0.0), Point::new(0.0, 20.0)));
        assert!(close(m * Point::new(20.0, 0.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn buffer_to_surface_inverts() {
        for t in BufferTransform::ALL {
            let fwd = t.buffer_to_surface(30.0, 10.0);
            let (w, h) = if t.swaps_dimensions() { (10.0, 30.0) } else { (30.0, 10.0) };
            let back = t.surface_to_buffer(w, h);
            let p = Point::new(7.0, 3.0);
            assert!(close(back * (fwd * p), p), "{t:?}");
        }
    }

    #[test]
    fn flipped_mirrors_horizontally() {
        let m = BufferTransform::Flipped.surface_to_buffer(10.0, 5.0);
        assert!(close(m * Point::new(1.0, 2.0), Point::new(9.0, 2.0)));
        assert!(!BufferTransform::Flipped.swaps_dimensions());
        assert!(BufferTransform::Flipped270.swaps_dimensions());
    }
}
