// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View size and the buffer-to-view mapping.
//!
//! A view's displayed size follows the Wayland rules: the viewport
//! destination if set, else the viewport source size, else the buffer size
//! (dimensions swapped by a quarter-turn transform) divided by the buffer
//! scale. Views without a buffer have no size and draw nothing.

use kurbo::Affine;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use super::id::ViewId;
use super::store::{Scene, ViewState};
use crate::backend::DrawParams;
use crate::region::Rect;

impl ViewState {
    /// Buffer size in surface orientation and units, before any viewport.
    fn surface_size(&self) -> Option<(f64, f64)> {
        let buffer = self.buffer.as_ref()?;
        let (w, h) = if self.transform.swaps_dimensions() {
            (buffer.height(), buffer.width())
        } else {
            (buffer.width(), buffer.height())
        };
        let scale = f64::from(self.scale);
        Some((f64::from(w) / scale, f64::from(h) / scale))
    }

    /// Displayed size in view pixels; `(0, 0)` without a buffer.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "surface sizes are bounded by buffer sizes, which are i32"
    )]
    pub(crate) fn size(&self) -> (i32, i32) {
        let Some((w, h)) = self.surface_size() else {
            return (0, 0);
        };
        if let Some(dest) = self.viewport.destination {
            return dest;
        }
        if let Some(src) = self.viewport.source {
            return (src.width().ceil() as i32, src.height().ceil() as i32);
        }
        (w.ceil() as i32, h.ceil() as i32)
    }

    /// Maps buffer pixels to view-local coordinates.
    pub(crate) fn buffer_to_view(&self) -> Option<Affine> {
        let buffer = self.buffer.as_ref()?;
        let (sw, sh) = self.surface_size()?;
        let to_surface = self
            .transform
            .buffer_to_surface(f64::from(buffer.width()), f64::from(buffer.height()));
        let mut m = Affine::scale(1.0 / f64::from(self.scale)) * to_surface;
        if !self.viewport.is_none() {
            let src = self
                .viewport
                .source
                .unwrap_or_else(|| kurbo::Rect::new(0.0, 0.0, sw, sh));
            let (dw, dh) = self.size();
            m = Affine::scale_non_uniform(
                f64::from(dw) / src.width(),
                f64::from(dh) / src.height(),
            ) * Affine::translate((-src.x0, -src.y0))
                * m;
        }
        Some(m)
    }

    /// Parameters for drawing this view, or `None` without a buffer.
    pub(crate) fn draw_params(&self) -> Option<DrawParams> {
        let to_view = self.buffer_to_view()?;
        Some(DrawParams {
            transform: self.transform,
            scale: self.scale,
            viewport: self.viewport,
            offset: self.fractional_offset,
            view_to_buffer: to_view.inverse(),
        })
    }

    /// Returns `true` if the buffer maps onto the view one-to-one.
    pub(crate) fn is_untransformed(&self) -> bool {
        self.transform.is_identity()
            && self.scale == 1
            && self.viewport.is_none()
            && self.fractional_offset == kurbo::Vec2::ZERO
    }
}

impl Scene {
    /// Displayed size of a view; `(0, 0)` when it has no buffer.
    #[must_use]
    pub fn size(&self, id: ViewId) -> (i32, i32) {
        self.validate(id);
        self.views[id.idx as usize].size()
    }

    /// Rectangle covered by a buffer-backed view, in subcompositor space.
    pub(crate) fn view_rect(&self, idx: u32) -> Option<Rect> {
        let v = &self.views[idx as usize];
        v.buffer.as_ref()?;
        let (w, h) = v.size();
        let r = Rect::from_xywh(v.abs_x, v.abs_y, w, h);
        (!r.is_empty()).then_some(r)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use kurbo::Point;

    use crate::backend::{Buffer, ResourceKey};
    use crate::region::{Rect, Region};
    use crate::transform::{BufferTransform, Viewport};
    use crate::view::Scene;

    fn scene_with_buffer(w: i32, h: i32) -> (Scene, crate::view::ViewId) {
        let mut scene = Scene::new();
        let v = scene.create_view();
        scene.attach_buffer(v, Some(Rc::new(Buffer::new(ResourceKey(1), w, h))));
        (scene, v)
    }

    #[test]
    fn size_follows_scale_and_transform() {
        let (mut scene, v) = scene_with_buffer(40, 20);
        assert_eq!(scene.size(v), (40, 20));
        scene.set_scale(v, 2);
        assert_eq!(scene.size(v), (20, 10));
        scene.set_transform(v, BufferTransform::Rotate270);
        assert_eq!(scene.size(v), (10, 20));
    }

    #[test]
    fn viewport_destination_overrides_size() {
        let (mut scene, v) = scene_with_buffer(40, 20);
        scene.set_viewport(
            v,
            Viewport {
                source: Some(kurbo::Rect::new(10.0, 0.0, 20.0, 5.0)),
                destination: None,
            },
        );
        assert_eq!(scene.size(v), (10, 5));
        scene.set_viewport(
            v,
            Viewport {
                source: Some(kurbo::Rect::new(10.0, 0.0, 20.0, 5.0)),
                destination: Some((100, 50)),
            },
        );
        assert_eq!(scene.size(v), (100, 50));
        let m = scene.views[v.idx as usize].buffer_to_view().unwrap();
        let p = m * Point::new(10.0, 0.0);
        assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
        let q = m * Point::new(20.0, 5.0);
        assert!((q.x - 100.0).abs() < 1e-9 && (q.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn no_buffer_means_no_size() {
        let mut scene = Scene::new();
        let v = scene.create_view();
        assert_eq!(scene.size(v), (0, 0));
        assert!(scene.view_rect(v.idx).is_none());
    }

    #[test]
    fn surface_damage_lands_in_buffer_space() {
        let (mut scene, v) = scene_with_buffer(40, 20);
        scene.set_scale(v, 2);
        scene.damage(v, &Region::from_rect(Rect::from_xywh(1, 1, 2, 2)));
        assert_eq!(scene.pending_damage(v).extents(), Rect::from_xywh(2, 2, 4, 4));

        scene.damage_buffer(v, &Region::from_rect(Rect::from_xywh(30, 10, 50, 50)));
        assert!(scene.pending_damage(v).contains_rect(Rect::new(30, 10, 40, 20)));
        assert_eq!(scene.pending_damage(v).extents(), Rect::new(2, 2, 40, 20));
    }

    #[test]
    fn damage_without_buffer_is_dropped() {
        let mut scene = Scene::new();
        let v = scene.create_view();
        scene.damage(v, &Region::from_rect(Rect::from_xywh(0, 0, 5, 5)));
        assert!(scene.pending_damage(v).is_empty());
    }
}
