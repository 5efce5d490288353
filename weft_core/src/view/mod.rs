// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view hierarchy.
//!
//! A view is a rectangle of client content: a buffer plus position, scale,
//! transform, viewport, damage, opaque and input regions. Views form a
//! forest. A root is either detached or inserted at the top level of a
//! subcompositor; only views linked into a subcompositor can be visible.
//!
//! All views and subcompositors live in one [`Scene`] arena and are
//! addressed by generational handles ([`ViewId`], [`SubcompositorId`]).
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use weft_core::backend::{Buffer, ResourceKey};
//! use weft_core::subcompositor::SubcompositorConfig;
//! use weft_core::view::Scene;
//!
//! let mut scene = Scene::new();
//! let sub = scene.create_subcompositor(SubcompositorConfig::DEFAULT);
//! let toplevel = scene.create_view();
//! let popup = scene.create_view();
//!
//! scene.attach_buffer(toplevel, Some(Rc::new(Buffer::new(ResourceKey(1), 200, 100))));
//! scene.attach_buffer(popup, Some(Rc::new(Buffer::new(ResourceKey(2), 50, 50))));
//! scene.move_to(popup, 180, 80);
//!
//! scene.insert(sub, toplevel);
//! scene.insert(toplevel, popup);
//!
//! assert!(scene.is_visible(popup));
//! assert_eq!(scene.bounds(sub).width(), 230);
//! ```

mod geometry;
mod id;
mod store;
mod traverse;
mod tree;

pub use id::{INVALID, ParentId, SubcompositorId, ViewId};
pub use store::{Scene, ViewFlags};
pub use traverse::{Children, PaintOrder};

pub(crate) use store::ViewState;
pub(crate) use traverse::VisibleViews;
