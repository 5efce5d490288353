// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel contents of client buffers, keyed by resource.

use alloc::collections::BTreeMap;

use weft_core::backend::ResourceKey;

use crate::pixmap::Pixmap;

/// Maps [`ResourceKey`]s to their pixel contents.
///
/// Core [`Buffer`](weft_core::backend::Buffer)s carry only a key and a
/// size; the store supplies what is actually drawn. Buffers with no
/// registered contents draw as transparent.
#[derive(Clone, Debug, Default)]
pub struct BufferStore {
    pixmaps: BTreeMap<ResourceKey, Pixmap>,
}

impl BufferStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the contents of `key`.
    pub fn insert(&mut self, key: ResourceKey, pixmap: Pixmap) -> Option<Pixmap> {
        self.pixmaps.insert(key, pixmap)
    }

    /// Forgets `key`.
    pub fn remove(&mut self, key: ResourceKey) -> Option<Pixmap> {
        self.pixmaps.remove(&key)
    }

    /// Contents of `key`, if registered.
    #[must_use]
    pub fn get(&self, key: ResourceKey) -> Option<&Pixmap> {
        self.pixmaps.get(&key)
    }

    /// Mutable contents of `key`, for clients drawing in place.
    pub fn get_mut(&mut self, key: ResourceKey) -> Option<&mut Pixmap> {
        self.pixmaps.get_mut(&key)
    }

    /// Number of registered buffers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pixmaps.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixmaps.is_empty()
    }
}
