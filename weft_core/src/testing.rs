// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by the unit tests.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::backend::{
    Buffer, CompletionKey, DrawParams, Operator, RenderTarget, ResourceKey, TargetAge,
};
use crate::region::{Rect, Region};

/// Small deterministic generator for property tests.
#[derive(Debug)]
pub(crate) struct XorShift(u64);

impl XorShift {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed | 1)
    }

    pub(crate) fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub(crate) fn below(&mut self, n: usize) -> usize {
        usize::try_from(self.next() % u64::try_from(n).unwrap()).unwrap()
    }

    /// Uniform in `lo..hi`.
    pub(crate) fn range(&mut self, lo: i32, hi: i32) -> i32 {
        let span = u64::try_from(hi - lo).unwrap();
        lo + i32::try_from(self.next() % span).unwrap()
    }
}

/// Everything a [`RecordingTarget`] was asked to do.
#[derive(Debug)]
pub(crate) struct TargetLog {
    pub(crate) composites: Vec<(ResourceKey, Operator, Rect, Rect)>,
    pub(crate) fills: Vec<Rect>,
    pub(crate) finishes: Vec<Option<Region>>,
    pub(crate) presents: u32,
    pub(crate) cancelled: Vec<CompletionKey>,
    pub(crate) noted_sizes: Vec<(i32, i32)>,

    pub(crate) age: TargetAge,
    /// Hand out completion keys instead of finishing synchronously.
    pub(crate) async_finish: bool,
    /// Accept direct presentation.
    pub(crate) present_ok: bool,
    pub(crate) next_key: u64,
}

impl TargetLog {
    fn key(&mut self) -> CompletionKey {
        self.next_key += 1;
        CompletionKey(self.next_key)
    }

    /// Forgets recorded calls, keeping configuration.
    pub(crate) fn reset(&mut self) {
        self.composites.clear();
        self.fills.clear();
        self.finishes.clear();
        self.presents = 0;
    }
}

/// A render target that only records calls.
#[derive(Debug)]
pub(crate) struct RecordingTarget {
    log: Rc<RefCell<TargetLog>>,
}

impl RecordingTarget {
    pub(crate) fn new(age: TargetAge) -> (Self, Rc<RefCell<TargetLog>>) {
        let log = Rc::new(RefCell::new(TargetLog {
            composites: Vec::new(),
            fills: Vec::new(),
            finishes: Vec::new(),
            presents: 0,
            cancelled: Vec::new(),
            noted_sizes: Vec::new(),
            age,
            async_finish: false,
            present_ok: false,
            next_key: 0,
        }));
        (
            Self {
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl RenderTarget for RecordingTarget {
    fn composite(
        &mut self,
        buffer: &Buffer,
        op: Operator,
        source: Rect,
        dest: Rect,
        _params: &DrawParams,
    ) {
        assert_eq!(
            (source.width(), source.height()),
            (dest.width(), dest.height())
        );
        self.log
            .borrow_mut()
            .composites
            .push((buffer.key(), op, source, dest));
    }

    fn fill_transparent(&mut self, rects: &[Rect]) {
        self.log.borrow_mut().fills.extend_from_slice(rects);
    }

    fn age(&self) -> TargetAge {
        self.log.borrow().age
    }

    fn finish_frame(&mut self, damage: Option<&Region>) -> Option<CompletionKey> {
        let mut log = self.log.borrow_mut();
        log.finishes.push(damage.cloned());
        if log.async_finish {
            Some(log.key())
        } else {
            None
        }
    }

    fn present_to_window(
        &mut self,
        _buffer: &Buffer,
        _damage: Option<&Region>,
    ) -> Option<CompletionKey> {
        let mut log = self.log.borrow_mut();
        if !log.present_ok {
            return None;
        }
        log.presents += 1;
        Some(log.key())
    }

    fn cancel_completion(&mut self, key: CompletionKey) {
        self.log.borrow_mut().cancelled.push(key);
    }

    fn note_target_size(&mut self, width: i32, height: i32) {
        self.log.borrow_mut().noted_sizes.push((width, height));
    }

    fn supports_presentation(&self) -> bool {
        self.log.borrow().present_ok
    }
}

pub(crate) fn solid_buffer(key: u64, width: i32, height: i32) -> Rc<Buffer> {
    Rc::new(Buffer::new(ResourceKey(key), width, height))
}
