// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local monotonic time.

use std::cell::Cell;
use std::rc::Rc;

use rustix::time::{ClockId, Timespec, clock_gettime};

const MICROS_PER_SECOND: u128 = 1_000_000;

/// A source of monotonic microseconds.
pub trait TimeSource {
    /// Current time in microseconds.
    fn now_us(&self) -> u64;
}

/// `CLOCK_MONOTONIC`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MonotonicTime;

impl TimeSource for MonotonicTime {
    fn now_us(&self) -> u64 {
        timespec_to_micros(clock_gettime(ClockId::Monotonic))
    }
}

fn timespec_to_micros(timespec: Timespec) -> u64 {
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let micros = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999)
        / 1_000;
    let wide = u128::from(seconds)
        .saturating_mul(MICROS_PER_SECOND)
        .saturating_add(u128::from(micros));
    u64::try_from(wide).unwrap_or(u64::MAX)
}

/// A hand-driven clock. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualTime(Rc<Cell<u64>>);

impl ManualTime {
    /// Starts at `us`.
    #[must_use]
    pub fn new(us: u64) -> Self {
        Self(Rc::new(Cell::new(us)))
    }

    /// Moves time forward.
    pub fn advance(&self, us: u64) {
        self.0.set(self.0.get() + us);
    }
}

impl TimeSource for ManualTime {
    fn now_us(&self) -> u64 {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use rustix::time::Timespec;

    use super::{ManualTime, MonotonicTime, TimeSource, timespec_to_micros};

    #[test]
    fn monotonic_does_not_go_backwards() {
        let first = MonotonicTime.now_us();
        let second = MonotonicTime.now_us();
        assert!(second >= first, "monotonic clock should not go backwards");
    }

    #[test]
    fn timespec_conversion_truncates_to_micros() {
        let input = Timespec {
            tv_sec: 3,
            tv_nsec: 250_999,
        };
        assert_eq!(timespec_to_micros(input), 3_000_250);
    }

    #[test]
    fn manual_time_is_shared() {
        let a = ManualTime::new(10);
        let b = a.clone();
        b.advance(5);
        assert_eq!(a.now_us(), 15);
    }
}
