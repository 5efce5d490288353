// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame callback timestamps.
//!
//! Clients receive frame times as 32-bit milliseconds. The host supplies
//! authoritative times only for some frames, in a clock that need not match
//! the local monotonic clock and that wraps every 49.7 days. Between
//! authoritative samples the tracked time is extrapolated with the local
//! clock, so the reported times keep moving forward either way.

/// Half the 32-bit millisecond range: the largest forward step accepted
/// from the host.
const MAX_FORWARD_MS: u32 = (1 << 31) - 1;

/// Truncates microseconds to the 32-bit millisecond representation.
#[expect(
    clippy::cast_possible_truncation,
    reason = "protocol timestamps wrap at 32 bits"
)]
const fn wrapped_ms(us: u64) -> u32 {
    (us / 1000) as u32
}

/// Tracks `(server_time, arrival_time)` and reconciles new host samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameTimeReconciler {
    /// Tracked host time in microseconds, unwrapped.
    server_us: Option<u64>,
    /// Local monotonic time of the previous call.
    arrival_us: u64,
}

impl FrameTimeReconciler {
    /// Creates a reconciler with no host time yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            server_us: None,
            arrival_us: 0,
        }
    }

    /// Considers a frame time, returning the protocol timestamp.
    ///
    /// `now_us` is the local monotonic time. `host_us` is the host's time
    /// for this frame in microseconds, or `None` when it supplied nothing.
    /// The first host sample is adopted as is. Later samples are adopted
    /// only when their millisecond value is greater than the tracked one by
    /// at most half the 32-bit range. A smaller value, including one that
    /// wrapped past zero, or a much larger one counts as older and the
    /// tracked time is extrapolated instead.
    pub fn consider(&mut self, now_us: u64, host_us: Option<u64>) -> u32 {
        let delta = now_us.saturating_sub(self.arrival_us);
        self.arrival_us = now_us;

        let tracked = match (self.server_us, host_us) {
            (None, Some(host)) => host,
            (None, None) => now_us,
            (Some(server), None) => server + delta,
            (Some(server), Some(host)) => {
                let (host_ms, server_ms) = (wrapped_ms(host), wrapped_ms(server));
                if host_ms > server_ms && host_ms - server_ms <= MAX_FORWARD_MS {
                    let ahead = host_ms - server_ms;
                    // Keep the unwrapped time continuous across wraps.
                    (server / 1000 + u64::from(ahead)) * 1000 + host % 1000
                } else {
                    server + delta
                }
            }
        };
        self.server_us = Some(tracked);
        wrapped_ms(tracked)
    }

    /// The tracked host time in microseconds, if any sample arrived yet.
    #[must_use]
    pub const fn server_us(&self) -> Option<u64> {
        self.server_us
    }
}
