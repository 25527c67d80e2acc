// Copyright 2026 the Underpaint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock values for composition throttling and trace timestamps.
//!
//! The engine never reads a clock itself. A backing store that can tell the
//! time reports it through
//! [`BackingStore::host_time`](crate::backend::BackingStore::host_time) in
//! platform ticks, and its [`Timebase`] says how long a tick is.

/// A monotonic clock reading in platform ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the reading in ticks.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns how long ago `earlier` was, clamped to zero when the clock
    /// went backwards.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

/// Length of one tick as the fraction `numer / denom` nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Nanoseconds per `denom` ticks.
    pub numer: u32,
    /// Ticks per `numer` nanoseconds.
    pub denom: u32,
}

impl Timebase {
    /// One tick per nanosecond.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Creates a timebase of `numer / denom` nanoseconds per tick.
    ///
    /// # Panics
    ///
    /// Panics if either part is zero.
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(numer != 0 && denom != 0, "zero in timebase");
        Self { numer, denom }
    }

    /// Converts ticks to nanoseconds.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "results past u64::MAX nanoseconds are centuries away"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        (ticks as u128 * self.numer as u128 / self.denom as u128) as u64
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::NANOS
    }
}

/// A span of platform ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(pub u64);

impl Duration {
    /// No time at all.
    pub const ZERO: Self = Self(0);

    /// Returns the span in ticks.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the frame period of a display refreshing `hz` times a second,
    /// in ticks of `timebase`.
    ///
    /// A rate of zero means no display pacing and yields [`Duration::ZERO`].
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "one frame period always fits in u64 ticks"
    )]
    pub const fn refresh_interval(hz: u32, timebase: Timebase) -> Self {
        if hz == 0 {
            return Self::ZERO;
        }
        let nanos = 1_000_000_000 / hz as u128;
        Self((nanos * timebase.denom as u128 / timebase.numer as u128) as u64)
    }
}
