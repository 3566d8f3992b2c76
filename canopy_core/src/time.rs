// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic timestamps for pulse instrumentation.
//!
//! [`HostTime`] counts nanoseconds since a [`PulseClock`] was created.
//! [`Duration`] is a span in the same units. Both are plain integers so trace
//! events stay `Copy` and can be recorded in fixed-size binary form.

use core::fmt;
use core::ops::Sub;
use std::time::Instant;

/// A point in time, in nanoseconds since the owning clock's origin.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the span in (fractional) microseconds.
    #[inline]
    #[must_use]
    pub fn as_micros_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ns)", self.0)
    }
}

/// Monotonic clock anchored at its creation instant.
#[derive(Clone, Copy, Debug)]
pub struct PulseClock {
    origin: Instant,
}

impl Default for PulseClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Returns the current time relative to the clock origin.
    #[must_use]
    pub fn now(&self) -> HostTime {
        let nanos = self.origin.elapsed().as_nanos();
        HostTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
