// Copyright 2026 the Friction Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time in whole milliseconds.
//!
//! [`HostTime`] is a point on the page's monotonic clock (the
//! `performance.now()` origin on the web), truncated to milliseconds. Every
//! timer, debounce window, cooldown, and gesture-recency check in the engine
//! is expressed with these two types.
//!
//! [`Duration`] is a span in the same millisecond units. Media positions are
//! *not* host times: they stay as `f64` seconds, the unit the media element
//! reports.

use core::fmt;
use core::ops::{Add, Sub};

/// A point in time, in milliseconds since the page's time origin.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostTime(pub u64);

impl HostTime {
    /// The time origin.
    pub const ZERO: Self = Self(0);

    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Creates a [`HostTime`] from a `DOMHighResTimeStamp`.
    ///
    /// Negative and non-finite stamps clamp to [`ZERO`](Self::ZERO).
    #[inline]
    #[must_use]
    pub fn from_dom_timestamp(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "positive finite timestamp; whole milliseconds fit in u64"
            )]
            let whole = ms as u64;
            Self(whole)
        } else {
            Self::ZERO
        }
    }

    /// Returns the duration between `self` and an earlier time, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Saturating addition of a duration.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.0))
    }

    /// Checked addition of a duration.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, duration: Duration) -> Option<Self> {
        match self.0.checked_add(duration.0) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}ms)", self.0)
    }
}

/// A span of time in milliseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Creates a duration from whole seconds.
    #[inline]
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Returns the span in fractional seconds.
    #[inline]
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ms)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_timestamp_truncates_and_clamps() {
        assert_eq!(HostTime::from_dom_timestamp(1234.9), HostTime(1234));
        assert_eq!(HostTime::from_dom_timestamp(-5.0), HostTime::ZERO);
        assert_eq!(HostTime::from_dom_timestamp(f64::NAN), HostTime::ZERO);
    }

    #[test]
    fn saturating_duration_since() {
        let a = HostTime(500);
        let b = HostTime(200);
        assert_eq!(a.saturating_duration_since(b), Duration(300));
        assert_eq!(b.saturating_duration_since(a), Duration::ZERO);
    }

    #[test]
    fn add_and_sub() {
        let t = HostTime(1_000) + Duration::from_secs(2);
        assert_eq!(t, HostTime(3_000));
        assert_eq!(t - HostTime(1_000), Duration(2_000));
        assert_eq!(HostTime(u64::MAX).checked_add(Duration(1)), None);
        assert_eq!(
            HostTime(u64::MAX).saturating_add(Duration(1)),
            HostTime(u64::MAX)
        );
    }

    #[test]
    fn duration_seconds() {
        assert!((Duration::from_millis(1500).as_secs_f64() - 1.5).abs() < 1e-12);
    }
}
