//! Monotonic clock and time utilities
//!
//! Provides the timestamp/duration types used for fast-class budgets.

use core::fmt;
use core::ops::{Add, Sub};
use core::sync::atomic::{AtomicU64, Ordering};

/// Monotonic timestamp (nanoseconds since an arbitrary origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Clock origin
    pub const ZERO: Self = Self(0);

    /// Get timestamp from nanoseconds
    pub const fn from_ns(ns: u64) -> Self {
        Self(ns)
    }

    /// Get timestamp from whole seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Get timestamp as nanoseconds
    pub const fn as_ns(&self) -> u64 {
        self.0
    }

    /// Get timestamp as seconds
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Time elapsed between `earlier` and `self`, zero if `earlier` is later
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.0))
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_sub(rhs.0))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.0 / 1_000_000_000, self.0 % 1_000_000_000)
    }
}

/// Time duration (nanoseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// Zero duration
    pub const ZERO: Self = Self(0);

    /// Create duration from nanoseconds
    pub const fn from_ns(ns: u64) -> Self {
        Self(ns)
    }

    /// Create duration from milliseconds
    pub const fn from_ms(ms: u64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    /// Create duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Create duration from minutes
    pub const fn from_mins(mins: u64) -> Self {
        Self::from_secs(mins.saturating_mul(60))
    }

    /// Get duration as nanoseconds
    pub const fn as_ns(&self) -> u64 {
        self.0
    }

    /// Get duration as seconds
    pub const fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Check if zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Self::Output {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl From<core::time::Duration> for Duration {
    fn from(d: core::time::Duration) -> Self {
        Duration(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.as_secs();
        if secs >= 60 && secs % 60 == 0 {
            write!(f, "{}min", secs / 60)
        } else if self.0 % 1_000_000_000 == 0 {
            write!(f, "{}s", secs)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

/// Source of monotonic time supplied by the host kernel
pub trait Clock: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Timestamp;
}

/// Manually driven clock
///
/// Used by hosts that advance time from their own tick counter, and by tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub const fn new(start: Timestamp) -> Self {
        Self {
            now_ns: AtomicU64::new(start.0),
        }
    }

    /// Move the clock to `at`; never goes backwards
    pub fn set(&self, at: Timestamp) {
        self.now_ns.fetch_max(at.0, Ordering::AcqRel);
    }

    /// Advance the clock by `by`
    pub fn advance(&self, by: Duration) -> Timestamp {
        let prev = self.now_ns.fetch_add(by.0, Ordering::AcqRel);
        Timestamp(prev.saturating_add(by.0))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now_ns.load(Ordering::Acquire))
    }
}
