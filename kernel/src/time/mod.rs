//! Time management for the hybrid scheduler
//!
//! The core never reads hardware counters itself: the host supplies a
//! [`Clock`] and tick handlers pass `now` explicitly.

pub mod clock;

// Re-exports
pub use clock::{Clock, Duration, ManualClock, Timestamp};
