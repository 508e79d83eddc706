//! Statistics - hybrid scheduler counters and fault channel
//!
//! Lock-free counters. Invariant breaches have their own counters so they
//! can be told apart from ordinary control flow.

use core::sync::atomic::{AtomicU64, Ordering};

use super::error::HybridError;

/// Ordering used for relaxed counters (metrics don't need strict ordering)
const RELAXED: Ordering = Ordering::Relaxed;

/// Hybrid scheduler statistics
#[derive(Debug, Default)]
pub struct HybridStats {
    /// Successful promotions
    pub promotions: AtomicU64,

    /// Demotions after the fast-class budget ran out
    pub timeout_demotions: AtomicU64,

    /// Demotions after a fast task was seen on a non-fast CPU
    pub affinity_demotions: AtomicU64,

    /// Manually requested demotions
    pub manual_demotions: AtomicU64,

    /// Tasks detached on exit while in the fast class
    pub exits_while_fast: AtomicU64,

    /// Scheduling decisions served by the fast class
    pub fast_picks: AtomicU64,

    /// Scheduling decisions served by the fair class
    pub fair_picks: AtomicU64,

    /// Fast tasks returned by the fair class and skipped
    pub fair_skips: AtomicU64,

    /// Rejected precondition checks (AlreadyFast, NotFast, InvalidAffinity)
    pub precondition_failures: AtomicU64,

    /// Registry/runqueue desynchronisation detected at admission
    pub duplicate_admissions: AtomicU64,

    /// Demoted tasks the fair class refused
    pub reinsertion_failures: AtomicU64,

    /// Consistency checks that failed (fast task on a non-fast CPU)
    pub consistency_failures: AtomicU64,

    /// Journal entries dropped because the journal was full
    pub events_dropped: AtomicU64,
}

impl HybridStats {
    pub const fn new() -> Self {
        Self {
            promotions: AtomicU64::new(0),
            timeout_demotions: AtomicU64::new(0),
            affinity_demotions: AtomicU64::new(0),
            manual_demotions: AtomicU64::new(0),
            exits_while_fast: AtomicU64::new(0),
            fast_picks: AtomicU64::new(0),
            fair_picks: AtomicU64::new(0),
            fair_skips: AtomicU64::new(0),
            precondition_failures: AtomicU64::new(0),
            duplicate_admissions: AtomicU64::new(0),
            reinsertion_failures: AtomicU64::new(0),
            consistency_failures: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, RELAXED);
    }

    /// Route an error to its counter
    pub fn record_error(&self, err: &HybridError) {
        match err {
            HybridError::AlreadyFast { .. }
            | HybridError::NotFast { .. }
            | HybridError::InvalidAffinity { .. } => {
                Self::bump(&self.precondition_failures)
            }
            HybridError::DuplicateAdmission { .. } => Self::bump(&self.duplicate_admissions),
            HybridError::ReinsertionFailure { .. } => Self::bump(&self.reinsertion_failures),
            HybridError::InvalidConfig { .. } => {}
        }
    }

    /// Total invariant breaches observed
    pub fn invariant_breaches(&self) -> u64 {
        self.duplicate_admissions.load(RELAXED)
            + self.reinsertion_failures.load(RELAXED)
            + self.consistency_failures.load(RELAXED)
    }

    /// Total demotions, all causes
    pub fn demotions(&self) -> u64 {
        self.timeout_demotions.load(RELAXED)
            + self.affinity_demotions.load(RELAXED)
            + self.manual_demotions.load(RELAXED)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> HybridStatsSnapshot {
        HybridStatsSnapshot {
            promotions: self.promotions.load(RELAXED),
            timeout_demotions: self.timeout_demotions.load(RELAXED),
            affinity_demotions: self.affinity_demotions.load(RELAXED),
            manual_demotions: self.manual_demotions.load(RELAXED),
            exits_while_fast: self.exits_while_fast.load(RELAXED),
            fast_picks: self.fast_picks.load(RELAXED),
            fair_picks: self.fair_picks.load(RELAXED),
            fair_skips: self.fair_skips.load(RELAXED),
            precondition_failures: self.precondition_failures.load(RELAXED),
            duplicate_admissions: self.duplicate_admissions.load(RELAXED),
            reinsertion_failures: self.reinsertion_failures.load(RELAXED),
            consistency_failures: self.consistency_failures.load(RELAXED),
            events_dropped: self.events_dropped.load(RELAXED),
        }
    }
}

/// Plain copy of [`HybridStats`] for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HybridStatsSnapshot {
    pub promotions: u64,
    pub timeout_demotions: u64,
    pub affinity_demotions: u64,
    pub manual_demotions: u64,
    pub exits_while_fast: u64,
    pub fast_picks: u64,
    pub fair_picks: u64,
    pub fair_skips: u64,
    pub precondition_failures: u64,
    pub duplicate_admissions: u64,
    pub reinsertion_failures: u64,
    pub consistency_failures: u64,
    pub events_dropped: u64,
}
