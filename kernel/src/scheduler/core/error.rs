//! Hybrid Scheduler Error Handling
//!
//! Typed errors for promotion, demotion and runqueue operations, with
//! recovery hints and a severity used by the fault channel.

use core::fmt;

use crate::scheduler::task::TaskId;

/// Why the fair class refused a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FairClassError {
    /// The fair runqueue has no room left
    QueueFull,
    /// The task is unknown to the fair class (already exited)
    UnknownTask,
    /// Any other refusal, with a short reason
    Rejected(&'static str),
}

impl fmt::Display for FairClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "fair runqueue full"),
            Self::UnknownTask => write!(f, "task unknown to fair class"),
            Self::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

/// Hybrid scheduler error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridError {
    // ═══════════════════════════════════════════════════════════════
    // Precondition violations (recoverable)
    // ═══════════════════════════════════════════════════════════════

    /// Promotion of a task already in the fast class
    AlreadyFast { task: TaskId },

    /// Demotion of a task that is not in the fast class
    NotFast { task: TaskId },

    /// Affinity change leaving the task no CPU to run on
    InvalidAffinity { task: TaskId },

    // ═══════════════════════════════════════════════════════════════
    // Invariant breaches (must reach the fault channel)
    // ═══════════════════════════════════════════════════════════════

    /// Task already queued in the fast runqueue: registry and runqueue
    /// disagree about its class
    DuplicateAdmission { task: TaskId },

    /// The fair class refused a demoted task, which is now queued nowhere
    ReinsertionFailure { task: TaskId, reason: FairClassError },

    // ═══════════════════════════════════════════════════════════════
    // Configuration
    // ═══════════════════════════════════════════════════════════════

    /// Rejected configuration value
    InvalidConfig { reason: &'static str },
}

impl fmt::Display for HybridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyFast { task } => write!(f, "Task {} is already in the fast class", task),
            Self::NotFast { task } => write!(f, "Task {} is not in the fast class", task),
            Self::InvalidAffinity { task } => write!(f, "Task {} given an empty CPU mask", task),
            Self::DuplicateAdmission { task } => {
                write!(f, "Task {} admitted twice to the fast runqueue", task)
            }
            Self::ReinsertionFailure { task, reason } => {
                write!(f, "Task {} lost: fair class reinsertion failed ({})", task, reason)
            }
            Self::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
        }
    }
}

impl HybridError {
    /// Get recovery hint for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::AlreadyFast { .. } => "Treat as no-op or demote first",
            Self::NotFast { .. } => "Task was already demoted (timeout or concurrent request)",
            Self::InvalidAffinity { .. } => "Pass a mask with at least one online CPU",
            Self::DuplicateAdmission { .. } => "Registry/runqueue desynchronized, audit callers",
            Self::ReinsertionFailure { .. } => "Task is unscheduled, re-queue it in the fair class",
            Self::InvalidConfig { .. } => "Check hybrid.* boot parameters",
        }
    }

    /// Is this a recoverable error?
    pub fn is_recoverable(&self) -> bool {
        !self.is_invariant_breach()
    }

    /// Errors signalling that promote/demote atomicity was not upheld
    pub fn is_invariant_breach(&self) -> bool {
        matches!(self, Self::DuplicateAdmission { .. } | Self::ReinsertionFailure { .. })
    }

    /// Should this error be logged?
    pub fn should_log(&self) -> bool {
        match self {
            Self::NotFast { .. } => false, // Benign race between demotion paths
            _ => true,
        }
    }

    /// Get error severity (0-3)
    pub fn severity(&self) -> u8 {
        match self {
            Self::ReinsertionFailure { .. } => 3, // Critical
            Self::DuplicateAdmission { .. } => 3,
            Self::InvalidConfig { .. } => 2,
            Self::AlreadyFast { .. } => 1,
            Self::InvalidAffinity { .. } => 1,
            Self::NotFast { .. } => 0,
        }
    }

    /// Task the error is about, if any
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Self::AlreadyFast { task }
            | Self::NotFast { task }
            | Self::InvalidAffinity { task }
            | Self::DuplicateAdmission { task }
            | Self::ReinsertionFailure { task, .. } => Some(*task),
            Self::InvalidConfig { .. } => None,
        }
    }
}

/// Result type for hybrid scheduler operations
pub type SchedResult<T> = Result<T, HybridError>;

/// Log a hybrid scheduler error with context and pass it through
///
/// Invariant breaches are logged at error level, others at warn level.
#[macro_export]
macro_rules! hybrid_fault {
    ($err:expr) => {{
        let err = $err;
        if err.should_log() {
            if err.is_invariant_breach() {
                log::error!("[HYBRID] Fault: {} (hint: {})", err, err.recovery_hint());
            } else {
                log::warn!("[HYBRID] Error: {} (hint: {})", err, err.recovery_hint());
            }
        }
        err
    }};
}
