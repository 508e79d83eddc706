//! Transition journal
//!
//! Bounded record of promotions and demotions, kept for external
//! inspection (shell, procfs, tests). When full, the oldest entry goes.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use super::config::MAX_JOURNAL_CAPACITY;
use crate::scheduler::core::CpuId;
use crate::scheduler::task::TaskId;
use crate::time::Timestamp;

/// Why a task left the fast class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemotionCause {
    /// Fast-class budget used up
    Timeout,
    /// Fast task observed on a CPU outside the fast set
    AffinityViolation,
    /// Requested by an administrator or external monitor
    Manual,
}

impl DemotionCause {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::AffinityViolation => "affinity-violation",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for DemotionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of class transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Promoted,
    Demoted(DemotionCause),
    /// Task exited while in the fast class
    Exited,
}

/// One journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub task: TaskId,
    pub kind: TransitionKind,
    pub at: Timestamp,
    /// CPU whose tick triggered the transition, if tick-driven
    pub cpu: Option<CpuId>,
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] task {} ", self.at, self.task)?;
        match self.kind {
            TransitionKind::Promoted => write!(f, "promoted to fast class")?,
            TransitionKind::Demoted(cause) => write!(f, "demoted to fair class (cause={})", cause)?,
            TransitionKind::Exited => write!(f, "exited while in fast class")?,
        }
        if let Some(cpu) = self.cpu {
            write!(f, " on CPU {}", cpu)?;
        }
        Ok(())
    }
}

/// Bounded transition journal
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<TransitionEvent>>,
}

impl EventLog {
    /// Journal keeping at most `capacity` events
    ///
    /// Pre-allocation is capped at [`MAX_JOURNAL_CAPACITY`]; larger
    /// journals grow on demand.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_JOURNAL_CAPACITY))),
        }
    }

    /// Append an event; returns `false` if the oldest entry was dropped
    pub fn record(&self, event: TransitionEvent) -> bool {
        let mut events = self.events.lock();
        let dropped = events.len() >= self.capacity;
        if dropped {
            events.pop_front();
        }
        events.push_back(event);
        !dropped
    }

    /// Take every event, oldest first
    pub fn drain(&self) -> Vec<TransitionEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Copy of every event, oldest first
    pub fn snapshot(&self) -> Vec<TransitionEvent> {
        self.events.lock().iter().copied().collect()
    }

    /// Events concerning one task, oldest first
    pub fn for_task(&self, task: TaskId) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task == task)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
