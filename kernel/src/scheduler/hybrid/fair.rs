//! Fair-class collaborator contract
//!
//! The fair class (vruntime, load balancing, group scheduling) lives in the
//! host. The coordinator only needs to select, insert and remove tasks. It
//! is the sole arbiter of class dispatch: the fair class never asks whether
//! a task is Fast, it trusts the insert/remove calls it receives.
//!
//! `insert` and `remove` are called with the registry write lock held, so
//! an implementation must not call back into the coordinator or registry.

use alloc::collections::VecDeque;

use spin::Mutex;

use crate::scheduler::core::{CpuId, FairClassError};
use crate::scheduler::task::{TaskId, TaskRef};

/// Operations the coordinator needs from the fair class
pub trait FairClass: Send + Sync {
    /// Next fair task to run on `cpu`
    fn select_next(&self, cpu: CpuId) -> Option<TaskRef>;

    /// Queue a task (a freshly demoted one, for the coordinator)
    fn insert(&self, task: &TaskRef) -> Result<(), FairClassError>;

    /// Drop a task from the fair runqueue; absent tasks are a no-op
    fn remove(&self, task: &TaskRef);
}

/// Minimal FIFO fair class
///
/// Bring-up stand-in for the host's real fair scheduler: one global queue,
/// selection rotates the head to the tail. Optionally bounded, in which
/// case `insert` fails with [`FairClassError::QueueFull`].
pub struct FifoFairClass {
    queue: Mutex<VecDeque<TaskRef>>,
    capacity: Option<usize>,
}

impl FifoFairClass {
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: None,
        }
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.queue.lock().iter().any(|t| t.id() == task)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Default for FifoFairClass {
    fn default() -> Self {
        Self::new()
    }
}

impl FairClass for FifoFairClass {
    fn select_next(&self, _cpu: CpuId) -> Option<TaskRef> {
        let mut queue = self.queue.lock();
        let pos = queue.iter().position(|t| t.is_runnable())?;
        let task = queue.remove(pos)?;
        queue.push_back(task.clone());
        Some(task)
    }

    fn insert(&self, task: &TaskRef) -> Result<(), FairClassError> {
        let mut queue = self.queue.lock();
        if queue.iter().any(|t| t.id() == task.id()) {
            return Ok(());
        }
        if self.capacity.map_or(false, |cap| queue.len() >= cap) {
            return Err(FairClassError::QueueFull);
        }
        queue.push_back(task.clone());
        Ok(())
    }

    fn remove(&self, task: &TaskRef) {
        self.queue.lock().retain(|t| t.id() != task.id());
    }
}
