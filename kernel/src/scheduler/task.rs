//! Task - host task handle and run state
//!
//! Tasks are created and destroyed by the host process subsystem. The
//! scheduler core only keeps `Arc` handles to them and keys its own
//! classification metadata by [`TaskId`].

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Stable task identifier
pub type TaskId = u64;

/// Shared handle to a host task
pub type TaskRef = Arc<Task>;

/// Task run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum TaskState {
    /// Task is ready to run
    Ready = 0,

    /// Task is currently running
    Running = 1,

    /// Task is blocked (waiting for I/O, lock, etc.)
    Blocked = 2,

    /// Task is sleeping
    Sleeping = 3,

    /// Task has terminated
    Terminated = 4,

    /// Task is being created
    Creating = 5,

    /// Task is suspended
    Suspended = 6,
}

impl TaskState {
    /// Convert from u64
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Ready),
            1 => Some(Self::Running),
            2 => Some(Self::Blocked),
            3 => Some(Self::Sleeping),
            4 => Some(Self::Terminated),
            5 => Some(Self::Creating),
            6 => Some(Self::Suspended),
            _ => None,
        }
    }

    /// Ready or already on a CPU
    pub fn is_runnable(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
            Self::Blocked => write!(f, "Blocked"),
            Self::Sleeping => write!(f, "Sleeping"),
            Self::Terminated => write!(f, "Terminated"),
            Self::Creating => write!(f, "Creating"),
            Self::Suspended => write!(f, "Suspended"),
        }
    }
}

/// Atomic task state
pub struct AtomicTaskState {
    state: AtomicU64,
}

impl AtomicTaskState {
    /// Create new atomic state
    pub const fn new(state: TaskState) -> Self {
        Self {
            state: AtomicU64::new(state as u64),
        }
    }

    /// Load current state
    pub fn load(&self) -> TaskState {
        let value = self.state.load(Ordering::Acquire);
        TaskState::from_u64(value).unwrap_or(TaskState::Ready)
    }

    /// Store new state
    pub fn store(&self, state: TaskState) {
        self.state.store(state as u64, Ordering::Release);
    }
}

/// Host task as seen by the scheduler core
pub struct Task {
    id: TaskId,
    state: AtomicTaskState,
}

impl Task {
    /// New task in the `Ready` state
    pub fn new(id: TaskId) -> TaskRef {
        Self::with_state(id, TaskState::Ready)
    }

    pub fn with_state(id: TaskId, state: TaskState) -> TaskRef {
        Arc::new(Self {
            id,
            state: AtomicTaskState::new(state),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state.load()
    }

    /// Updated by the host on wake-up, block, exit...
    pub fn set_state(&self, state: TaskState) {
        self.state.store(state);
    }

    pub fn is_runnable(&self) -> bool {
        self.state().is_runnable()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runnable_states() {
        assert!(TaskState::Ready.is_runnable());
        assert!(TaskState::Running.is_runnable());
        assert!(!TaskState::Blocked.is_runnable());
        assert!(!TaskState::Terminated.is_runnable());
    }

    #[test]
    fn test_state_update_is_visible() {
        let t = Task::new(7);
        assert_eq!(t.id(), 7);
        t.set_state(TaskState::Sleeping);
        assert_eq!(t.state(), TaskState::Sleeping);
        assert!(!t.is_runnable());
    }
}
