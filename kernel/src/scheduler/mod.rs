//! Scheduler subsystem
//!
//! Hybrid scheduling: a small round-robin fast class pinned to a subset of
//! CPUs, running alongside the host's fair class. Tasks are promoted into
//! the fast class on request and demoted back on timeout, affinity
//! violation or manual request.

pub mod core;
pub mod hybrid;
pub mod task;

// Re-exports
pub use self::core::{CpuMask, HybridError, HybridStats, SchedClass, SchedResult};
pub use hybrid::{Coordinator, FairClass, FastRunQueue, HybridConfig, TaskRegistry};
pub use task::{Task, TaskId, TaskRef, TaskState};
