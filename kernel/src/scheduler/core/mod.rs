//! Scheduler core module
//!
//! Building blocks shared by the hybrid scheduler: CPU masks, scheduling
//! classes, typed errors and statistics.

pub mod affinity;
pub mod error;
pub mod policy;
pub mod statistics;

pub use affinity::{CpuId, CpuMask, MAX_CPUS};
pub use error::{FairClassError, HybridError, SchedResult};
pub use policy::SchedClass;
pub use statistics::{HybridStats, HybridStatsSnapshot};
