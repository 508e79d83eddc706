//! Hybrid fast/fair scheduling
//!
//! - `registry`: per-task class, affinity and fast-class entry time
//! - `fast_queue`: round-robin runqueue of fast-class tasks
//! - `coordinator`: promote/demote/tick policy, the only writer of classes
//! - `fair`: contract the host's fair class implements
//!
//! Construction order: config, then registry and runqueue, then the
//! coordinator borrowing both. Teardown is the reverse; the borrow checker
//! keeps the registry and runqueue alive for as long as the coordinator.

pub mod config;
pub mod coordinator;
pub mod events;
pub mod fair;
pub mod fast_queue;
pub mod registry;

pub use config::HybridConfig;
pub use coordinator::{Coordinator, Pick, TaskSnapshot, TickOutcome};
pub use events::{DemotionCause, EventLog, TransitionEvent, TransitionKind};
pub use fair::{FairClass, FifoFairClass};
pub use fast_queue::{FastClassEntry, FastRunQueue};
pub use registry::{RegistryGuard, TaskClassState, TaskRegistry};
