//! Shared fixture for the hybrid scheduler integration tests

#![allow(dead_code)]

use exo_hybrid_sched::{
    Coordinator, FastRunQueue, FifoFairClass, HybridConfig, ManualClock, TaskRegistry, Timestamp,
};

/// Owned state a coordinator borrows
pub struct Harness {
    pub config: HybridConfig,
    pub registry: TaskRegistry,
    pub queue: FastRunQueue,
    pub fair: FifoFairClass,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(HybridConfig::new(), FifoFairClass::new())
    }

    pub fn with(config: HybridConfig, fair: FifoFairClass) -> Self {
        Self {
            config,
            registry: TaskRegistry::for_config(&config),
            queue: FastRunQueue::for_config(&config),
            fair,
            clock: ManualClock::new(Timestamp::ZERO),
        }
    }

    pub fn coordinator(&self) -> Coordinator<'_> {
        Coordinator::new(self.config, &self.registry, &self.queue, &self.fair, &self.clock)
            .expect("valid config")
    }
}

/// `is_fast(T)` holds exactly for the tasks in the fast runqueue
pub fn assert_bijection(h: &Harness, co: &Coordinator<'_>) {
    let mut queued = h.queue.task_ids();
    queued.sort_unstable();
    assert_eq!(h.registry.fast_tasks(), queued);
    assert_eq!(co.check_invariants(), Ok(()));
}
