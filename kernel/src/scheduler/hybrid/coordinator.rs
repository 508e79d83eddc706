//! Scheduling Coordinator
//!
//! The only component on the hot scheduling path. It owns the policy of
//! when to promote, demote or defer to the fair class, and it is the only
//! code that changes a task's class.
//!
//! Locking:
//! - registry write lock, then runqueue lock, then the fair class's own
//!   lock; never the other way round
//! - every change to a task's (class, affinity, queue membership) triple
//!   happens with the registry write lock held, so a reader holding the
//!   registry read lock sees either the old or the new triple
//! - the matching fair-class insert or remove is made under the same
//!   registry write lock, so a task is always queued in exactly one class
//! - bookkeeping (stats, journal, logs) happens after the lock is dropped
//!
//! Racing demotions (manual request against a sweep on another CPU)
//! collapse into one: the loser finds the task Fair and gets `NotFast`.

use alloc::vec::Vec;

use super::config::HybridConfig;
use super::events::{DemotionCause, EventLog, TransitionEvent, TransitionKind};
use super::fair::FairClass;
use super::fast_queue::FastRunQueue;
use super::registry::TaskRegistry;
use crate::hybrid_fault;
use crate::scheduler::core::{
    CpuId, CpuMask, FairClassError, HybridError, HybridStats, SchedClass, SchedResult,
};
use crate::scheduler::task::{TaskId, TaskRef};
use crate::time::{Clock, Timestamp};

/// Task chosen to run next, tagged with the class that chose it
#[derive(Debug, Clone)]
pub enum Pick {
    Fast(TaskRef),
    Fair(TaskRef),
}

impl Pick {
    pub fn task(&self) -> &TaskRef {
        match self {
            Self::Fast(t) | Self::Fair(t) => t,
        }
    }

    pub fn into_task(self) -> TaskRef {
        match self {
            Self::Fast(t) | Self::Fair(t) => t,
        }
    }

    pub fn class(&self) -> SchedClass {
        match self {
            Self::Fast(_) => SchedClass::Fast,
            Self::Fair(_) => SchedClass::Fair,
        }
    }
}

/// Result of one tick on one CPU
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// The running task was demoted, and why
    pub demotion: Option<DemotionCause>,

    /// Invariant breach raised while handling the tick
    pub fault: Option<HybridError>,

    /// Candidate to run next on this CPU
    pub next: Option<Pick>,
}

/// Consistent view of one task's class state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub class: SchedClass,
    pub affinity: CpuMask,
    pub entry_time: Option<Timestamp>,
    /// Member of the fast runqueue
    pub queued: bool,
}

/// Hybrid scheduling coordinator
///
/// Borrows the registry, runqueue, fair class and clock, so all of them
/// outlive every tick and control path that goes through the coordinator.
pub struct Coordinator<'a> {
    config: HybridConfig,
    registry: &'a TaskRegistry,
    queue: &'a FastRunQueue,
    fair: &'a dyn FairClass,
    clock: &'a dyn Clock,
    events: EventLog,
    stats: HybridStats,
}

impl<'a> Coordinator<'a> {
    /// Build a coordinator over explicitly owned state
    pub fn new(
        config: HybridConfig,
        registry: &'a TaskRegistry,
        queue: &'a FastRunQueue,
        fair: &'a dyn FairClass,
        clock: &'a dyn Clock,
    ) -> SchedResult<Self> {
        config.validate().map_err(|e| hybrid_fault!(e))?;
        log::info!("[HYBRID] Coordinator ready: {}", config.export_config());
        Ok(Self {
            config,
            registry,
            queue,
            fair,
            clock,
            events: EventLog::new(config.journal_capacity),
            stats: HybridStats::new(),
        })
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.registry
    }

    pub fn queue(&self) -> &FastRunQueue {
        self.queue
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn stats(&self) -> &HybridStats {
        &self.stats
    }

    // ═══════════════════════════════════════════════════════════════
    // Control contract
    // ═══════════════════════════════════════════════════════════════

    /// Move a Fair task into the fast class
    pub fn promote(&self, task: &TaskRef) -> SchedResult<()> {
        let id = task.id();
        let now = self.clock.now();
        {
            let mut registry = self.registry.lock();
            let prev = registry
                .set_fast(id, self.config.fast_cpus, now)
                .map_err(|e| self.fail(e))?;
            if let Err(err) = self.queue.admit(task, now) {
                registry.restore(id, prev);
                return Err(self.fail(err));
            }
            self.fair.remove(task);
        }

        HybridStats::bump(&self.stats.promotions);
        self.journal(id, TransitionKind::Promoted, now, None);
        log::info!(
            "[HYBRID] Task {} promoted to fast class (CPUs {}, budget {})",
            id,
            self.config.fast_cpus,
            self.config.timeout
        );
        Ok(())
    }

    /// Manually move a Fast task back to the fair class
    pub fn demote(&self, task: &TaskRef) -> SchedResult<()> {
        self.demote_with(task, DemotionCause::Manual, None, self.clock.now())
    }

    /// Change a task's fair affinity (applied at once if Fair, on demotion if Fast)
    pub fn set_affinity(&self, task: TaskId, mask: CpuMask) -> SchedResult<SchedClass> {
        let mask = mask.intersect(&self.config.online_cpus);
        let class = self
            .registry
            .lock()
            .set_affinity(task, mask)
            .map_err(|e| self.fail(e))?;
        if class.is_fast() {
            log::debug!("[HYBRID] Task {} affinity {} deferred until demotion", task, mask);
        }
        Ok(class)
    }

    /// Forget a task the host is tearing down
    pub fn task_exit(&self, task: &TaskRef) {
        let id = task.id();
        let was_fast = {
            let mut registry = self.registry.lock();
            let queued = self.queue.remove(id).is_some();
            let state = registry.detach(id);
            self.fair.remove(task);
            queued || state.map_or(false, |s| s.is_fast())
        };

        if was_fast {
            HybridStats::bump(&self.stats.exits_while_fast);
            self.journal(id, TransitionKind::Exited, self.clock.now(), None);
            log::info!("[HYBRID] Task {} exited while in fast class", id);
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Tick driver contract
    // ═══════════════════════════════════════════════════════════════

    /// Per-CPU scheduler tick
    pub fn on_tick(&self, cpu: CpuId, running: Option<&TaskRef>, now: Timestamp) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let Some(task) = running.filter(|t| self.registry.is_fast(t.id())) else {
            outcome.next = self.fair_pick(cpu);
            return outcome;
        };

        let cause = if !self.config.fast_cpus.is_set(cpu) {
            HybridStats::bump(&self.stats.consistency_failures);
            log::error!(
                "[HYBRID] Consistency check failed: fast task {} running on CPU {} outside {}",
                task.id(),
                cpu,
                self.config.fast_cpus
            );
            Some(DemotionCause::AffinityViolation)
        } else if self.is_expired(task.id(), now) {
            Some(DemotionCause::Timeout)
        } else {
            None
        };

        match cause {
            Some(cause) => match self.demote_with(task, cause, Some(cpu), now) {
                Ok(()) => outcome.demotion = Some(cause),
                // Already demoted by a concurrent path.
                Err(HybridError::NotFast { .. }) => {}
                Err(err) => {
                    outcome.demotion = Some(cause);
                    outcome.fault = Some(err);
                }
            },
            None => {
                if let Some(next) = self.queue.select_next() {
                    HybridStats::bump(&self.stats.fast_picks);
                    outcome.next = Some(Pick::Fast(next));
                    return outcome;
                }
            }
        }

        outcome.next = self.pick_next(cpu);
        outcome
    }

    /// Periodic timer: demote every task whose fast-class budget is used up
    ///
    /// Returns the demoted task ids, including those the fair class
    /// refused; each refusal is counted and logged through the fault
    /// channel like any other [`HybridError::ReinsertionFailure`].
    pub fn sweep(&self, now: Timestamp) -> Vec<TaskId> {
        let demoted: Vec<_> = {
            let mut registry = self.registry.lock();
            self.queue
                .sweep_expired(now, self.config.timeout)
                .into_iter()
                .map(|entry| {
                    if registry.set_fair(entry.id(), None).is_err() {
                        HybridStats::bump(&self.stats.consistency_failures);
                        log::error!("[HYBRID] Task {} was queued but not classified fast", entry.id());
                    }
                    let reinserted = self.fair.insert(entry.task());
                    (entry.id(), reinserted)
                })
                .collect()
        };

        demoted
            .into_iter()
            .map(|(id, reinserted)| {
                let finished = self.finish_demotion(id, DemotionCause::Timeout, None, now, reinserted);
                if let Err(err) = finished {
                    // Counted and logged by `fail`; the sweep carries on.
                    debug_assert!(err.is_invariant_breach());
                }
                id
            })
            .collect()
    }

    /// Schedule-path selection for `cpu`
    ///
    /// On a fast CPU the fast class goes first; other CPUs only ever run
    /// fair tasks.
    pub fn pick_next(&self, cpu: CpuId) -> Option<Pick> {
        if self.config.fast_cpus.is_set(cpu) {
            if let Some(task) = self.queue.select_next() {
                HybridStats::bump(&self.stats.fast_picks);
                return Some(Pick::Fast(task));
            }
        }
        self.fair_pick(cpu)
    }

    // ═══════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════

    /// Class, affinity, entry time and queue membership, read atomically
    pub fn snapshot(&self, task: TaskId) -> TaskSnapshot {
        self.registry.inspect(task, |state| TaskSnapshot {
            class: state.map_or(SchedClass::Fair, |s| s.class),
            affinity: state.map_or(self.registry.default_affinity(), |s| s.affinity),
            entry_time: state.and_then(|s| s.entry_time),
            queued: self.queue.contains(task),
        })
    }

    /// Verify registry/runqueue agreement and the fast affinity restriction
    pub fn check_invariants(&self) -> Result<(), (TaskId, &'static str)> {
        self.registry.inspect_all(|tasks| {
            let queued = self.queue.task_ids();
            for (&id, state) in tasks {
                if state.is_fast() != queued.contains(&id) {
                    return Err((id, "class disagrees with fast runqueue membership"));
                }
                if state.is_fast() && !state.affinity.is_subset_of(&self.config.fast_cpus) {
                    return Err((id, "fast task affinity outside fast CPU set"));
                }
                if state.is_fast() != state.entry_time.is_some() {
                    return Err((id, "entry time set outside the fast class"));
                }
            }
            for id in &queued {
                if !tasks.contains_key(id) {
                    return Err((*id, "queued task has no registry entry"));
                }
            }
            Ok(())
        })
    }

    // ═══════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════

    fn is_expired(&self, task: TaskId, now: Timestamp) -> bool {
        self.queue
            .entry_time(task)
            .map_or(false, |at| now.duration_since(at) >= self.config.timeout)
    }

    /// Common demotion path for every cause
    fn demote_with(
        &self,
        task: &TaskRef,
        cause: DemotionCause,
        cpu: Option<CpuId>,
        now: Timestamp,
    ) -> SchedResult<()> {
        let id = task.id();
        let reinserted = {
            let mut registry = self.registry.lock();
            if !registry.is_fast(id) {
                return Err(self.fail(HybridError::NotFast { task: id }));
            }
            if self.queue.remove(id).is_none() {
                HybridStats::bump(&self.stats.consistency_failures);
                log::error!("[HYBRID] Task {} classified fast but not queued", id);
            }
            registry.set_fair(id, None).map_err(|e| self.fail(e))?;
            self.fair.insert(task)
        };
        self.finish_demotion(id, cause, cpu, now, reinserted)
    }

    /// Bookkeeping once the task is Fair and the fair class has answered
    fn finish_demotion(
        &self,
        id: TaskId,
        cause: DemotionCause,
        cpu: Option<CpuId>,
        now: Timestamp,
        reinserted: Result<(), FairClassError>,
    ) -> SchedResult<()> {
        let counter = match cause {
            DemotionCause::Timeout => &self.stats.timeout_demotions,
            DemotionCause::AffinityViolation => &self.stats.affinity_demotions,
            DemotionCause::Manual => &self.stats.manual_demotions,
        };
        HybridStats::bump(counter);
        self.journal(id, TransitionKind::Demoted(cause), now, cpu);
        log::info!("[HYBRID] Task {} reverted to fair class (cause={})", id, cause);

        reinserted.map_err(|reason| self.fail(HybridError::ReinsertionFailure { task: id, reason }))
    }

    /// Ask the fair class, skipping any Fast task it still holds
    fn fair_pick(&self, cpu: CpuId) -> Option<Pick> {
        for _ in 0..self.config.fair_skip_limit {
            let task = self.fair.select_next(cpu)?;
            if !self.registry.is_fast(task.id()) {
                HybridStats::bump(&self.stats.fair_picks);
                return Some(Pick::Fair(task));
            }
            // Re-check under the write lock: a concurrent demotion may have
            // just handed the task back to the fair class.
            let registry = self.registry.lock();
            if !registry.is_fast(task.id()) {
                drop(registry);
                HybridStats::bump(&self.stats.fair_picks);
                return Some(Pick::Fair(task));
            }
            HybridStats::bump(&self.stats.fair_skips);
            log::debug!("[HYBRID] Fair class returned fast task {}, removing it", task.id());
            self.fair.remove(&task);
        }
        log::warn!(
            "[HYBRID] Fair class kept returning fast tasks on CPU {} ({} skipped)",
            cpu,
            self.config.fair_skip_limit
        );
        None
    }

    fn journal(&self, task: TaskId, kind: TransitionKind, at: Timestamp, cpu: Option<CpuId>) {
        if !self.events.record(TransitionEvent { task, kind, at, cpu }) {
            HybridStats::bump(&self.stats.events_dropped);
        }
    }

    /// Count and log an error, then hand it back
    fn fail(&self, err: HybridError) -> HybridError {
        self.stats.record_error(&err);
        hybrid_fault!(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::hybrid::fair::FifoFairClass;
    use crate::scheduler::task::Task;
    use crate::time::{Duration, ManualClock};

    struct Fixture {
        registry: TaskRegistry,
        queue: FastRunQueue,
        fair: FifoFairClass,
        clock: ManualClock,
    }

    impl Fixture {
        fn new() -> Self {
            let config = HybridConfig::new();
            Self {
                registry: TaskRegistry::for_config(&config),
                queue: FastRunQueue::for_config(&config),
                fair: FifoFairClass::new(),
                clock: ManualClock::new(Timestamp::ZERO),
            }
        }

        fn coordinator(&self) -> Coordinator<'_> {
            Coordinator::new(HybridConfig::new(), &self.registry, &self.queue, &self.fair, &self.clock)
                .unwrap()
        }
    }

    #[test]
    fn test_promote_then_demote_round_trip() {
        let fx = Fixture::new();
        let co = fx.coordinator();
        let t = Task::new(1);
        fx.registry.attach(1, CpuMask::from_cpus(&[1, 2, 3]));
        fx.fair.insert(&t).unwrap();

        co.promote(&t).unwrap();
        assert!(!fx.fair.contains(1));
        assert_eq!(co.snapshot(1).affinity, CpuMask::from_cpus(&[0, 1]));

        co.demote(&t).unwrap();
        let snap = co.snapshot(1);
        assert_eq!(snap.class, SchedClass::Fair);
        assert_eq!(snap.affinity, CpuMask::from_cpus(&[1, 2, 3]));
        assert!(!snap.queued);
        assert!(fx.fair.contains(1));
        assert_eq!(co.check_invariants(), Ok(()));
    }

    #[test]
    fn test_duplicate_admission_rolls_back() {
        let fx = Fixture::new();
        let co = fx.coordinator();
        let t = Task::new(8);
        // Desynchronise on purpose: queued without being classified fast.
        fx.queue.admit(&t, Timestamp::ZERO).unwrap();

        assert_eq!(co.promote(&t), Err(HybridError::DuplicateAdmission { task: 8 }));
        assert!(!fx.registry.is_fast(8));
        assert_eq!(fx.registry.state(8), None);
        assert_eq!(co.stats().snapshot().duplicate_admissions, 1);
        assert_eq!(co.stats().snapshot().promotions, 0);
    }

    #[test]
    fn test_running_fast_task_on_fast_cpu_keeps_fast_path() {
        let fx = Fixture::new();
        let co = fx.coordinator();
        let (a, b) = (Task::new(1), Task::new(2));
        co.promote(&a).unwrap();
        co.promote(&b).unwrap();
        let other = Task::new(3);
        fx.fair.insert(&other).unwrap();

        let out = co.on_tick(0, Some(&a), Timestamp::from_secs(1));
        assert!(out.demotion.is_none());
        assert!(matches!(out.next, Some(Pick::Fast(ref t)) if t.id() == 1));
        let out = co.on_tick(1, Some(&a), Timestamp::from_secs(2));
        assert!(matches!(out.next, Some(Pick::Fast(ref t)) if t.id() == 2));
    }

    #[test]
    fn test_fair_pick_skips_fast_tasks() {
        let fx = Fixture::new();
        let co = fx.coordinator();
        let (fast, fair) = (Task::new(1), Task::new(2));
        co.promote(&fast).unwrap();
        // Fair class still holds the fast task (stale entry).
        fx.fair.insert(&fast).unwrap();
        fx.fair.insert(&fair).unwrap();

        let pick = co.pick_next(5).unwrap();
        assert_eq!(pick.class(), SchedClass::Fair);
        assert_eq!(pick.task().id(), 2);
        assert!(!fx.fair.contains(1));
        assert_eq!(co.stats().snapshot().fair_skips, 1);
    }

    #[test]
    fn test_timeout_on_tick() {
        let fx = Fixture::new();
        let co = fx.coordinator();
        let t = Task::new(4);
        co.promote(&t).unwrap();

        let budget = Timestamp::ZERO + Duration::from_mins(15);
        let out = co.on_tick(0, Some(&t), budget - Duration::from_secs(1));
        assert!(out.demotion.is_none());

        let out = co.on_tick(0, Some(&t), budget);
        assert_eq!(out.demotion, Some(DemotionCause::Timeout));
        assert!(!fx.registry.is_fast(4));
        assert!(matches!(out.next, Some(Pick::Fair(ref t)) if t.id() == 4));
    }

    #[test]
    fn test_set_affinity_rejects_empty_mask() {
        let fx = Fixture::new();
        let co = fx.coordinator();
        assert_eq!(
            co.set_affinity(3, CpuMask::empty()),
            Err(HybridError::InvalidAffinity { task: 3 })
        );
        assert_eq!(co.set_affinity(3, CpuMask::single(4)), Ok(SchedClass::Fair));
        assert_eq!(fx.registry.affinity(3), CpuMask::single(4));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let fx = Fixture::new();
        let cfg = HybridConfig::new().with_fast_cpus(CpuMask::empty());
        let res = Coordinator::new(cfg, &fx.registry, &fx.queue, &fx.fair, &fx.clock);
        assert!(matches!(res, Err(HybridError::InvalidConfig { .. })));
    }
}
