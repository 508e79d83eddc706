//! Task Registry - per-task class, affinity and fast-class entry time
//!
//! Single source of truth for a task's classification. The registry holds
//! no scheduling logic; it only keeps the class/affinity invariant:
//!
//! - Fast: `affinity` is the fast CPU set, `entry_time` is set
//! - Fair: `affinity == fair_affinity`, `entry_time` is cleared
//!
//! Mutators live on [`RegistryGuard`] so the coordinator can keep the
//! registry write lock across the matching runqueue update.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use spin::{RwLock, RwLockWriteGuard};

use super::config::HybridConfig;
use crate::scheduler::core::{CpuMask, HybridError, SchedClass, SchedResult};
use crate::scheduler::task::TaskId;
use crate::time::Timestamp;

/// Classification metadata attached to one task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskClassState {
    /// Current class
    pub class: SchedClass,

    /// CPUs the task may run on right now
    pub affinity: CpuMask,

    /// Affinity the fair class assigned; restored on demotion
    pub fair_affinity: CpuMask,

    /// Fast-class entry time, only while Fast
    pub entry_time: Option<Timestamp>,
}

impl TaskClassState {
    pub const fn fair(affinity: CpuMask) -> Self {
        Self {
            class: SchedClass::Fair,
            affinity,
            fair_affinity: affinity,
            entry_time: None,
        }
    }

    pub fn is_fast(&self) -> bool {
        self.class.is_fast()
    }
}

/// Registry of task classification state
pub struct TaskRegistry {
    /// Affinity given to tasks seen for the first time
    default_affinity: CpuMask,

    tasks: RwLock<BTreeMap<TaskId, TaskClassState>>,
}

impl TaskRegistry {
    pub const fn new(default_affinity: CpuMask) -> Self {
        Self {
            default_affinity,
            tasks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry whose default affinity is the configured online CPU set
    pub const fn for_config(config: &HybridConfig) -> Self {
        Self::new(config.online_cpus)
    }

    pub fn default_affinity(&self) -> CpuMask {
        self.default_affinity
    }

    /// Take the registry write lock
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            default_affinity: self.default_affinity,
            tasks: self.tasks.write(),
        }
    }

    /// Run `f` on a task's state under the read lock
    pub fn inspect<R>(&self, task: TaskId, f: impl FnOnce(Option<&TaskClassState>) -> R) -> R {
        let tasks = self.tasks.read();
        f(tasks.get(&task))
    }

    /// Run `f` on the whole table under the read lock
    pub fn inspect_all<R>(&self, f: impl FnOnce(&BTreeMap<TaskId, TaskClassState>) -> R) -> R {
        let tasks = self.tasks.read();
        f(&tasks)
    }

    /// Attach metadata for a task the host just created
    pub fn attach(&self, task: TaskId, affinity: CpuMask) {
        self.lock().attach(task, affinity);
    }

    /// Drop a task's metadata, returning its last state
    pub fn detach(&self, task: TaskId) -> Option<TaskClassState> {
        self.lock().detach(task)
    }

    pub fn set_fast(&self, task: TaskId, fast_cpus: CpuMask, now: Timestamp) -> SchedResult<()> {
        self.lock().set_fast(task, fast_cpus, now).map(|_| ())
    }

    pub fn set_fair(&self, task: TaskId, affinity: Option<CpuMask>) -> SchedResult<()> {
        self.lock().set_fair(task, affinity)
    }

    pub fn is_fast(&self, task: TaskId) -> bool {
        self.inspect(task, |s| s.map_or(false, TaskClassState::is_fast))
    }

    pub fn entry_time(&self, task: TaskId) -> Option<Timestamp> {
        self.inspect(task, |s| s.and_then(|s| s.entry_time))
    }

    pub fn class(&self, task: TaskId) -> SchedClass {
        self.inspect(task, |s| s.map_or(SchedClass::Fair, |s| s.class))
    }

    /// Current affinity; unknown tasks get the default affinity
    pub fn affinity(&self, task: TaskId) -> CpuMask {
        self.inspect(task, |s| s.map_or(self.default_affinity, |s| s.affinity))
    }

    pub fn state(&self, task: TaskId) -> Option<TaskClassState> {
        self.inspect(task, |s| s.copied())
    }

    /// Ids of every Fast task, ascending
    pub fn fast_tasks(&self) -> Vec<TaskId> {
        self.inspect_all(|tasks| {
            tasks
                .iter()
                .filter(|(_, s)| s.is_fast())
                .map(|(&id, _)| id)
                .collect()
        })
    }

    /// Number of tracked tasks
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry write lock with the mutating operations
pub struct RegistryGuard<'a> {
    default_affinity: CpuMask,
    tasks: RwLockWriteGuard<'a, BTreeMap<TaskId, TaskClassState>>,
}

impl RegistryGuard<'_> {
    pub fn get(&self, task: TaskId) -> Option<&TaskClassState> {
        self.tasks.get(&task)
    }

    pub fn is_fast(&self, task: TaskId) -> bool {
        self.tasks.get(&task).map_or(false, TaskClassState::is_fast)
    }

    pub fn attach(&mut self, task: TaskId, affinity: CpuMask) {
        self.tasks.entry(task).or_insert(TaskClassState::fair(affinity));
    }

    pub fn detach(&mut self, task: TaskId) -> Option<TaskClassState> {
        self.tasks.remove(&task)
    }

    /// Classify `task` as Fast
    ///
    /// Returns the previous state (`None` if the task was not tracked) so a
    /// failed admission can be rolled back with [`RegistryGuard::restore`].
    pub fn set_fast(
        &mut self,
        task: TaskId,
        fast_cpus: CpuMask,
        now: Timestamp,
    ) -> SchedResult<Option<TaskClassState>> {
        let prev = self.tasks.get(&task).copied();
        if prev.map_or(false, |s| s.is_fast()) {
            return Err(HybridError::AlreadyFast { task });
        }
        let fair_affinity = prev.map_or(self.default_affinity, |s| s.fair_affinity);
        self.tasks.insert(
            task,
            TaskClassState {
                class: SchedClass::Fast,
                affinity: fast_cpus,
                fair_affinity,
                entry_time: Some(now),
            },
        );
        Ok(prev)
    }

    /// Classify `task` as Fair
    ///
    /// `affinity` overrides the saved fair affinity when given.
    pub fn set_fair(&mut self, task: TaskId, affinity: Option<CpuMask>) -> SchedResult<()> {
        let state = match self.tasks.get_mut(&task) {
            Some(state) if state.is_fast() => state,
            _ => return Err(HybridError::NotFast { task }),
        };
        let affinity = affinity.unwrap_or(state.fair_affinity);
        *state = TaskClassState::fair(affinity);
        Ok(())
    }

    /// Put back the state returned by [`RegistryGuard::set_fast`]
    pub fn restore(&mut self, task: TaskId, prev: Option<TaskClassState>) {
        match prev {
            Some(state) => {
                self.tasks.insert(task, state);
            }
            None => {
                self.tasks.remove(&task);
            }
        }
    }

    /// Change the fair affinity of a task
    ///
    /// Applied immediately to Fair tasks; for Fast tasks it is kept until
    /// demotion so the fast-class restriction stays in force.
    pub fn set_affinity(&mut self, task: TaskId, mask: CpuMask) -> SchedResult<SchedClass> {
        if mask.is_empty() {
            return Err(HybridError::InvalidAffinity { task });
        }
        let default = self.default_affinity;
        let state = self.tasks.entry(task).or_insert(TaskClassState::fair(default));
        state.fair_affinity = mask;
        if !state.is_fast() {
            state.affinity = mask;
        }
        Ok(state.class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: CpuMask = CpuMask::from_bits(0x3);

    #[test]
    fn test_set_fast_restricts_affinity() {
        let reg = TaskRegistry::new(CpuMask::all());
        reg.set_fast(42, FAST, Timestamp::from_secs(1)).unwrap();
        assert!(reg.is_fast(42));
        assert_eq!(reg.affinity(42), FAST);
        assert_eq!(reg.entry_time(42), Some(Timestamp::from_secs(1)));
        assert_eq!(
            reg.set_fast(42, FAST, Timestamp::from_secs(2)),
            Err(HybridError::AlreadyFast { task: 42 })
        );
        // Entry time is set once per promotion.
        assert_eq!(reg.entry_time(42), Some(Timestamp::from_secs(1)));
    }

    #[test]
    fn test_set_fair_restores_fair_affinity() {
        let reg = TaskRegistry::new(CpuMask::all());
        reg.attach(7, CpuMask::from_cpus(&[2, 3]));
        reg.set_fast(7, FAST, Timestamp::ZERO).unwrap();
        reg.set_fair(7, None).unwrap();
        let state = reg.state(7).unwrap();
        assert_eq!(state.class, SchedClass::Fair);
        assert_eq!(state.affinity, CpuMask::from_cpus(&[2, 3]));
        assert_eq!(state.entry_time, None);
    }

    #[test]
    fn test_set_fair_on_fair_task_is_rejected() {
        let reg = TaskRegistry::new(CpuMask::all());
        assert_eq!(reg.set_fair(1, None), Err(HybridError::NotFast { task: 1 }));
        assert!(reg.is_empty());
        reg.attach(1, CpuMask::all());
        assert_eq!(reg.set_fair(1, None), Err(HybridError::NotFast { task: 1 }));
        assert_eq!(reg.state(1), Some(TaskClassState::fair(CpuMask::all())));
    }

    #[test]
    fn test_restore_undoes_set_fast() {
        let reg = TaskRegistry::new(CpuMask::all());
        let mut guard = reg.lock();
        let prev = guard.set_fast(5, FAST, Timestamp::ZERO).unwrap();
        assert_eq!(prev, None);
        guard.restore(5, prev);
        drop(guard);
        assert_eq!(reg.state(5), None);
        assert!(!reg.is_fast(5));
    }

    #[test]
    fn test_affinity_change_while_fast_is_deferred() {
        let reg = TaskRegistry::new(CpuMask::all());
        reg.set_fast(3, FAST, Timestamp::ZERO).unwrap();
        let class = reg.lock().set_affinity(3, CpuMask::single(5)).unwrap();
        assert_eq!(class, SchedClass::Fast);
        assert_eq!(reg.affinity(3), FAST);
        reg.set_fair(3, None).unwrap();
        assert_eq!(reg.affinity(3), CpuMask::single(5));
        assert_eq!(
            reg.lock().set_affinity(3, CpuMask::empty()),
            Err(HybridError::InvalidAffinity { task: 3 })
        );
    }

    #[test]
    fn test_fast_tasks_lists_only_fast() {
        let reg = TaskRegistry::new(CpuMask::all());
        reg.attach(1, CpuMask::all());
        reg.set_fast(2, FAST, Timestamp::ZERO).unwrap();
        reg.set_fast(9, FAST, Timestamp::ZERO).unwrap();
        assert_eq!(reg.fast_tasks(), [2, 9]);
        assert_eq!(reg.len(), 3);
    }
}
