//! Fast-Class Runqueue
//!
//! Insertion-ordered queue of fast-class tasks behind a single spin lock.
//! Selection rotates the chosen entry to the tail, which gives strict
//! round-robin among runnable members.
//!
//! Costs: `admit` O(n) (duplicate check), `select_next` O(n) worst case,
//! `sweep_expired` O(n²) worst case, `remove` O(n). The fast class is
//! expected to hold a handful of tasks (bounded in practice by the fast
//! CPU count); a large population makes every tick pay for the scan.
//! Nothing allocates once the queue has reached its working size.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use spin::Mutex;

use super::config::{HybridConfig, MAX_QUEUE_CAPACITY};
use crate::scheduler::core::{HybridError, SchedResult};
use crate::scheduler::task::{TaskId, TaskRef};
use crate::time::{Duration, Timestamp};

/// One admitted fast-class task
#[derive(Debug, Clone)]
pub struct FastClassEntry {
    task: TaskRef,
    entry_time: Timestamp,
}

impl FastClassEntry {
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    pub fn into_task(self) -> TaskRef {
        self.task
    }

    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn entry_time(&self) -> Timestamp {
        self.entry_time
    }

    /// Budget used up at `now`
    pub fn is_expired(&self, now: Timestamp, timeout: Duration) -> bool {
        now.duration_since(self.entry_time) >= timeout
    }
}

/// Fast-class runqueue
pub struct FastRunQueue {
    entries: Mutex<VecDeque<FastClassEntry>>,
}

impl FastRunQueue {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Runqueue pre-allocated per `config`, capped at [`MAX_QUEUE_CAPACITY`]
    pub fn for_config(config: &HybridConfig) -> Self {
        Self::with_capacity(config.queue_capacity.min(MAX_QUEUE_CAPACITY))
    }

    /// Insert `task` at the tail
    pub fn admit(&self, task: &TaskRef, entry_time: Timestamp) -> SchedResult<()> {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.id() == task.id()) {
            return Err(HybridError::DuplicateAdmission { task: task.id() });
        }
        entries.push_back(FastClassEntry {
            task: task.clone(),
            entry_time,
        });
        Ok(())
    }

    /// Rotate the first runnable task to the tail and return it
    pub fn select_next(&self) -> Option<TaskRef> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|e| e.task.is_runnable())?;
        let entry = entries.remove(pos)?;
        let task = entry.task.clone();
        entries.push_back(entry);
        Some(task)
    }

    /// Remove and return every entry whose budget is used up at `now`
    pub fn sweep_expired(&self, now: Timestamp, timeout: Duration) -> Vec<FastClassEntry> {
        let mut entries = self.entries.lock();
        let mut expired = Vec::new();
        let mut i = 0;
        while i < entries.len() {
            if entries[i].is_expired(now, timeout) {
                if let Some(entry) = entries.remove(i) {
                    expired.push(entry);
                }
            } else {
                i += 1;
            }
        }
        expired
    }

    /// Remove `task`; absent tasks are a no-op
    pub fn remove(&self, task: TaskId) -> Option<FastClassEntry> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|e| e.id() == task)?;
        entries.remove(pos)
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.entries.lock().iter().any(|e| e.id() == task)
    }

    pub fn entry_time(&self, task: TaskId) -> Option<Timestamp> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.id() == task)
            .map(|e| e.entry_time)
    }

    /// Queued task ids, head first
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.entries.lock().iter().map(FastClassEntry::id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for FastRunQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::task::{Task, TaskState};

    fn queue_of(ids: &[TaskId]) -> (FastRunQueue, Vec<TaskRef>) {
        let q = FastRunQueue::with_capacity(ids.len());
        let tasks: Vec<TaskRef> = ids.iter().map(|&id| Task::new(id)).collect();
        for t in &tasks {
            q.admit(t, Timestamp::ZERO).unwrap();
        }
        (q, tasks)
    }

    #[test]
    fn test_admit_rejects_duplicates() {
        let (q, tasks) = queue_of(&[1, 2]);
        assert_eq!(
            q.admit(&tasks[0], Timestamp::ZERO),
            Err(HybridError::DuplicateAdmission { task: 1 })
        );
        assert_eq!(q.task_ids(), [1, 2]);
    }

    #[test]
    fn test_round_robin_order() {
        let (q, _tasks) = queue_of(&[1, 2, 3]);
        let picked: Vec<TaskId> = (0..6).map(|_| q.select_next().unwrap().id()).collect();
        assert_eq!(picked, [1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_select_skips_blocked_tasks() {
        let (q, tasks) = queue_of(&[1, 2, 3]);
        tasks[0].set_state(TaskState::Blocked);
        assert_eq!(q.select_next().unwrap().id(), 2);
        // Blocked entry stays at the head, the selected one moved behind 3.
        assert_eq!(q.task_ids(), [1, 3, 2]);

        for t in &tasks {
            t.set_state(TaskState::Sleeping);
        }
        assert!(q.select_next().is_none());
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_sweep_boundary() {
        let q = FastRunQueue::new();
        let t = Task::new(42);
        q.admit(&t, Timestamp::ZERO).unwrap();
        let timeout = Duration::from_mins(15);

        assert!(q.sweep_expired(Timestamp::from_secs(15 * 60 - 1), timeout).is_empty());
        let expired = q.sweep_expired(Timestamp::from_secs(15 * 60), timeout);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id(), 42);
        assert!(q.is_empty());
    }

    #[test]
    fn test_sweep_keeps_fresh_entries_in_order() {
        let q = FastRunQueue::new();
        for (id, at) in [(1, 0), (2, 100), (3, 10), (4, 200)] {
            q.admit(&Task::new(id), Timestamp::from_secs(at)).unwrap();
        }
        let expired = q.sweep_expired(Timestamp::from_secs(150), Duration::from_secs(100));
        let ids: Vec<TaskId> = expired.iter().map(FastClassEntry::id).collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(q.task_ids(), [2, 4]);
    }

    #[test]
    fn test_for_config_caps_preallocation() {
        let mut config = HybridConfig::new();
        config.queue_capacity = usize::MAX;
        let q = FastRunQueue::for_config(&config);
        q.admit(&Task::new(1), Timestamp::ZERO).unwrap();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (q, _tasks) = queue_of(&[1, 2]);
        assert_eq!(q.remove(1).map(|e| e.id()), Some(1));
        assert!(q.remove(1).is_none());
        assert!(!q.contains(1));
        assert_eq!(q.entry_time(2), Some(Timestamp::ZERO));
    }
}
