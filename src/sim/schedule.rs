//! Deferred work on the simulation clock
//!
//! Every task is keyed by an owner so that removing an entity can cancel all
//! of its pending work in one call. Due tasks drain in (due time, insertion)
//! order, which keeps replays deterministic.

use serde::{Deserialize, Serialize};

use super::platform::PlatformId;

/// Who a scheduled task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskOwner {
    Platform(PlatformId),
    Combo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    id: TaskId,
    owner: TaskOwner,
    due: f64,
    task: T,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<Scheduled<T>>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, owner: TaskOwner, due: f64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Scheduled {
            id,
            owner,
            due,
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Cancel every pending task of `owner`, returning how many were dropped
    pub fn cancel_owner(&mut self, owner: TaskOwner) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != owner);
        before - self.tasks.len()
    }

    pub fn has_pending(&self, owner: TaskOwner) -> bool {
        self.tasks.iter().any(|t| t.owner == owner)
    }

    /// Remove and return every task due at or before `now`
    pub fn drain_due(&mut self, now: f64) -> Vec<(TaskOwner, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.due <= now);
        self.tasks = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));
        due.into_iter().map(|t| (t.owner, t.task)).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_due_in_time_then_insertion_order() {
        let mut s = Scheduler::new();
        s.schedule(TaskOwner::Combo, 2.0, "late");
        s.schedule(TaskOwner::Platform(PlatformId(1)), 1.0, "first");
        s.schedule(TaskOwner::Platform(PlatformId(2)), 1.0, "second");
        s.schedule(TaskOwner::Combo, 5.0, "future");

        let due: Vec<_> = s.drain_due(2.0).into_iter().map(|(_, t)| t).collect();
        assert_eq!(due, vec!["first", "second", "late"]);
        assert_eq!(s.len(), 1);
        assert!(s.drain_due(4.9).is_empty());
    }

    #[test]
    fn test_cancel_owner_drops_only_that_owner() {
        let mut s = Scheduler::new();
        let owner = TaskOwner::Platform(PlatformId(7));
        s.schedule(owner, 0.5, 1);
        s.schedule(owner, 0.1, 2);
        s.schedule(TaskOwner::Combo, 0.1, 3);

        assert_eq!(s.cancel_owner(owner), 2);
        assert!(!s.has_pending(owner));
        assert_eq!(s.cancel_owner(owner), 0);
        let due: Vec<_> = s.drain_due(1.0).into_iter().map(|(_, t)| t).collect();
        assert_eq!(due, vec![3]);
    }

    #[test]
    fn test_cancel_single_task() {
        let mut s = Scheduler::new();
        let id = s.schedule(TaskOwner::Combo, 1.0, ());
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.is_empty());
    }
}
