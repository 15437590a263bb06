//! Per-unit periodic tasks driven by the world tick.
//!
//! Every active city owns one regeneration task and one knockback task.
//! Tasks are plain data: the [`World`](crate::world::World) walks them in
//! registration order each tick and advances their timers. Deactivating a
//! unit cancels everything it owns, so a pooled city never keeps running.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::unit::UnitId;

/// Handle for a scheduled task. Ids grow monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Timer state of a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Heals the owner each tick once the damage delay has elapsed.
    Regeneration {
        /// Ticks left before healing resumes.
        delay_remaining: u32,
    },
    /// Pushes nearby bodies away from the owner on a fixed cadence.
    Knockback {
        /// Ticks left until the next pulse.
        cooldown_remaining: u32,
    },
}

/// A task bound to the unit that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicTask {
    /// Task handle.
    pub id: TaskId,
    /// Unit the task acts on.
    pub owner: UnitId,
    /// Timer state.
    pub state: TaskState,
}

/// Registry of live periodic tasks.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    tasks: BTreeMap<TaskId, PeriodicTask>,
    next_id: u64,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a task for `owner`.
    pub fn register(&mut self, owner: UnitId, state: TaskState) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(id, PeriodicTask { id, owner, state });
        id
    }

    /// Stop one task. Returns false if it was not running.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Stop every task owned by `owner`, returning how many were stopped.
    pub fn cancel_owned_by(&mut self, owner: UnitId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| task.owner != owner);
        before - self.tasks.len()
    }

    /// Ids of all live tasks in registration order.
    ///
    /// The world iterates this snapshot so tasks cancelled mid-tick are
    /// simply skipped when looked up.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Look up a task.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&PeriodicTask> {
        self.tasks.get(&id)
    }

    /// Look up a task mutably.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut PeriodicTask> {
        self.tasks.get_mut(&id)
    }

    /// Tasks owned by `owner`, in registration order.
    pub fn tasks_for(&self, owner: UnitId) -> impl Iterator<Item = &PeriodicTask> {
        self.tasks.values().filter(move |task| task.owner == owner)
    }

    /// Number of live tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if no task is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_increasing_ids() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.register(1, TaskState::Regeneration { delay_remaining: 0 });
        let b = scheduler.register(1, TaskState::Knockback { cooldown_remaining: 40 });
        assert!(a < b);
        assert_eq!(scheduler.task_ids(), vec![a, b]);
        assert_eq!(scheduler.tasks_for(1).count(), 2);
    }

    #[test]
    fn test_cancel_owned_by_only_touches_owner() {
        let mut scheduler = Scheduler::new();
        scheduler.register(1, TaskState::Regeneration { delay_remaining: 0 });
        scheduler.register(1, TaskState::Knockback { cooldown_remaining: 40 });
        let other = scheduler.register(2, TaskState::Regeneration { delay_remaining: 0 });

        assert_eq!(scheduler.cancel_owned_by(1), 2);
        assert_eq!(scheduler.cancel_owned_by(1), 0);
        assert_eq!(scheduler.task_ids(), vec![other]);
    }

    #[test]
    fn test_cancel_single_task() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(5, TaskState::Knockback { cooldown_remaining: 3 });
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(scheduler.is_empty());
        assert!(scheduler.get(id).is_none());
    }

    #[test]
    fn test_get_mut_updates_state() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(5, TaskState::Knockback { cooldown_remaining: 3 });
        if let Some(task) = scheduler.get_mut(id) {
            task.state = TaskState::Knockback { cooldown_remaining: 2 };
        }
        assert_eq!(
            scheduler.get(id).map(|t| t.state),
            Some(TaskState::Knockback { cooldown_remaining: 2 })
        );
    }
}
