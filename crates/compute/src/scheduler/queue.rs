//! Per-user ready queues with a round-robin cursor.
//!
//! Users sit in an ordered ring (first-admission order). Only users with
//! pending units are in the ring, so the cursor always points at a
//! non-empty queue. A user whose queue drains leaves the ring and rejoins
//! at the end on its next admission; no credit is kept for skipped turns.

use std::collections::VecDeque;

use indexmap::IndexMap;
use odex_core::{TaskId, UserId};
use serde::Serialize;

use super::schedulable::Schedulable;

/// A queued unit with its identity cached at admission.
pub struct PendingUnit {
    /// Admission sequence number, unique per scheduler.
    pub seq: u64,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub priority: i32,
    pub unit: Box<dyn Schedulable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTask {
    pub task_id: TaskId,
    pub priority: i32,
}

/// Pending units of one user, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserQueueSnapshot {
    pub user_id: UserId,
    pub tasks: Vec<PendingTask>,
}

#[derive(Default)]
pub struct ReadyQueues {
    users: IndexMap<UserId, VecDeque<PendingUnit>>,
    cursor: usize,
    next_seq: u64,
}

impl ReadyQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a unit behind every pending unit of its user with an equal or
    /// higher priority. Returns the admission sequence number.
    pub fn push(&mut self, unit: Box<dyn Schedulable>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let pending = PendingUnit {
            seq,
            user_id: unit.user_id(),
            task_id: unit.task_id(),
            priority: unit.priority(),
            unit,
        };
        let queue = self.users.entry(pending.user_id).or_default();
        let at = queue.partition_point(|p| p.priority >= pending.priority);
        queue.insert(at, pending);
        seq
    }

    /// Pop the head of the user under the cursor and move the cursor past
    /// that user.
    pub fn pop_next(&mut self) -> Option<PendingUnit> {
        if self.users.is_empty() {
            return None;
        }
        if self.cursor >= self.users.len() {
            self.cursor = 0;
        }

        let index = self.cursor;
        let (_, queue) = self.users.get_index_mut(index)?;
        let next = queue.pop_front();
        if queue.is_empty() {
            // the following user slides into `index`
            self.users.shift_remove_index(index);
        } else {
            self.cursor = index + 1;
        }
        if self.cursor >= self.users.len() {
            self.cursor = 0;
        }
        next
    }

    /// Remove every pending unit for `task_id`.
    pub fn remove_task(&mut self, task_id: TaskId) -> Vec<PendingUnit> {
        let mut removed = Vec::new();
        for queue in self.users.values_mut() {
            let mut kept = VecDeque::with_capacity(queue.len());
            for pending in queue.drain(..) {
                if pending.task_id == task_id {
                    removed.push(pending);
                } else {
                    kept.push_back(pending);
                }
            }
            *queue = kept;
        }
        self.prune_empty_users();
        removed
    }

    /// Take every pending unit, leaving the queues empty.
    pub fn drain(&mut self) -> Vec<PendingUnit> {
        self.cursor = 0;
        self.users
            .drain(..)
            .flat_map(|(_, queue)| queue.into_iter())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Number of users with pending units.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn snapshot(&self) -> Vec<UserQueueSnapshot> {
        self.users
            .iter()
            .map(|(user_id, queue)| UserQueueSnapshot {
                user_id: *user_id,
                tasks: queue
                    .iter()
                    .map(|p| PendingTask {
                        task_id: p.task_id,
                        priority: p.priority,
                    })
                    .collect(),
            })
            .collect()
    }

    fn prune_empty_users(&mut self) {
        let mut index = self.users.len();
        while index > 0 {
            index -= 1;
            let empty = self
                .users
                .get_index(index)
                .map(|(_, q)| q.is_empty())
                .unwrap_or(false);
            if empty {
                self.users.shift_remove_index(index);
                if index < self.cursor {
                    self.cursor -= 1;
                }
            }
        }
        if self.cursor >= self.users.len() {
            self.cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unit {
        user: UserId,
        task: TaskId,
        priority: i32,
    }

    impl Schedulable for Unit {
        fn user_id(&self) -> UserId {
            self.user
        }

        fn task_id(&self) -> TaskId {
            self.task
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn do_work(&mut self) -> i32 {
            0
        }
    }

    fn unit(user: UserId, task: TaskId, priority: i32) -> Box<dyn Schedulable> {
        Box::new(Unit { user, task, priority })
    }

    fn drain_order(queues: &mut ReadyQueues) -> Vec<TaskId> {
        std::iter::from_fn(|| queues.pop_next().map(|p| p.task_id)).collect()
    }

    #[test]
    fn round_robin_across_users() {
        let mut queues = ReadyQueues::new();
        for (user, task) in [(1, 10), (1, 11), (1, 12), (2, 20), (2, 21), (3, 30)] {
            queues.push(unit(user, task, 0));
        }
        assert_eq!(drain_order(&mut queues), vec![10, 20, 30, 11, 21, 12]);
        assert!(queues.is_empty());
    }

    #[test]
    fn priority_within_user_is_stable() {
        let mut queues = ReadyQueues::new();
        for (task, priority) in [(100, 1), (101, 5), (102, 5), (103, 2)] {
            queues.push(unit(1, task, priority));
        }
        assert_eq!(drain_order(&mut queues), vec![101, 102, 103, 100]);
    }

    #[test]
    fn priority_does_not_jump_users() {
        let mut queues = ReadyQueues::new();
        queues.push(unit(1, 10, 0));
        queues.push(unit(2, 20, 0));
        queues.push(unit(1, 11, 100));
        // user 1's high-priority unit is first in its queue, but user 2
        // still gets the second slot
        assert_eq!(drain_order(&mut queues), vec![11, 20, 10]);
    }

    #[test]
    fn returning_user_rejoins_at_the_end() {
        let mut queues = ReadyQueues::new();
        queues.push(unit(1, 10, 0));
        queues.push(unit(2, 20, 0));
        queues.push(unit(2, 21, 0));
        assert_eq!(queues.pop_next().map(|p| p.task_id), Some(10));

        queues.push(unit(3, 30, 0));
        queues.push(unit(1, 12, 0));
        assert_eq!(drain_order(&mut queues), vec![20, 30, 12, 21]);
    }

    #[test]
    fn backlogged_users_stay_within_one_dispatch() {
        let mut queues = ReadyQueues::new();
        for i in 0..40 {
            queues.push(unit(1, i, (i % 3) as i32));
            queues.push(unit(2, 100 + i, 0));
            queues.push(unit(3, 200 + i, -(i as i32)));
        }

        let mut counts = [0i64; 3];
        for _ in 0..90 {
            let popped = queues.pop_next().unwrap();
            counts[(popped.user_id - 1) as usize] += 1;
            let max = counts.iter().max().unwrap();
            let min = counts.iter().min().unwrap();
            assert!(max - min <= 1, "counts diverged: {:?}", counts);
        }
    }

    #[test]
    fn remove_task_keeps_cursor_on_next_user() {
        let mut queues = ReadyQueues::new();
        for (user, task) in [(1, 10), (2, 20), (3, 30), (3, 31)] {
            queues.push(unit(user, task, 0));
        }
        assert_eq!(queues.pop_next().map(|p| p.task_id), Some(10));

        let removed = queues.remove_task(20);
        assert_eq!(removed.len(), 1);
        assert_eq!(queues.user_count(), 1);
        assert_eq!(drain_order(&mut queues), vec![30, 31]);
    }

    #[test]
    fn remove_unknown_task_is_noop() {
        let mut queues = ReadyQueues::new();
        queues.push(unit(1, 10, 0));
        assert!(queues.remove_task(99).is_empty());
        assert_eq!(queues.len(), 1);
    }

    #[test]
    fn snapshot_lists_dispatch_order() {
        let mut queues = ReadyQueues::new();
        queues.push(unit(4, 40, 1));
        queues.push(unit(4, 41, 3));
        let snapshot = queues.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot[0].tasks,
            vec![
                PendingTask { task_id: 41, priority: 3 },
                PendingTask { task_id: 40, priority: 1 },
            ]
        );
    }

    #[test]
    fn drain_empties_everything() {
        let mut queues = ReadyQueues::new();
        queues.push(unit(1, 10, 0));
        queues.push(unit(2, 20, 0));
        assert_eq!(queues.drain().len(), 2);
        assert!(queues.is_empty());
        assert!(queues.pop_next().is_none());
    }
}
