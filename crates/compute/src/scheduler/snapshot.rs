use std::fmt;

use odex_core::{TaskId, UserId};
use serde::Serialize;

use super::metrics::SchedulerMetrics;
use super::queue::UserQueueSnapshot;
use super::schedulable::UnitState;

/// A dispatched unit that has not finished its post-hook yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveUnit {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub state: UnitState,
}

/// Point-in-time view of a scheduler, rendered by `log_debug_data`.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub scheduler: &'static str,
    pub target_workers: usize,
    pub pending: Vec<UserQueueSnapshot>,
    pub active: Vec<ActiveUnit>,
    pub metrics: SchedulerMetrics,
}

impl SchedulerSnapshot {
    pub fn pending_count(&self) -> usize {
        self.pending.iter().map(|u| u.tasks.len()).sum()
    }
}

impl fmt::Display for SchedulerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} pending tasks across {} users, {} active tasks on {} workers, \
             {} completed ({} failed)",
            self.scheduler,
            self.pending_count(),
            self.pending.len(),
            self.active.len(),
            self.target_workers,
            self.metrics.total_completed(),
            self.metrics.failed,
        )?;
        for user in &self.pending {
            let tasks: Vec<String> = user
                .tasks
                .iter()
                .map(|t| format!("{}(p{})", t.task_id, t.priority))
                .collect();
            writeln!(
                f,
                "  user {}: {} pending tasks [{}]",
                user.user_id,
                user.tasks.len(),
                tasks.join(", ")
            )?;
        }
        if !self.active.is_empty() {
            let active: Vec<String> = self
                .active
                .iter()
                .map(|a| format!("{} of user {} ({})", a.task_id, a.user_id, a.state))
                .collect();
            writeln!(f, "  active tasks: [{}]", active.join(", "))?;
        }
        Ok(())
    }
}
