//! Fair multi-tenant scheduler for background work units.
//!
//! Work arrives as [`Schedulable`] units tagged with a user, a task and a
//! priority. Users are served round-robin; within a user, higher priority
//! goes first and ties keep insertion order. Each unit runs its pre-hook on
//! the single-threaded main context, its `do_work` body on a bounded worker
//! pool, then its post-hook back on the main context.

pub mod debug;
pub mod instance;
mod lifecycle;
pub mod metrics;
pub mod queue;
pub mod runner;
pub mod schedulable;
pub mod snapshot;
pub mod tasks;
pub mod types;

use odex_core::TaskId;
use tracing::info;

pub use debug::DebugScheduler;
pub use metrics::SchedulerMetrics;
pub use runner::UserRoundRobinScheduler;
pub use schedulable::{
    Schedulable, Status, UnitState, STATUS_OK, STATUS_PRE_HOOK_FAILED, STATUS_WORK_PANICKED,
};
pub use snapshot::SchedulerSnapshot;
pub use tasks::{CleaningReport, CleaningTask};
pub use types::{SchedulerConfig, SchedulerError};

/// The capability set every scheduler variant offers.
pub trait Scheduler: Send + Sync {
    /// Admit a unit. Returns once it is queued; never waits for execution.
    fn schedule(&self, unit: Box<dyn Schedulable>);

    /// Best-effort removal of pending units for `task_id`. Units already
    /// dispatched are not affected. Returns how many were removed.
    fn abort_by_task(&self, task_id: TaskId) -> usize;

    /// Point-in-time view of queues and in-flight units.
    fn snapshot(&self) -> SchedulerSnapshot;

    /// Maximum number of `do_work` bodies running at once. 0 = synchronous.
    fn targeted_worker_count(&self) -> usize;

    /// Stop accepting work, drop pending units and wait for in-flight ones.
    fn shutdown(&self);

    /// Log the snapshot at INFO, one line per entry.
    fn log_debug_data(&self) {
        for line in self.snapshot().to_string().lines() {
            info!("{}", line);
        }
    }
}
