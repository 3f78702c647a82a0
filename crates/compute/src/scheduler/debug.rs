//! Synchronous scheduler for tests and single-process debugging.
//!
//! There are no workers: the whole cycle of a unit runs on the thread that
//! drives it, so the caller's thread is the main context. In deferred mode
//! units wait until `next_sched` or `run_pending` is called; in inline mode
//! `schedule` drives the queue itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use odex_core::{TaskId, UserId};
use tracing::{debug, info, warn};

use super::lifecycle;
use super::metrics::SchedulerMetrics;
use super::queue::ReadyQueues;
use super::schedulable::{Schedulable, UnitState};
use super::snapshot::{ActiveUnit, SchedulerSnapshot};
use super::Scheduler;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
pub struct DebugScheduler {
    queues: Mutex<ReadyQueues>,
    active: Mutex<Option<ActiveUnit>>,
    metrics: Mutex<SchedulerMetrics>,
    inline: bool,
    draining: AtomicBool,
    shut_down: AtomicBool,
}

impl DebugScheduler {
    /// Deferred mode: nothing runs until the caller drives the queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline mode: `schedule` runs the queue to empty before returning.
    /// A unit scheduled from inside a hook runs after the current one.
    pub fn inline() -> Self {
        Self {
            inline: true,
            ..Self::default()
        }
    }

    /// Run one full cycle for the next unit in round-robin order.
    /// Returns `false` when nothing was pending.
    pub fn next_sched(&self) -> bool {
        let Some(pending) = lock(&self.queues).pop_next() else {
            return false;
        };
        let mut unit = pending.unit;
        let (user_id, task_id) = (pending.user_id, pending.task_id);
        lock(&self.metrics).record_dispatch(user_id);

        self.set_active(user_id, task_id, UnitState::PreHook);
        let start = Instant::now();
        let status = match lifecycle::run_pre_hook(unit.as_mut()) {
            Ok(()) => {
                self.set_active(user_id, task_id, UnitState::Running);
                lifecycle::run_work(unit.as_mut())
            }
            Err(status) => status,
        };
        let elapsed = start.elapsed();

        self.set_active(user_id, task_id, UnitState::PostHook);
        lifecycle::run_post_hook(unit.as_mut(), status);
        *lock(&self.active) = None;

        lock(&self.metrics).record_completion(user_id, elapsed, status);
        debug!(user_id, task_id, status, "unit done");
        true
    }

    /// Drive the queue until it is empty, including units admitted along
    /// the way. Returns how many cycles ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.next_sched() {
            ran += 1;
        }
        ran
    }

    /// Number of queued units.
    pub fn pending(&self) -> usize {
        lock(&self.queues).len()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        lock(&self.metrics).clone()
    }

    fn set_active(&self, user_id: UserId, task_id: TaskId, state: UnitState) {
        *lock(&self.active) = Some(ActiveUnit {
            user_id,
            task_id,
            state,
        });
    }

    fn drain_inline(&self) {
        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // an outer call on the stack is already driving the queue
                return;
            }
            self.run_pending();
            self.draining.store(false, Ordering::Release);
            if self.pending() == 0 {
                return;
            }
        }
    }
}

impl Scheduler for DebugScheduler {
    fn schedule(&self, unit: Box<dyn Schedulable>) {
        if self.shut_down.load(Ordering::Acquire) {
            warn!(
                user_id = unit.user_id(),
                task_id = unit.task_id(),
                "scheduler is shut down, unit dropped"
            );
            return;
        }
        lock(&self.queues).push(unit);
        if self.inline {
            self.drain_inline();
        }
    }

    fn abort_by_task(&self, task_id: TaskId) -> usize {
        let removed = lock(&self.queues).remove_task(task_id);
        if !removed.is_empty() {
            info!(task_id, count = removed.len(), "pending units aborted");
        }
        removed.len()
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            scheduler: "DebugScheduler",
            target_workers: 0,
            pending: lock(&self.queues).snapshot(),
            active: lock(&self.active).iter().cloned().collect(),
            metrics: self.metrics(),
        }
    }

    fn targeted_worker_count(&self) -> usize {
        0
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        let dropped = lock(&self.queues).drain();
        if !dropped.is_empty() {
            info!(count = dropped.len(), "pending units dropped at shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::scheduler::schedulable::{Status, STATUS_PRE_HOOK_FAILED, STATUS_WORK_PANICKED};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        user: UserId,
        task: TaskId,
        log: Log,
        status: Status,
        fail_pre: bool,
        panic_work: bool,
        follow_up: Option<(Arc<DebugScheduler>, TaskId)>,
    }

    fn recorder(user: UserId, task: TaskId, log: &Log) -> Recorder {
        Recorder {
            user,
            task,
            log: Arc::clone(log),
            status: 0,
            fail_pre: false,
            panic_work: false,
            follow_up: None,
        }
    }

    impl Schedulable for Recorder {
        fn user_id(&self) -> UserId {
            self.user
        }

        fn task_id(&self) -> TaskId {
            self.task
        }

        fn run_before_on_main(&mut self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("pre {}", self.task));
            if self.fail_pre {
                anyhow::bail!("no");
            }
            Ok(())
        }

        fn do_work(&mut self) -> Status {
            self.log.lock().unwrap().push(format!("work {}", self.task));
            if self.panic_work {
                panic!("boom");
            }
            self.status
        }

        fn run_later_on_main(&mut self, status: Status) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("post {} {}", self.task, status));
            if let Some((scheduler, task)) = self.follow_up.take() {
                scheduler.schedule(Box::new(recorder(self.user, task, &self.log)));
            }
            Ok(())
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn deferred_runs_one_unit_per_call() {
        let scheduler = DebugScheduler::new();
        let log = Log::default();
        scheduler.schedule(Box::new(recorder(1, 1, &log)));
        scheduler.schedule(Box::new(recorder(1, 2, &log)));
        assert!(entries(&log).is_empty());
        assert_eq!(scheduler.pending(), 2);

        assert!(scheduler.next_sched());
        assert_eq!(entries(&log), vec!["pre 1", "work 1", "post 1 0"]);
        assert!(scheduler.next_sched());
        assert_eq!(
            entries(&log),
            vec!["pre 1", "work 1", "post 1 0", "pre 2", "work 2", "post 2 0"]
        );
        assert!(!scheduler.next_sched());
    }

    #[test]
    fn deferred_follows_round_robin_order() {
        let scheduler = DebugScheduler::new();
        let log = Log::default();
        for (user, task) in [(1, 10), (1, 11), (1, 12), (2, 20), (2, 21), (3, 30)] {
            scheduler.schedule(Box::new(recorder(user, task, &log)));
        }
        assert_eq!(scheduler.run_pending(), 6);

        let order: Vec<String> = entries(&log)
            .into_iter()
            .filter(|e| e.starts_with("work"))
            .collect();
        assert_eq!(
            order,
            vec!["work 10", "work 20", "work 30", "work 11", "work 21", "work 12"]
        );
    }

    #[test]
    fn inline_runs_before_schedule_returns() {
        let scheduler = DebugScheduler::inline();
        let log = Log::default();
        let mut unit = recorder(1, 5, &log);
        unit.status = 3;
        scheduler.schedule(Box::new(unit));
        assert_eq!(entries(&log), vec!["pre 5", "work 5", "post 5 3"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn inline_defers_units_scheduled_from_hooks() {
        let scheduler = Arc::new(DebugScheduler::inline());
        let log = Log::default();
        let mut unit = recorder(1, 1, &log);
        unit.follow_up = Some((Arc::clone(&scheduler), 2));
        scheduler.schedule(Box::new(unit));

        assert_eq!(
            entries(&log),
            vec!["pre 1", "work 1", "post 1 0", "pre 2", "work 2", "post 2 0"]
        );
    }

    #[test]
    fn reserved_statuses_reach_the_post_hook() {
        let scheduler = DebugScheduler::new();
        let log = Log::default();
        let mut refused = recorder(1, 1, &log);
        refused.fail_pre = true;
        let mut crashing = recorder(1, 2, &log);
        crashing.panic_work = true;
        scheduler.schedule(Box::new(refused));
        scheduler.schedule(Box::new(crashing));
        scheduler.run_pending();

        assert_eq!(
            entries(&log),
            vec![
                "pre 1".to_string(),
                format!("post 1 {}", STATUS_PRE_HOOK_FAILED),
                "pre 2".to_string(),
                "work 2".to_string(),
                format!("post 2 {}", STATUS_WORK_PANICKED),
            ]
        );
        assert_eq!(scheduler.metrics().failed, 2);
    }

    #[test]
    fn abort_and_shutdown_drop_pending_units() {
        let scheduler = DebugScheduler::new();
        let log = Log::default();
        scheduler.schedule(Box::new(recorder(1, 7, &log)));
        scheduler.schedule(Box::new(recorder(2, 7, &log)));
        scheduler.schedule(Box::new(recorder(2, 8, &log)));

        assert_eq!(scheduler.abort_by_task(7), 2);
        assert_eq!(scheduler.pending(), 1);

        scheduler.shutdown();
        assert_eq!(scheduler.pending(), 0);
        scheduler.schedule(Box::new(recorder(3, 9, &log)));
        assert_eq!(scheduler.pending(), 0);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn snapshot_reports_zero_workers() {
        let scheduler = DebugScheduler::new();
        let log = Log::default();
        scheduler.schedule(Box::new(recorder(4, 40, &log)));

        assert_eq!(scheduler.targeted_worker_count(), 0);
        let text = scheduler.snapshot().to_string();
        assert!(text.starts_with(
            "DebugScheduler: 1 pending tasks across 1 users, 0 active tasks on 0 workers"
        ));
        assert!(text.contains("user 4: 1 pending tasks [40(p0)]"));
    }
}
