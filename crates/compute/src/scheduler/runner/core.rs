use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::thread::JoinHandle;

use odex_core::TaskId;
use tracing::{debug, error, info, warn};

use crate::scheduler::metrics::SchedulerMetrics;
use crate::scheduler::queue::{PendingUnit, ReadyQueues};
use crate::scheduler::schedulable::{Schedulable, UnitState};
use crate::scheduler::snapshot::{ActiveUnit, SchedulerSnapshot};
use crate::scheduler::types::{SchedulerConfig, SchedulerError};
use crate::scheduler::Scheduler;

use super::dispatch::run_dispatcher;
use super::main_context::run_main_context;

/// Everything the queue mutex covers.
pub(super) struct DispatchState {
    pub(super) queues: ReadyQueues,
    /// Dispatched units by admission sequence, until their post-hook returns.
    pub(super) in_flight: BTreeMap<u64, ActiveUnit>,
    pub(super) shutting_down: bool,
}

pub(super) struct Shared {
    pub(super) state: Mutex<DispatchState>,
    /// Signalled on admission, on completion and on shutdown.
    pub(super) wake: Condvar,
    pub(super) metrics: RwLock<SchedulerMetrics>,
    pub(super) workers: usize,
}

impl Shared {
    /// Hooks run outside the lock, so a poisoned lock still holds
    /// consistent queue state.
    pub(super) fn lock_state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn wait<'a>(
        &self,
        guard: MutexGuard<'a, DispatchState>,
    ) -> MutexGuard<'a, DispatchState> {
        self.wake.wait(guard).unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn set_unit_state(&self, seq: u64, state: UnitState) {
        if let Some(active) = self.lock_state().in_flight.get_mut(&seq) {
            active.state = state;
        }
    }

    pub(super) fn with_metrics(&self, f: impl FnOnce(&mut SchedulerMetrics)) {
        if let Ok(mut metrics) = self.metrics.write() {
            f(&mut metrics);
        }
    }
}

/// The production scheduler.
///
/// Owns a dispatcher thread, a main-context thread on which every hook
/// runs, and a `rayon` pool of `W` workers for `do_work` bodies. At most
/// `W` units are between dispatch and the end of their post-hook at once.
pub struct UserRoundRobinScheduler {
    shared: Arc<Shared>,
    pool: Arc<rayon::ThreadPool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl UserRoundRobinScheduler {
    /// Build the worker pool and start the dispatcher and main context.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let workers = config.resolved_worker_threads();
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("odex-worker-{}", i))
                .build()?,
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(DispatchState {
                queues: ReadyQueues::new(),
                in_flight: BTreeMap::new(),
                shutting_down: false,
            }),
            wake: Condvar::new(),
            metrics: RwLock::new(SchedulerMetrics::default()),
            workers,
        });

        let (main_tx, main_rx) = mpsc::channel();

        let main = {
            let shared = Arc::clone(&shared);
            let pool = Arc::clone(&pool);
            let main_tx = main_tx.clone();
            std::thread::Builder::new()
                .name("odex-main".to_string())
                .spawn(move || run_main_context(shared, pool, main_rx, main_tx))?
        };
        let dispatcher = {
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("odex-dispatcher".to_string())
                .spawn(move || run_dispatcher(shared, main_tx))?
        };

        info!("Scheduler starting with {} workers", workers);
        Ok(Self {
            shared,
            pool,
            threads: Mutex::new(vec![dispatcher, main]),
        })
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.shared
            .metrics
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Scheduler for UserRoundRobinScheduler {
    fn schedule(&self, unit: Box<dyn Schedulable>) {
        let (user_id, task_id, priority) = (unit.user_id(), unit.task_id(), unit.priority());
        {
            let mut state = self.shared.lock_state();
            if state.shutting_down {
                warn!(user_id, task_id, "scheduler is shutting down, unit dropped");
                return;
            }
            state.queues.push(unit);
        }
        self.shared.wake.notify_all();
        debug!(user_id, task_id, priority, "unit scheduled");
    }

    fn abort_by_task(&self, task_id: TaskId) -> usize {
        let removed: Vec<PendingUnit> = self.shared.lock_state().queues.remove_task(task_id);
        if !removed.is_empty() {
            info!(task_id, count = removed.len(), "pending units aborted");
        }
        removed.len()
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        let (pending, active) = {
            let state = self.shared.lock_state();
            (
                state.queues.snapshot(),
                state.in_flight.values().cloned().collect(),
            )
        };
        SchedulerSnapshot {
            scheduler: "UserRoundRobinScheduler",
            target_workers: self.shared.workers,
            pending,
            active,
            metrics: self.metrics(),
        }
    }

    fn targeted_worker_count(&self) -> usize {
        self.shared.workers
    }

    fn shutdown(&self) {
        {
            let mut state = self.shared.lock_state();
            if !state.shutting_down {
                info!("Scheduler shutdown requested");
            }
            state.shutting_down = true;
        }
        self.shared.wake.notify_all();

        let handles = match self.threads.lock() {
            Ok(mut threads) => std::mem::take(&mut *threads),
            Err(e) => std::mem::take(&mut *e.into_inner()),
        };
        // Called from a hook or one of our workers: the dispatcher waits on
        // the caller's own unit, so the threads wind down on their own.
        // Threads of other rayon pools join like any outside caller.
        let current = std::thread::current().id();
        if self.pool.current_thread_index().is_some()
            || handles.iter().any(|h| h.thread().id() == current)
        {
            return;
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("scheduler thread panicked during shutdown");
            }
        }
    }
}

impl Drop for UserRoundRobinScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
