use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::scheduler::lifecycle;
use crate::scheduler::queue::PendingUnit;
use crate::scheduler::schedulable::{Schedulable, Status, UnitState};

use super::core::Shared;

pub(super) enum MainMessage {
    /// A dispatched unit, ready for its pre-hook.
    Before(PendingUnit),
    /// A unit back from its worker, ready for its post-hook.
    After {
        seq: u64,
        unit: Box<dyn Schedulable>,
        status: Status,
        elapsed: Duration,
    },
    Stop,
}

/// The main context: runs every hook, one at a time, on this thread.
pub(super) fn run_main_context(
    shared: Arc<Shared>,
    pool: Arc<rayon::ThreadPool>,
    inbox: Receiver<MainMessage>,
    outbox: Sender<MainMessage>,
) {
    while let Ok(message) = inbox.recv() {
        match message {
            MainMessage::Before(pending) => {
                let PendingUnit { seq, mut unit, .. } = pending;
                shared.set_unit_state(seq, UnitState::PreHook);
                match lifecycle::run_pre_hook(unit.as_mut()) {
                    Ok(()) => {
                        shared.set_unit_state(seq, UnitState::Running);
                        let outbox = outbox.clone();
                        pool.spawn(move || {
                            let start = Instant::now();
                            let status = lifecycle::run_work(unit.as_mut());
                            let elapsed = start.elapsed();
                            // the main context outlives every worker job
                            let _ = outbox.send(MainMessage::After {
                                seq,
                                unit,
                                status,
                                elapsed,
                            });
                        });
                    }
                    Err(status) => finish(&shared, seq, unit, status, Duration::ZERO),
                }
            }
            MainMessage::After {
                seq,
                unit,
                status,
                elapsed,
            } => finish(&shared, seq, unit, status, elapsed),
            MainMessage::Stop => break,
        }
    }
    debug!("main context stopped");
}

fn finish(
    shared: &Shared,
    seq: u64,
    mut unit: Box<dyn Schedulable>,
    status: Status,
    elapsed: Duration,
) {
    shared.set_unit_state(seq, UnitState::PostHook);
    lifecycle::run_post_hook(unit.as_mut(), status);

    let user_id = unit.user_id();
    debug!(user_id, task_id = unit.task_id(), status, "unit done");
    shared.with_metrics(|m| m.record_completion(user_id, elapsed, status));
    drop(unit);

    shared.lock_state().in_flight.remove(&seq);
    shared.wake.notify_all();
}
