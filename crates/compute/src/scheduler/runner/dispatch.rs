use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::scheduler::queue::PendingUnit;
use crate::scheduler::schedulable::UnitState;
use crate::scheduler::snapshot::ActiveUnit;

use super::core::Shared;
use super::main_context::MainMessage;

/// Dispatcher loop. Parks while every queue is empty or every slot is
/// taken; never holds the queue lock while a hook or `do_work` runs.
pub(super) fn run_dispatcher(shared: Arc<Shared>, main_tx: Sender<MainMessage>) {
    loop {
        let next = {
            let mut state = shared.lock_state();
            loop {
                if state.shutting_down {
                    break None;
                }
                if state.in_flight.len() < shared.workers {
                    if let Some(pending) = state.queues.pop_next() {
                        state.in_flight.insert(
                            pending.seq,
                            ActiveUnit {
                                user_id: pending.user_id,
                                task_id: pending.task_id,
                                state: UnitState::Pending,
                            },
                        );
                        break Some(pending);
                    }
                }
                state = shared.wait(state);
            }
        };
        let Some(pending) = next else { break };

        shared.with_metrics(|m| m.record_dispatch(pending.user_id));
        debug!(
            user_id = pending.user_id,
            task_id = pending.task_id,
            priority = pending.priority,
            "unit dispatched"
        );

        let seq = pending.seq;
        if main_tx.send(MainMessage::Before(pending)).is_err() {
            error!("main context is gone, dispatcher stopping");
            shared.lock_state().in_flight.remove(&seq);
            break;
        }
    }

    drain_and_stop(&shared, &main_tx);
}

/// Drop units that never reached their pre-hook, wait for in-flight units,
/// then stop the main context.
fn drain_and_stop(shared: &Shared, main_tx: &Sender<MainMessage>) {
    let dropped: Vec<PendingUnit> = {
        let mut state = shared.lock_state();
        let dropped = state.queues.drain();
        while !state.in_flight.is_empty() {
            state = shared.wait(state);
        }
        dropped
    };
    if !dropped.is_empty() {
        info!(count = dropped.len(), "pending units dropped at shutdown");
    }
    drop(dropped);

    let _ = main_tx.send(MainMessage::Stop);
    debug!("dispatcher stopped");
}
