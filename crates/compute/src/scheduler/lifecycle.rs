//! The three steps of a unit's execution cycle, with failure containment.
//!
//! Nothing a unit does may take the scheduler down: hook errors and panics
//! are turned into reserved statuses or logged here.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, warn};

use super::schedulable::{Schedulable, Status, STATUS_PRE_HOOK_FAILED, STATUS_WORK_PANICKED};

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Run the pre-hook. `Err` carries the status to hand to the post-hook.
pub(crate) fn run_pre_hook(unit: &mut dyn Schedulable) -> Result<(), Status> {
    match catch_unwind(AssertUnwindSafe(|| unit.run_before_on_main())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(task_id = unit.task_id(), error = %e, "pre-hook failed, skipping work");
            Err(STATUS_PRE_HOOK_FAILED)
        }
        Err(payload) => {
            error!(
                task_id = unit.task_id(),
                panic = panic_message(payload.as_ref()),
                "pre-hook panicked, skipping work"
            );
            Err(STATUS_PRE_HOOK_FAILED)
        }
    }
}

pub(crate) fn run_work(unit: &mut dyn Schedulable) -> Status {
    match catch_unwind(AssertUnwindSafe(|| unit.do_work())) {
        Ok(status) => status,
        Err(payload) => {
            error!(
                task_id = unit.task_id(),
                panic = panic_message(payload.as_ref()),
                "do_work panicked"
            );
            STATUS_WORK_PANICKED
        }
    }
}

pub(crate) fn run_post_hook(unit: &mut dyn Schedulable, status: Status) {
    match catch_unwind(AssertUnwindSafe(|| unit.run_later_on_main(status))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(task_id = unit.task_id(), status, error = %e, "post-hook failed");
        }
        Err(payload) => {
            error!(
                task_id = unit.task_id(),
                status,
                panic = panic_message(payload.as_ref()),
                "post-hook panicked"
            );
        }
    }
}
