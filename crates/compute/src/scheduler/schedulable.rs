use odex_core::{TaskId, UserId};
use serde::Serialize;

/// Integer outcome of a unit's `do_work`. 0 is success; positive values are
/// defined by the unit; negative values are reserved for the scheduler.
pub type Status = i32;

pub const STATUS_OK: Status = 0;
/// The pre-hook failed, so `do_work` never ran.
pub const STATUS_PRE_HOOK_FAILED: Status = -1;
/// `do_work` panicked.
pub const STATUS_WORK_PANICKED: Status = -2;

/// A unit of admitted work.
///
/// The scheduler calls, in order and with happens-before edges between
/// them: `run_before_on_main` on the main context, `do_work` on a worker,
/// then `run_later_on_main` on the main context with the work status.
pub trait Schedulable: Send {
    fn user_id(&self) -> UserId;

    fn task_id(&self) -> TaskId;

    /// Higher runs first among the same user's ready units.
    fn priority(&self) -> i32 {
        0
    }

    /// Runs on the main context before the unit is handed to a worker.
    /// An error skips `do_work`; the post-hook then sees
    /// [`STATUS_PRE_HOOK_FAILED`].
    fn run_before_on_main(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// CPU-bound body. Runs on a worker and must not assume main-context access.
    fn do_work(&mut self) -> Status;

    /// Runs on the main context once the outcome is known. Errors are logged.
    fn run_later_on_main(&mut self, _status: Status) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Where a unit is in its execution cycle. Transitions are linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitState {
    Pending,
    PreHook,
    Running,
    PostHook,
    Done,
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitState::Pending => "pending",
            UnitState::PreHook => "pre-hook",
            UnitState::Running => "running",
            UnitState::PostHook => "post-hook",
            UnitState::Done => "done",
        };
        f.write_str(s)
    }
}
