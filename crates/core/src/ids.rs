/// Owner of a dataset and of the work units scheduled on its behalf.
pub type UserId = i64;

/// Identifier of a scheduled task (one experiment execution).
pub type TaskId = i64;

/// Identifier of a persisted execution record.
pub type ExecutionId = i64;

/// Origin-row identity carried through dataset cleaning.
pub type RowId = i64;
