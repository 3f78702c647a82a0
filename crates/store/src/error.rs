use odex_core::ExecutionId;
use thiserror::Error;

use crate::record::ExecutionStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Execution {0} not found")]
    NotFound(ExecutionId),
    #[error("Execution {0} already exists")]
    AlreadyExists(ExecutionId),
    #[error("Execution {id} already finished with status {status}")]
    AlreadyTerminal {
        id: ExecutionId,
        status: ExecutionStatus,
    },
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}
