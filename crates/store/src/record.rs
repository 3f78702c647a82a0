use std::fmt;

use chrono::{DateTime, Utc};
use odex_core::{ExecutionId, TaskId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Finished,
    Error,
    Crashed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Finished | ExecutionStatus::Error | ExecutionStatus::Crashed
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Finished => "finished",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// Persisted state of one experiment execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub status: ExecutionStatus,
    /// Failure text shown to the user, if any.
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(id: ExecutionId, user_id: UserId, task_id: TaskId) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            task_id,
            status: ExecutionStatus::Pending,
            message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn transition(
        &mut self,
        status: ExecutionStatus,
        message: Option<String>,
    ) -> Result<(), StoreError> {
        if self.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        if message.is_some() {
            self.message = message;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}
