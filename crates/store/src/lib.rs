//! Persistence gateway for experiment executions.
//!
//! The scheduler's post-hooks record task outcomes through an
//! [`ExecutionStore`]; the crashed-job [`sweeper`] reclassifies executions
//! left `Running` by a previous process.

pub mod error;
pub mod json;
pub mod memory;
pub mod record;
pub mod sweeper;

pub use error::StoreError;
pub use json::JsonExecutionStore;
pub use memory::MemoryExecutionStore;
pub use record::{ExecutionRecord, ExecutionStatus};

use odex_cleaning::AnnotatedDataset;
use odex_core::ExecutionId;

/// Synchronous storage of execution records.
///
/// A terminal status is written at most once per execution; a second
/// terminal write fails with [`StoreError::AlreadyTerminal`].
pub trait ExecutionStore: Send + Sync {
    fn insert(&self, record: ExecutionRecord) -> Result<(), StoreError>;

    fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, StoreError>;

    /// All records, ordered by id.
    fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Move an execution to `status`, returning the updated record.
    fn set_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        message: Option<String>,
    ) -> Result<ExecutionRecord, StoreError>;

    /// Persist the cleaned dataset of an execution.
    fn save_dataset(
        &self,
        id: ExecutionId,
        dataset: &AnnotatedDataset<f32>,
    ) -> Result<(), StoreError>;

    /// Reclassify every `Running` execution as `Crashed`. Returns how many changed.
    fn mark_running_as_crashed(&self) -> Result<usize, StoreError> {
        let mut changed = 0;
        for record in self.list()? {
            if record.status == ExecutionStatus::Running {
                self.set_status(
                    record.id,
                    ExecutionStatus::Crashed,
                    Some("process stopped while the execution was running".to_string()),
                )?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// Row-major rows of the single-array projection, as persisted.
pub(crate) fn dataset_rows(dataset: &AnnotatedDataset<f32>) -> Vec<Vec<odex_cleaning::Value>> {
    dataset
        .to_single_array()
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect()
}
