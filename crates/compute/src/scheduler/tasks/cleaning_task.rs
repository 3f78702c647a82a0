use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use odex_cleaning::{AnnotatedDataset, CleaningError, CleaningPipeline};
use odex_core::{ExecutionId, TaskId, UserId};
use odex_store::{ExecutionStatus, ExecutionStore};
use tracing::{error, info, warn};

use crate::scheduler::schedulable::{Schedulable, Status, STATUS_OK};

/// The pipeline produced a dataset with no rows or no columns.
pub const STATUS_RESULT_EMPTY: Status = 1;
/// The pipeline result held cells that are not representable as `f32`.
pub const STATUS_RESULT_NOT_FLOAT32: Status = 2;
/// Any other cleaning failure, e.g. a step rejecting its input.
pub const STATUS_CLEANING_FAILED: Status = 3;

fn status_for(error: &CleaningError) -> Status {
    match error {
        CleaningError::CleaningResultEmpty => STATUS_RESULT_EMPTY,
        CleaningError::CleaningResultNotFloat32 { .. } => STATUS_RESULT_NOT_FLOAT32,
        _ => STATUS_CLEANING_FAILED,
    }
}

/// Outcome of one cleaning execution, sent once its post-hook has run.
#[derive(Debug, Clone)]
pub struct CleaningReport {
    pub execution_id: ExecutionId,
    pub task_id: TaskId,
    pub status: Status,
    /// Failure text recorded on the execution, if any.
    pub message: Option<String>,
    pub dataset: Option<AnnotatedDataset<f32>>,
}

/// Cleans one uploaded dataset for an experiment execution.
///
/// The pre-hook marks the execution `Running`; the pipeline runs on a
/// worker; the post-hook records `Finished` with the cleaned dataset or
/// `Error` with the failure message.
pub struct CleaningTask {
    execution_id: ExecutionId,
    user_id: UserId,
    task_id: TaskId,
    priority: i32,
    input: Option<AnnotatedDataset>,
    pipeline: Arc<CleaningPipeline>,
    store: Arc<dyn ExecutionStore>,
    outcome: Option<Result<AnnotatedDataset<f32>, CleaningError>>,
    reports: Option<Sender<CleaningReport>>,
}

impl CleaningTask {
    pub fn new(
        execution_id: ExecutionId,
        user_id: UserId,
        task_id: TaskId,
        input: AnnotatedDataset,
        pipeline: Arc<CleaningPipeline>,
        store: Arc<dyn ExecutionStore>,
    ) -> Self {
        Self {
            execution_id,
            user_id,
            task_id,
            priority: 0,
            input: Some(input),
            pipeline,
            store,
            outcome: None,
            reports: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Send a [`CleaningReport`] on `reports` after the post-hook.
    pub fn with_reports(mut self, reports: Sender<CleaningReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    fn record_outcome(
        &self,
        status: Status,
        dataset: Option<&AnnotatedDataset<f32>>,
        message: Option<String>,
    ) -> anyhow::Result<()> {
        let id = self.execution_id;
        match (status, dataset) {
            (STATUS_OK, Some(dataset)) => {
                // A failed save still has to leave the execution terminal.
                if let Err(e) = self.store.save_dataset(id, dataset) {
                    let message = format!(
                        "Error: the cleaned dataset could not be saved; \
                         reference error message: {}",
                        e
                    );
                    self.store
                        .set_status(id, ExecutionStatus::Error, Some(message))
                        .with_context(|| format!("Failed to record error on execution {}", id))?;
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to save dataset of execution {}", id)));
                }
                self.store
                    .set_status(id, ExecutionStatus::Finished, None)
                    .with_context(|| format!("Failed to finish execution {}", id))?;
            }
            _ => {
                self.store
                    .set_status(id, ExecutionStatus::Error, message)
                    .with_context(|| format!("Failed to record error on execution {}", id))?;
            }
        }
        Ok(())
    }
}

impl Schedulable for CleaningTask {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn run_before_on_main(&mut self) -> anyhow::Result<()> {
        self.store
            .set_status(self.execution_id, ExecutionStatus::Running, None)
            .with_context(|| format!("Failed to start execution {}", self.execution_id))?;
        Ok(())
    }

    fn do_work(&mut self) -> Status {
        let Some(input) = self.input.take() else {
            warn!(execution_id = self.execution_id, "cleaning input already consumed");
            return STATUS_CLEANING_FAILED;
        };

        let start = Instant::now();
        let result = self.pipeline.run(input);
        let status = match &result {
            Ok(dataset) => {
                info!(
                    execution_id = self.execution_id,
                    rows = dataset.n_rows(),
                    columns = dataset.n_columns(),
                    "Dataset cleaned in {:.1}ms",
                    start.elapsed().as_secs_f64() * 1000.0
                );
                STATUS_OK
            }
            Err(e) => {
                warn!(execution_id = self.execution_id, error = %e, "cleaning failed");
                status_for(e)
            }
        };
        self.outcome = Some(result);
        status
    }

    fn run_later_on_main(&mut self, status: Status) -> anyhow::Result<()> {
        let (mut dataset, mut message) = match self.outcome.take() {
            Some(Ok(dataset)) => (Some(dataset), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, Some(format!("Error: cleaning did not complete (status {})", status))),
        };

        let recorded = self.record_outcome(status, dataset.as_ref(), message.clone());
        if let (Err(e), Some(_)) = (&recorded, &dataset) {
            error!(execution_id = self.execution_id, error = %e, "cleaned dataset not recorded");
            dataset = None;
            message = Some(format!("{:#}", e));
        }

        if let Some(reports) = &self.reports {
            let report = CleaningReport {
                execution_id: self.execution_id,
                task_id: self.task_id,
                status,
                message,
                dataset,
            };
            if reports.send(report).is_err() {
                warn!(execution_id = self.execution_id, "report receiver dropped");
            }
        }
        recorded
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::mpsc;

    use ndarray::array;
    use odex_cleaning::{CleaningStep, Value};
    use odex_core::TaskErrorMessages;
    use odex_store::{ExecutionRecord, MemoryExecutionStore, StoreError};

    use super::*;
    use crate::scheduler::{DebugScheduler, Scheduler};

    #[derive(Debug)]
    struct DropAllRows;

    impl CleaningStep for DropAllRows {
        fn name(&self) -> &str {
            "drop_all_rows"
        }

        fn do_cleaning(&self, input: &AnnotatedDataset) -> Result<AnnotatedDataset, CleaningError> {
            Ok(input.select_rows(&[]))
        }
    }

    fn dataset() -> AnnotatedDataset {
        AnnotatedDataset::new(
            array![[Value::from(1.0), Value::from(2.0)], [Value::from(3.0), Value::from(4.0)]],
            vec!["a".into(), "b".into()],
            vec![0, 1],
        )
        .unwrap()
    }

    fn store_with(id: ExecutionId) -> Arc<MemoryExecutionStore> {
        let store = Arc::new(MemoryExecutionStore::new());
        store.insert(ExecutionRecord::new(id, 1, 10)).unwrap();
        store
    }

    fn run(task: CleaningTask) -> CleaningReport {
        let (tx, rx) = mpsc::channel();
        let scheduler = DebugScheduler::new();
        scheduler.schedule(Box::new(task.with_reports(tx)));
        assert!(scheduler.next_sched());
        rx.try_recv().unwrap()
    }

    #[test]
    fn successful_run_finishes_execution() {
        let store = store_with(1);
        let pipeline = Arc::new(CleaningPipeline::new());
        let task = CleaningTask::new(1, 1, 10, dataset(), pipeline, store.clone());
        let report = run(task);

        assert_eq!(report.status, STATUS_OK);
        assert!(report.message.is_none());
        assert_eq!(report.dataset.as_ref().map(|d| d.n_rows()), Some(2));
        assert_eq!(store.get(1).unwrap().unwrap().status, ExecutionStatus::Finished);
        assert!(store.dataset(1).is_some());
    }

    #[test]
    fn empty_result_reaches_post_hook_as_nonzero_status() {
        let store = store_with(2);
        let pipeline = CleaningPipeline::new().with_step(DropAllRows);
        let task = CleaningTask::new(2, 1, 10, dataset(), Arc::new(pipeline), store.clone());
        let report = run(task);

        assert_eq!(report.status, STATUS_RESULT_EMPTY);
        assert_eq!(report.message.as_deref(), Some(TaskErrorMessages::CLEANING_RESULT_EMPTY));
        assert!(report.dataset.is_none());

        let record = store.get(2).unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Error);
        assert_eq!(record.message.as_deref(), Some(TaskErrorMessages::CLEANING_RESULT_EMPTY));
    }

    /// Delegates to a memory store but rejects every dataset write.
    struct FailingSaves(MemoryExecutionStore);

    impl ExecutionStore for FailingSaves {
        fn insert(&self, record: ExecutionRecord) -> Result<(), StoreError> {
            self.0.insert(record)
        }

        fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, StoreError> {
            self.0.get(id)
        }

        fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
            self.0.list()
        }

        fn set_status(
            &self,
            id: ExecutionId,
            status: ExecutionStatus,
            message: Option<String>,
        ) -> Result<ExecutionRecord, StoreError> {
            self.0.set_status(id, status, message)
        }

        fn save_dataset(
            &self,
            _id: ExecutionId,
            _dataset: &AnnotatedDataset<f32>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
        }
    }

    #[test]
    fn failed_save_leaves_execution_in_error() {
        let store = Arc::new(FailingSaves(MemoryExecutionStore::new()));
        store.insert(ExecutionRecord::new(4, 1, 10)).unwrap();
        let pipeline = Arc::new(CleaningPipeline::new());
        let task = CleaningTask::new(4, 1, 10, dataset(), pipeline, store.clone());
        let report = run(task);

        assert!(report.dataset.is_none());
        assert!(report.message.as_deref().unwrap().contains("disk full"));

        let record = store.get(4).unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Error);
        assert!(record.message.as_deref().unwrap().contains("disk full"));
    }

    #[test]
    fn missing_execution_fails_pre_hook() {
        let store = Arc::new(MemoryExecutionStore::new());
        let pipeline = Arc::new(CleaningPipeline::new());
        let task = CleaningTask::new(3, 1, 10, dataset(), pipeline, store.clone());
        let report = run(task);

        assert_eq!(report.status, crate::scheduler::STATUS_PRE_HOOK_FAILED);
        assert!(report.dataset.is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(status_for(&CleaningError::CleaningResultEmpty), STATUS_RESULT_EMPTY);
        assert_eq!(
            status_for(&CleaningError::CleaningResultNotFloat32 { offending: vec![] }),
            STATUS_RESULT_NOT_FLOAT32
        );
        assert_eq!(
            status_for(&CleaningError::step("standardiser", "bad")),
            STATUS_CLEANING_FAILED
        );
    }
}
