use std::path::{Path, PathBuf};
use std::sync::Mutex;

use odex_cleaning::AnnotatedDataset;
use odex_core::ExecutionId;
use tracing::debug;

use crate::error::StoreError;
use crate::record::{ExecutionRecord, ExecutionStatus};
use crate::{dataset_rows, ExecutionStore};

/// Filesystem-backed execution persistence.
///
/// ```text
/// {data_dir}/
///   executions/
///     42.json        ← one ExecutionRecord per execution
///   datasets/
///     42.json        ← cleaned dataset, single-array rows
/// ```
pub struct JsonExecutionStore {
    base_dir: PathBuf,
    /// Serializes read-modify-write cycles on record files.
    write_lock: Mutex<()>,
}

impl JsonExecutionStore {
    /// Open a store, ensuring the directory structure exists.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(base_dir.join("executions"))?;
        std::fs::create_dir_all(base_dir.join("datasets"))?;
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, id: ExecutionId) -> PathBuf {
        self.base_dir.join("executions").join(format!("{}.json", id))
    }

    fn dataset_path(&self, id: ExecutionId) -> PathBuf {
        self.base_dir.join("datasets").join(format!("{}.json", id))
    }

    fn write_record(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(self.record_path(record.id), json)?;
        Ok(())
    }

    fn read_record(&self, path: &Path) -> Result<ExecutionRecord, StoreError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the persisted single-array rows of a cleaned dataset.
    pub fn load_dataset(
        &self,
        id: ExecutionId,
    ) -> Result<Option<Vec<Vec<odex_cleaning::Value>>>, StoreError> {
        let path = self.dataset_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl ExecutionStore for JsonExecutionStore {
    fn insert(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if self.record_path(record.id).exists() {
            return Err(StoreError::AlreadyExists(record.id));
        }
        self.write_record(&record)
    }

    fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_record(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(self.base_dir.join("executions"))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                records.push(self.read_record(&path)?);
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn set_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        message: Option<String>,
    ) -> Result<ExecutionRecord, StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let mut record = self.get(id)?.ok_or(StoreError::NotFound(id))?;
        record.transition(status, message)?;
        self.write_record(&record)?;
        debug!(execution_id = id, status = %status, "execution status written");
        Ok(record)
    }

    fn save_dataset(
        &self,
        id: ExecutionId,
        dataset: &AnnotatedDataset<f32>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(&dataset_rows(dataset))?;
        std::fs::write(self.dataset_path(id), json)?;
        Ok(())
    }
}
