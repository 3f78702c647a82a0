use std::collections::BTreeMap;
use std::sync::RwLock;

use odex_cleaning::{AnnotatedDataset, Value};
use odex_core::ExecutionId;

use crate::error::StoreError;
use crate::record::{ExecutionRecord, ExecutionStatus};
use crate::{dataset_rows, ExecutionStore};

/// In-process store, used by tests and single-shot tools.
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    records: RwLock<BTreeMap<ExecutionId, ExecutionRecord>>,
    datasets: RwLock<BTreeMap<ExecutionId, Vec<Vec<Value>>>>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted single-array rows of an execution's cleaned dataset.
    pub fn dataset(&self, id: ExecutionId) -> Option<Vec<Vec<Value>>> {
        self.datasets.read().ok()?.get(&id).cloned()
    }
}

impl ExecutionStore for MemoryExecutionStore {
    fn insert(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.insert(record.id, record);
        Ok(())
    }

    fn get(&self, id: ExecutionId) -> Result<Option<ExecutionRecord>, StoreError> {
        Ok(self.records.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self.records.read().map_err(poisoned)?.values().cloned().collect())
    }

    fn set_status(
        &self,
        id: ExecutionId,
        status: ExecutionStatus,
        message: Option<String>,
    ) -> Result<ExecutionRecord, StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.transition(status, message)?;
        Ok(record.clone())
    }

    fn save_dataset(
        &self,
        id: ExecutionId,
        dataset: &AnnotatedDataset<f32>,
    ) -> Result<(), StoreError> {
        self.datasets
            .write()
            .map_err(poisoned)?
            .insert(id, dataset_rows(dataset));
        Ok(())
    }
}
