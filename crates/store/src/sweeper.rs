use tracing::{info, warn};

use crate::error::StoreError;
use crate::ExecutionStore;

/// Reclassify executions a previous process left `Running` as `Crashed`.
///
/// Runs out of band at process start; the scheduler is not involved.
pub fn mark_crashed(store: &dyn ExecutionStore) -> Result<usize, StoreError> {
    let changed = store.mark_running_as_crashed()?;
    if changed > 0 {
        warn!(count = changed, "running executions marked as crashed");
    } else {
        info!("no running executions to mark as crashed");
    }
    Ok(changed)
}
