use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use odex_compute::scheduler::instance::{get_instance, shutdown_instance};
use odex_store::{sweeper, JsonExecutionStore};
use tracing::info;

/// Dump the current scheduler instance to the log, then tear it down.
pub fn dump_status(json: bool, out: &mut impl Write) -> Result<()> {
    let scheduler = get_instance().context("failed to start scheduler")?;
    scheduler.log_debug_data();
    if json {
        let snapshot = serde_json::to_string_pretty(&scheduler.snapshot())?;
        writeln!(out, "{}", snapshot)?;
    }
    drop(scheduler);
    shutdown_instance();
    Ok(())
}

/// Reclassify `Running` executions in the store at `data_dir` as `Crashed`.
pub fn mark_crashed(data_dir: &Path, out: &mut impl Write) -> Result<usize> {
    write!(out, "Marking running executions as crashed...")?;
    out.flush()?;

    let store = JsonExecutionStore::new(data_dir)
        .with_context(|| format!("failed to open store at {}", data_dir.display()))?;
    let changed = sweeper::mark_crashed(&store)?;
    info!(count = changed, data_dir = %data_dir.display(), "sweep finished");

    writeln!(out, " OK")?;
    Ok(changed)
}
