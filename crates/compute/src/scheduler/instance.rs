//! Process-wide scheduler instance.
//!
//! Built lazily from the environment on first use. Tests and embedding
//! binaries replace it with [`set_instance`], typically with a
//! [`DebugScheduler`](super::DebugScheduler).

use std::sync::{Arc, RwLock};

use odex_core::Config;
use tracing::info;

use super::runner::UserRoundRobinScheduler;
use super::types::{SchedulerConfig, SchedulerError};
use super::Scheduler;

static INSTANCE: RwLock<Option<Arc<dyn Scheduler>>> = RwLock::new(None);

/// The current instance, starting a [`UserRoundRobinScheduler`] configured
/// from the environment if none is installed.
pub fn get_instance() -> Result<Arc<dyn Scheduler>, SchedulerError> {
    if let Some(existing) = INSTANCE.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
        return Ok(Arc::clone(existing));
    }

    let mut slot = INSTANCE.write().unwrap_or_else(|e| e.into_inner());
    // another caller may have won the race for the write lock
    if let Some(existing) = slot.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let config = Config::from_env();
    let scheduler: Arc<dyn Scheduler> = Arc::new(UserRoundRobinScheduler::new(
        SchedulerConfig::from(&config.scheduler),
    )?);
    *slot = Some(Arc::clone(&scheduler));
    Ok(scheduler)
}

/// Install `scheduler` as the process instance and return the previous one.
/// The previous instance is not shut down.
pub fn set_instance(scheduler: Arc<dyn Scheduler>) -> Option<Arc<dyn Scheduler>> {
    INSTANCE
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .replace(scheduler)
}

/// Remove the process instance and shut it down. Returns `false` when no
/// instance was installed.
pub fn shutdown_instance() -> bool {
    let previous = INSTANCE.write().unwrap_or_else(|e| e.into_inner()).take();
    match previous {
        Some(scheduler) => {
            info!("Shutting down scheduler instance");
            scheduler.shutdown();
            true
        }
        None => false,
    }
}
