use odex_core::config::SchedulerSettings;
use serde::{Deserialize, Serialize};

/// Scheduler configuration, typically built from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. 0 = num_cpus.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_worker_threads() -> usize { 0 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            worker_threads: settings.worker_threads,
        }
    }
}

impl SchedulerConfig {
    pub fn with_workers(worker_threads: usize) -> Self {
        Self { worker_threads }
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }
}

/// Errors raised while starting a scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}
