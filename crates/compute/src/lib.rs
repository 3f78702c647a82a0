pub mod scheduler;

pub use scheduler::{
    CleaningReport, CleaningTask, DebugScheduler, Schedulable, Scheduler, SchedulerConfig,
    SchedulerError, SchedulerMetrics, SchedulerSnapshot, Status, UnitState,
    UserRoundRobinScheduler,
};
