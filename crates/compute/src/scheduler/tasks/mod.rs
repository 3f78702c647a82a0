mod cleaning_task;

pub use cleaning_task::{
    CleaningReport, CleaningTask, STATUS_CLEANING_FAILED, STATUS_RESULT_EMPTY,
    STATUS_RESULT_NOT_FLOAT32,
};
