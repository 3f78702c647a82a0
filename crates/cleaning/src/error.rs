use std::fmt;

use odex_core::TaskErrorMessages;
use thiserror::Error;

/// A cell that could not be narrowed to `f32` at the pipeline boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct OffendingCell {
    pub row: usize,
    pub column: usize,
    pub value: String,
}

impl fmt::Display for OffendingCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}): {}", self.row, self.column, self.value)
    }
}

fn list_offending(cells: &[OffendingCell]) -> String {
    cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised while building or cleaning an annotated dataset.
#[derive(Debug, Clone, Error)]
pub enum CleaningError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Cleaning step {step} failed: {reason}")]
    StepFailure { step: String, reason: String },

    #[error("Invalid {name} {value}: must be within [0, 1]")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("{}", TaskErrorMessages::CLEANING_RESULT_EMPTY)]
    CleaningResultEmpty,

    #[error("{}{}", TaskErrorMessages::CLEANING_RESULT_NOT_FLOAT32, list_offending(.offending))]
    CleaningResultNotFloat32 { offending: Vec<OffendingCell> },
}

impl CleaningError {
    pub fn step(step: &str, reason: impl Into<String>) -> Self {
        CleaningError::StepFailure {
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}
