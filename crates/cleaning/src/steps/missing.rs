use ndarray::Axis;
use tracing::debug;

use crate::dataset::AnnotatedDataset;
use crate::error::CleaningError;

use super::{count_missing, CleaningStep};

/// Drops columns, then rows, whose missing fraction exceeds a threshold.
///
/// Columns go first: removing a mostly-empty column can save rows that
/// would otherwise exceed the row threshold.
#[derive(Debug, Clone)]
pub struct MissingValuesRemover {
    row_threshold: f64,
    column_threshold: Option<f64>,
}

fn check_threshold(name: &'static str, value: f64) -> Result<f64, CleaningError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(CleaningError::InvalidThreshold { name, value })
    }
}

impl MissingValuesRemover {
    pub fn new(row_threshold: f64, column_threshold: Option<f64>) -> Result<Self, CleaningError> {
        Ok(Self {
            row_threshold: check_threshold("row threshold", row_threshold)?,
            column_threshold: column_threshold
                .map(|t| check_threshold("column threshold", t))
                .transpose()?,
        })
    }

    /// Drop every row that has at least one missing cell.
    pub fn strict() -> Self {
        Self {
            row_threshold: 0.0,
            column_threshold: None,
        }
    }
}

impl CleaningStep for MissingValuesRemover {
    fn name(&self) -> &str {
        "missing_values_remover"
    }

    fn do_cleaning(&self, input: &AnnotatedDataset) -> Result<AnnotatedDataset, CleaningError> {
        let (rows, columns) = input.data().dim();

        let kept_columns: Vec<usize> = match self.column_threshold {
            Some(threshold) if rows > 0 => input
                .data()
                .axis_iter(Axis(1))
                .enumerate()
                .filter(|(_, column)| count_missing(*column) as f64 / rows as f64 <= threshold)
                .map(|(j, _)| j)
                .collect(),
            _ => (0..columns).collect(),
        };
        let staged = input.select_columns(&kept_columns);

        let limit = self.row_threshold * staged.n_columns() as f64;
        let kept_rows: Vec<usize> = staged
            .data()
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| count_missing(*row) as f64 <= limit)
            .map(|(i, _)| i)
            .collect();

        debug!(
            dropped_columns = columns - kept_columns.len(),
            dropped_rows = rows - kept_rows.len(),
            "missing values removed"
        );
        Ok(staged.select_rows(&kept_rows))
    }
}
