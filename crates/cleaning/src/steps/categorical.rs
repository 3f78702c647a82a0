use indexmap::IndexSet;
use ndarray::{Array2, Axis};
use tracing::debug;

use crate::dataset::AnnotatedDataset;
use crate::error::CleaningError;
use crate::value::Value;

use super::{is_categorical, CleaningStep};

/// What to do with text-valued columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalMode {
    /// Drop the column.
    Remove,
    /// Replace the column in place with one 0/1 column per distinct value.
    Encode,
}

#[derive(Debug, Clone)]
pub struct CategoricalColumnHandler {
    mode: CategoricalMode,
}

impl CategoricalColumnHandler {
    pub fn new(mode: CategoricalMode) -> Self {
        Self { mode }
    }

    pub fn remove() -> Self {
        Self::new(CategoricalMode::Remove)
    }

    pub fn encode() -> Self {
        Self::new(CategoricalMode::Encode)
    }

    fn remove_columns(&self, input: &AnnotatedDataset) -> AnnotatedDataset {
        let numeric: Vec<usize> = input
            .data()
            .axis_iter(Axis(1))
            .enumerate()
            .filter(|(_, column)| !is_categorical(*column))
            .map(|(j, _)| j)
            .collect();
        debug!(
            removed = input.n_columns() - numeric.len(),
            "categorical columns removed"
        );
        input.select_columns(&numeric)
    }

    fn encode_columns(&self, input: &AnnotatedDataset) -> AnnotatedDataset {
        let rows = input.n_rows();
        let mut headers = Vec::new();
        let mut columns: Vec<Vec<Value>> = Vec::new();

        for (header, column) in input.headers().iter().zip(input.data().axis_iter(Axis(1))) {
            if !is_categorical(column) {
                headers.push(header.clone());
                columns.push(column.to_vec());
                continue;
            }

            let categories: IndexSet<String> = column
                .iter()
                .filter(|v| !v.is_missing())
                .map(|v| v.to_string())
                .collect();

            for category in &categories {
                headers.push(format!("{}_{}", header, category));
                columns.push(
                    column
                        .iter()
                        .map(|v| {
                            if v.is_missing() {
                                Value::Missing
                            } else if v.to_string() == *category {
                                Value::Number(1.0)
                            } else {
                                Value::Number(0.0)
                            }
                        })
                        .collect(),
                );
            }
        }

        let data = Array2::from_shape_fn((rows, columns.len()), |(i, j)| columns[j][i].clone());
        AnnotatedDataset::from_parts(data, headers, input.row_mapping().to_vec())
    }
}

impl CleaningStep for CategoricalColumnHandler {
    fn name(&self) -> &str {
        match self.mode {
            CategoricalMode::Remove => "categorical_remover",
            CategoricalMode::Encode => "categorical_encoder",
        }
    }

    fn do_cleaning(&self, input: &AnnotatedDataset) -> Result<AnnotatedDataset, CleaningError> {
        Ok(match self.mode {
            CategoricalMode::Remove => self.remove_columns(input),
            CategoricalMode::Encode => self.encode_columns(input),
        })
    }
}
