use std::collections::HashSet;

use ndarray::{Array2, Axis};
use odex_core::RowId;

use crate::error::CleaningError;
use crate::value::Value;

/// Largest row identity magnitude that survives the `f64` column of
/// [`AnnotatedDataset::to_single_array`] exactly.
pub const MAX_ROW_ID: RowId = 1 << 53;

/// A cell matrix with column headers and per-row origin identities.
///
/// Invariants: `headers.len() == data.ncols()`, `row_mapping.len() ==
/// data.nrows()`, and `row_mapping` holds no duplicates, each within
/// `±`[`MAX_ROW_ID`]. Steps never mutate
/// a dataset; they build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedDataset<T = Value> {
    data: Array2<T>,
    headers: Vec<String>,
    row_mapping: Vec<RowId>,
}

impl<T> AnnotatedDataset<T> {
    /// Build a dataset, checking the shape invariants.
    pub fn new(
        data: Array2<T>,
        headers: Vec<String>,
        row_mapping: Vec<RowId>,
    ) -> Result<Self, CleaningError> {
        let (rows, columns) = data.dim();
        if headers.len() != columns {
            return Err(CleaningError::ShapeMismatch(format!(
                "{} headers for {} data columns",
                headers.len(),
                columns
            )));
        }
        if row_mapping.len() != rows {
            return Err(CleaningError::ShapeMismatch(format!(
                "{} row identities for {} data rows",
                row_mapping.len(),
                rows
            )));
        }
        if let Some(id) = row_mapping.iter().find(|id| id.unsigned_abs() > MAX_ROW_ID as u64) {
            return Err(CleaningError::ShapeMismatch(format!(
                "row identity {} exceeds {} in magnitude",
                id, MAX_ROW_ID
            )));
        }
        let mut seen = HashSet::with_capacity(row_mapping.len());
        if let Some(dup) = row_mapping.iter().find(|id| !seen.insert(**id)) {
            return Err(CleaningError::ShapeMismatch(format!(
                "duplicate row identity {}",
                dup
            )));
        }
        Ok(Self::from_parts(data, headers, row_mapping))
    }

    /// Assemble without checks. Callers derive the parts from an already
    /// valid dataset so the invariants carry over.
    pub(crate) fn from_parts(
        data: Array2<T>,
        headers: Vec<String>,
        row_mapping: Vec<RowId>,
    ) -> Self {
        Self {
            data,
            headers,
            row_mapping,
        }
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_mapping(&self) -> &[RowId] {
        &self.row_mapping
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0 || self.n_columns() == 0
    }

    pub fn into_parts(self) -> (Array2<T>, Vec<String>, Vec<RowId>) {
        (self.data, self.headers, self.row_mapping)
    }
}

impl<T: Clone> AnnotatedDataset<T> {
    /// Keep only the given rows, in the given order. Row identities follow.
    pub fn select_rows(&self, keep: &[usize]) -> Self {
        let data = self.data.select(Axis(0), keep);
        let row_mapping = keep.iter().map(|&i| self.row_mapping[i]).collect();
        Self::from_parts(data, self.headers.clone(), row_mapping)
    }

    /// Keep only the given columns, in the given order. Headers follow.
    pub fn select_columns(&self, keep: &[usize]) -> Self {
        let data = self.data.select(Axis(1), keep);
        let headers = keep.iter().map(|&j| self.headers[j].clone()).collect();
        Self::from_parts(data, headers, self.row_mapping.clone())
    }
}

impl<T: Clone + Into<Value>> AnnotatedDataset<T> {
    /// Project into one `(R+1) x (C+1)` mixed matrix.
    ///
    /// Cell `[0, 0]` is an empty string, row 0 carries the headers and
    /// column 0 carries the row identities.
    pub fn to_single_array(&self) -> Array2<Value> {
        let (rows, columns) = self.data.dim();
        Array2::from_shape_fn((rows + 1, columns + 1), |(i, j)| match (i, j) {
            (0, 0) => Value::Text(String::new()),
            (0, j) => Value::Text(self.headers[j - 1].clone()),
            (i, 0) => Value::Number(self.row_mapping[i - 1] as f64),
            (i, j) => self.data[[i - 1, j - 1]].clone().into(),
        })
    }
}

impl AnnotatedDataset<f32> {
    /// Widen a cleaned dataset back to mixed cells, e.g. to clean it again.
    pub fn widen(self) -> AnnotatedDataset<Value> {
        let data = self.data.mapv(|v| {
            if v.is_nan() {
                Value::Missing
            } else {
                Value::from(v)
            }
        });
        AnnotatedDataset::from_parts(data, self.headers, self.row_mapping)
    }
}
