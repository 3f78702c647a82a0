//! Turn already-split upload records into an [`AnnotatedDataset`].
//!
//! Reading and splitting the uploaded file belongs to the upload layer; this
//! module only owns the cell parsing and the shape check.

use ndarray::Array2;
use odex_core::{DataIoInputError, RowId};
use tracing::debug;

use crate::dataset::AnnotatedDataset;
use crate::value::Value;

const READ_FAILED: &str = "Error: the uploaded dataset could not be read";

impl AnnotatedDataset<Value> {
    /// Parse string records into cells. Row identities are the record
    /// positions `0..R`.
    pub fn from_records<S: AsRef<str>>(
        headers: Vec<String>,
        records: &[Vec<S>],
    ) -> Result<Self, DataIoInputError> {
        let columns = headers.len();
        let mut cells = Vec::with_capacity(records.len() * columns);

        for (i, record) in records.iter().enumerate() {
            if record.len() != columns {
                return Err(DataIoInputError::new(
                    READ_FAILED,
                    format!(
                        "record {} has {} fields, expected {}",
                        i + 1,
                        record.len(),
                        columns
                    ),
                ));
            }
            cells.extend(record.iter().map(|raw| Value::parse(raw.as_ref())));
        }

        let data = Array2::from_shape_vec((records.len(), columns), cells)
            .map_err(|e| DataIoInputError::new(READ_FAILED, e))?;
        let row_mapping: Vec<RowId> = (0..records.len() as RowId).collect();
        debug!(rows = records.len(), columns, "parsed uploaded records");

        AnnotatedDataset::new(data, headers, row_mapping)
            .map_err(|e| DataIoInputError::new(READ_FAILED, e))
    }
}
