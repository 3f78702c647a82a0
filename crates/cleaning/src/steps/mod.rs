//! Cleaning step variants.
//!
//! Three sibling axes, each a pure `AnnotatedDataset -> AnnotatedDataset`
//! transform:
//! - `missing`: drop sparse columns, then sparse rows
//! - `categorical`: remove or one-hot encode text columns
//! - `scaling`: standardise or normalise numeric columns

pub mod categorical;
pub mod missing;
pub mod scaling;

use std::fmt;

use ndarray::ArrayView1;

use crate::dataset::AnnotatedDataset;
use crate::error::CleaningError;
use crate::value::Value;

pub use categorical::{CategoricalColumnHandler, CategoricalMode};
pub use missing::MissingValuesRemover;
pub use scaling::{FeatureScaler, ScalingMethod};

/// A single transformation in a [`CleaningPipeline`](crate::CleaningPipeline).
pub trait CleaningStep: Send + Sync + fmt::Debug {
    /// Short name for logging and error reports.
    fn name(&self) -> &str;

    /// Produce a cleaned copy of `input`. Must not invent row identities.
    fn do_cleaning(&self, input: &AnnotatedDataset) -> Result<AnnotatedDataset, CleaningError>;
}

/// A column is categorical when any of its cells is text.
pub(crate) fn is_categorical(column: ArrayView1<'_, Value>) -> bool {
    column.iter().any(Value::is_text)
}

pub(crate) fn count_missing(cells: ArrayView1<'_, Value>) -> usize {
    cells.iter().filter(|v| v.is_missing()).count()
}
