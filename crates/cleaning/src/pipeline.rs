use std::time::Instant;

use ndarray::Array2;
use odex_core::config::CleaningDefaults;
use tracing::{debug, info};

use crate::dataset::AnnotatedDataset;
use crate::error::{CleaningError, OffendingCell};
use crate::steps::{
    CategoricalColumnHandler, CleaningStep, FeatureScaler, MissingValuesRemover, ScalingMethod,
};

/// Ordered chain of cleaning steps with acceptance checks at the exit.
///
/// The pipeline holds no state between runs; one `run` consumes an input
/// dataset and yields a cleaned `f32` dataset or a typed failure.
#[derive(Debug, Default)]
pub struct CleaningPipeline {
    steps: Vec<Box<dyn CleaningStep>>,
}

impl CleaningPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual experiment preprocessing: drop sparse columns and rows,
    /// drop text columns, then optionally rescale.
    pub fn from_defaults(
        defaults: &CleaningDefaults,
        scaling: Option<ScalingMethod>,
    ) -> Result<Self, CleaningError> {
        let mut pipeline = Self::new()
            .with_step(MissingValuesRemover::new(
                defaults.row_missing_threshold,
                defaults.column_missing_threshold,
            )?)
            .with_step(CategoricalColumnHandler::remove());
        if let Some(method) = scaling {
            pipeline.push(Box::new(FeatureScaler::new(method)));
        }
        Ok(pipeline)
    }

    pub fn with_step(mut self, step: impl CleaningStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn CleaningStep>) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Apply every step in order, then check the result is non-empty and
    /// representable as `f32`. Step failures surface unchanged.
    pub fn run(&self, input: AnnotatedDataset) -> Result<AnnotatedDataset<f32>, CleaningError> {
        let start = Instant::now();
        let (in_rows, in_columns) = input.data().dim();

        let mut current = input;
        for step in &self.steps {
            current = step.do_cleaning(&current)?;
            debug!(
                step = step.name(),
                rows = current.n_rows(),
                columns = current.n_columns(),
                "cleaning step applied"
            );
        }

        if current.is_empty() {
            return Err(CleaningError::CleaningResultEmpty);
        }
        let cleaned = narrow_to_f32(current)?;

        info!(
            "Cleaning done in {:.3}s: {}x{} -> {}x{}",
            start.elapsed().as_secs_f64(),
            in_rows,
            in_columns,
            cleaned.n_rows(),
            cleaned.n_columns()
        );
        Ok(cleaned)
    }
}

fn narrow_to_f32(dataset: AnnotatedDataset) -> Result<AnnotatedDataset<f32>, CleaningError> {
    let (data, headers, row_mapping) = dataset.into_parts();
    let dim = data.dim();

    let mut narrowed = Vec::with_capacity(data.len());
    let mut offending = Vec::new();
    for ((row, column), cell) in data.indexed_iter() {
        match cell.to_f32() {
            Some(v) => narrowed.push(v),
            None => offending.push(OffendingCell {
                row,
                column,
                value: cell.to_string(),
            }),
        }
    }
    if !offending.is_empty() {
        return Err(CleaningError::CleaningResultNotFloat32 { offending });
    }

    let data = Array2::from_shape_vec(dim, narrowed)
        .map_err(|e| CleaningError::ShapeMismatch(e.to_string()))?;
    Ok(AnnotatedDataset::from_parts(data, headers, row_mapping))
}
