//! Dataset cleaning for outlier-detection experiments.
//!
//! An [`AnnotatedDataset`] is a 2-D cell matrix with column headers and a
//! row-identity vector. A [`CleaningPipeline`] threads it through an ordered
//! list of [`CleaningStep`]s and narrows the result to `f32`.

pub mod dataset;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod steps;
pub mod value;

pub use dataset::{AnnotatedDataset, MAX_ROW_ID};
pub use error::{CleaningError, OffendingCell};
pub use pipeline::CleaningPipeline;
pub use steps::{
    CategoricalColumnHandler, CategoricalMode, CleaningStep, FeatureScaler,
    MissingValuesRemover, ScalingMethod,
};
pub use value::Value;
