use ndarray::{Array2, ArrayView1, Axis};

use crate::dataset::AnnotatedDataset;
use crate::error::CleaningError;
use crate::value::Value;

use super::CleaningStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMethod {
    /// Per column: subtract the mean, divide by the population standard deviation.
    Standardise,
    /// Per column: affine rescale onto `[0, 1]`.
    Normalise,
}

/// Rescales every numeric column. Missing cells are left missing and do not
/// enter the statistics. Constant columns are passed through unchanged.
#[derive(Debug, Clone)]
pub struct FeatureScaler {
    method: ScalingMethod,
}

/// Per-column affine map `x -> (x / unit - offset) / scale`.
struct Affine {
    unit: f64,
    offset: f64,
    scale: f64,
}

impl Affine {
    fn apply(&self, x: f64) -> f64 {
        (x / self.unit - self.offset) / self.scale
    }
}

impl FeatureScaler {
    pub fn new(method: ScalingMethod) -> Self {
        Self { method }
    }

    pub fn standardise() -> Self {
        Self::new(ScalingMethod::Standardise)
    }

    pub fn normalise() -> Self {
        Self::new(ScalingMethod::Normalise)
    }

    /// `None` means the column is left as is.
    fn fit(&self, values: &[f64]) -> Option<Affine> {
        if values.is_empty() || values.iter().any(|v| v.is_infinite()) {
            return None;
        }
        // Statistics of values near f64::MAX overflow; refit them divided
        // by the largest magnitude.
        self.fit_in_unit(values, 1.0).or_else(|| {
            let largest = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            self.fit_in_unit(values, largest)
        })
    }

    fn fit_in_unit(&self, values: &[f64], unit: f64) -> Option<Affine> {
        if unit <= 0.0 {
            return None;
        }
        let scaled = values.iter().map(|v| v / unit);
        let (offset, scale) = match self.method {
            ScalingMethod::Standardise => {
                let n = values.len() as f64;
                let mean = scaled.clone().sum::<f64>() / n;
                let var = scaled.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                (mean, var.sqrt())
            }
            ScalingMethod::Normalise => {
                let min = scaled.clone().fold(f64::INFINITY, f64::min);
                let max = scaled.fold(f64::NEG_INFINITY, f64::max);
                (min, max - min)
            }
        };
        if !offset.is_finite() || !scale.is_finite() || scale <= f64::EPSILON {
            return None;
        }
        Some(Affine {
            unit,
            offset,
            scale,
        })
    }

    fn column_values(
        &self,
        header: &str,
        column: ArrayView1<'_, Value>,
    ) -> Result<Vec<f64>, CleaningError> {
        let mut values = Vec::with_capacity(column.len());
        for cell in column.iter() {
            match cell {
                Value::Text(s) => {
                    return Err(CleaningError::step(
                        self.name(),
                        format!("column '{}' contains non-numeric value '{}'", header, s),
                    ))
                }
                Value::Number(v) if !v.is_nan() => values.push(*v),
                _ => {}
            }
        }
        Ok(values)
    }
}

impl CleaningStep for FeatureScaler {
    fn name(&self) -> &str {
        match self.method {
            ScalingMethod::Standardise => "standardiser",
            ScalingMethod::Normalise => "normaliser",
        }
    }

    fn do_cleaning(&self, input: &AnnotatedDataset) -> Result<AnnotatedDataset, CleaningError> {
        let mut fitted = Vec::with_capacity(input.n_columns());
        for (header, column) in input.headers().iter().zip(input.data().axis_iter(Axis(1))) {
            let values = self.column_values(header, column)?;
            fitted.push(self.fit(&values));
        }

        let source = input.data();
        let data = Array2::from_shape_fn(source.dim(), |(i, j)| {
            match (&source[[i, j]], &fitted[j]) {
                (Value::Number(v), Some(affine)) if !v.is_nan() => {
                    Value::Number(affine.apply(*v))
                }
                (cell, _) => cell.clone(),
            }
        });
        Ok(AnnotatedDataset::from_parts(
            data,
            input.headers().to_vec(),
            input.row_mapping().to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    fn number(cell: &Value) -> f64 {
        cell.as_number().expect("numeric cell")
    }

    fn sample() -> AnnotatedDataset {
        AnnotatedDataset::new(
            array![
                [n(1.0), n(5.0), n(10.0)],
                [n(2.0), n(5.0), Value::Missing],
                [n(3.0), n(5.0), n(30.0)],
            ],
            vec!["a".into(), "flat".into(), "c".into()],
            vec![0, 1, 2],
        )
        .unwrap()
    }

    #[test]
    fn standardise_centres_and_scales() {
        let out = FeatureScaler::standardise().do_cleaning(&sample()).unwrap();
        let col: Vec<f64> = out.data().column(0).iter().map(number).collect();

        let std = (2.0f64 / 3.0).sqrt();
        assert!((col[0] + 1.0 / std).abs() < 1e-9);
        assert!(col[1].abs() < 1e-9);
        assert!((col[2] - 1.0 / std).abs() < 1e-9);
    }

    #[test]
    fn zero_variance_column_passes_through() {
        let out = FeatureScaler::standardise().do_cleaning(&sample()).unwrap();
        assert_eq!(out.data().column(1).to_vec(), vec![n(5.0), n(5.0), n(5.0)]);

        let out = FeatureScaler::normalise().do_cleaning(&sample()).unwrap();
        assert_eq!(out.data().column(1).to_vec(), vec![n(5.0), n(5.0), n(5.0)]);
    }

    #[test]
    fn missing_cells_are_preserved_and_ignored() {
        let out = FeatureScaler::normalise().do_cleaning(&sample()).unwrap();
        assert_eq!(out.data().column(2).to_vec(), vec![n(0.0), Value::Missing, n(1.0)]);
    }

    #[test]
    fn normalise_maps_onto_unit_interval() {
        let out = FeatureScaler::normalise().do_cleaning(&sample()).unwrap();
        assert_eq!(out.data().column(0).to_vec(), vec![n(0.0), n(0.5), n(1.0)]);
    }

    #[test]
    fn never_introduces_nan() {
        let ds = AnnotatedDataset::new(
            array![[n(0.0), Value::Missing], [n(0.0), Value::Missing]],
            vec!["zero".into(), "empty".into()],
            vec![0, 1],
        )
        .unwrap();
        for scaler in [FeatureScaler::standardise(), FeatureScaler::normalise()] {
            let out = scaler.do_cleaning(&ds).unwrap();
            assert!(out
                .data()
                .iter()
                .all(|v| !matches!(v, Value::Number(x) if x.is_nan())));
        }
    }

    #[test]
    fn values_near_f64_max_scale_without_nan() {
        let ds = AnnotatedDataset::new(
            array![[n(-1e308), n(1e308)], [n(1e308), n(1e308)], [n(0.0), n(1e307)]],
            vec!["wide".into(), "high".into()],
            vec![0, 1, 2],
        )
        .unwrap();

        let out = FeatureScaler::normalise().do_cleaning(&ds).unwrap();
        let wide: Vec<f64> = out.data().column(0).iter().map(number).collect();
        assert_eq!(wide, vec![0.0, 1.0, 0.5]);

        let out = FeatureScaler::standardise().do_cleaning(&ds).unwrap();
        assert!(out.data().iter().map(number).all(f64::is_finite));
        let high: Vec<f64> = out.data().column(1).iter().map(number).collect();
        assert!((high[0] - high[1]).abs() < 1e-9);
        assert!(high[2] < 0.0 && high[0] > 0.0);
        assert!(high.iter().sum::<f64>().abs() < 1e-9);
    }

    #[test]
    fn standardise_is_idempotent() {
        let scaler = FeatureScaler::standardise();
        let once = scaler.do_cleaning(&sample()).unwrap();
        let twice = scaler.do_cleaning(&once).unwrap();
        for (a, b) in once.data().iter().zip(twice.data().iter()) {
            match (a, b) {
                (Value::Number(x), Value::Number(y)) => assert!((x - y).abs() < 1e-9),
                _ => assert_eq!(a, b),
            }
        }
    }

    #[test]
    fn text_cells_fail_the_step() {
        let ds = AnnotatedDataset::new(
            array![[n(1.0), Value::Text("red".into())]],
            vec!["a".into(), "colour".into()],
            vec![0],
        )
        .unwrap();
        let err = FeatureScaler::standardise().do_cleaning(&ds).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cleaning step standardiser failed: column 'colour' contains non-numeric value 'red'"
        );
    }
}
