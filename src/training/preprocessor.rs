//! Column scaling and categorical encoding fitted on training rows.

use crate::training::error::TrainingError;
use ndarray::{s, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Per-column standardization: `(x - mean) / std`. A zero std scales by 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: ArrayView2<f64>) -> Result<Self, TrainingError> {
        let n = x.nrows();
        if n == 0 {
            return Err(TrainingError::NoEligibleRows);
        }
        let means = x
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![0.0; x.ncols()]);
        let scales = x
            .axis_iter(Axis(1))
            .zip(&means)
            .map(|(column, mean)| {
                let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
                let std = variance.sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        Ok(Self { means, scales })
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, TrainingError> {
        if x.ncols() != self.means.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("{} numeric columns", self.means.len()),
                found: format!("{} numeric columns", x.ncols()),
            });
        }
        let mut out = x.to_owned();
        for ((mut column, mean), scale) in out.axis_iter_mut(Axis(1)).zip(&self.means).zip(&self.scales) {
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        Ok(out)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

/// One indicator column per category seen during fitting, in sorted order.
/// Transforming a category not seen during fitting is a schema mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let mut categories: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn transform<S: AsRef<str>>(&self, values: &[S]) -> Result<Array2<f64>, TrainingError> {
        let mut out = Array2::zeros((values.len(), self.categories.len()));
        for (row, value) in values.iter().enumerate() {
            let value = value.as_ref();
            let col = self
                .categories
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| {
                    TrainingError::SchemaMismatch(format!(
                        "unknown category '{}', fitted on {:?}",
                        value, self.categories
                    ))
                })?;
            out[[row, col]] = 1.0;
        }
        Ok(out)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Scales the numeric block and appends the one-hot block for the categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    numeric_names: Vec<String>,
    categorical_name: String,
    pub scaler: StandardScaler,
    pub encoder: OneHotEncoder,
}

impl Preprocessor {
    pub fn fit<S: AsRef<str>>(
        numeric_names: &[&str],
        categorical_name: &str,
        numeric: ArrayView2<f64>,
        categories: &[S],
    ) -> Result<Self, TrainingError> {
        if numeric.ncols() != numeric_names.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("{} numeric columns", numeric_names.len()),
                found: format!("{} numeric columns", numeric.ncols()),
            });
        }
        Ok(Self {
            numeric_names: numeric_names.iter().map(|s| s.to_string()).collect(),
            categorical_name: categorical_name.to_string(),
            scaler: StandardScaler::fit(numeric)?,
            encoder: OneHotEncoder::fit(categories),
        })
    }

    pub fn transform<S: AsRef<str>>(
        &self,
        numeric: ArrayView2<f64>,
        categories: &[S],
    ) -> Result<Array2<f64>, TrainingError> {
        if numeric.nrows() != categories.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("{} categorical values", numeric.nrows()),
                found: format!("{} categorical values", categories.len()),
            });
        }
        let scaled = self.scaler.transform(numeric)?;
        let encoded = self.encoder.transform(categories)?;

        let width = scaled.ncols() + encoded.ncols();
        let mut out = Array2::zeros((scaled.nrows(), width));
        out.slice_mut(s![.., ..scaled.ncols()]).assign(&scaled);
        out.slice_mut(s![.., scaled.ncols()..]).assign(&encoded);
        Ok(out)
    }

    /// Output column names: numeric names, then `{categorical}_{category}`.
    pub fn feature_names_out(&self) -> Vec<String> {
        self.numeric_names
            .iter()
            .cloned()
            .chain(
                self.encoder
                    .categories()
                    .iter()
                    .map(|c| format!("{}_{}", self.categorical_name, c)),
            )
            .collect()
    }

    pub fn numeric_names(&self) -> &[String] {
        &self.numeric_names
    }
}
