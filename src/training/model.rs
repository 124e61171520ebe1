//! The fitted rainfall pipeline and the function that produces it.

use crate::config::TrainingConfig;
use crate::frame::f64_values;
use crate::training::dataset::TrainingSet;
use crate::training::error::TrainingError;
use crate::training::grid_search::{fit_pipeline, ForestParams, GridSearch};
use crate::training::preprocessor::Preprocessor;
use crate::training::random_forest::RandomForestRegressor;
use crate::training::report::{rank_importances, FeatureImportance, TrainingReport};
use crate::types::columns::COL_SEASON;
use crate::types::feature_vector::{FeatureSchema, FeatureVector, NUMERIC_FEATURES};
use chrono::{DateTime, SubsecRound, Utc};
use log::info;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A fitted preprocessor and forest with the schema they were trained on.
///
/// Values of this type are never modified after training; a new training run yields
/// a new value with a higher `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallModel {
    pub preprocessor: Preprocessor,
    pub regressor: RandomForestRegressor,
    pub schema: FeatureSchema,
    pub params: ForestParams,
    pub cv_mae: f64,
    pub version: u32,
    /// Millisecond precision, as stored in the artifact.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub trained_at: DateTime<Utc>,
}

impl RainfallModel {
    fn check_schema(&self, names: &[&str]) -> Result<(), TrainingError> {
        match self.schema.mismatch(names) {
            Some(message) => Err(TrainingError::SchemaMismatch(message)),
            None => Ok(()),
        }
    }

    /// Predicts daily precipitation (mm) for one feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, TrainingError> {
        self.check_schema(features.field_names())?;
        let numeric =
            Array2::from_shape_vec((1, NUMERIC_FEATURES.len()), features.numeric_values().to_vec())
                .map_err(|e| TrainingError::ShapeMismatch {
                    expected: format!("1 x {}", NUMERIC_FEATURES.len()),
                    found: e.to_string(),
                })?;
        let x = self
            .preprocessor
            .transform(numeric.view(), &[features.season.as_str()])?;
        let predictions = self.regressor.predict(&x)?;
        predictions.get(0).copied().ok_or(TrainingError::NotFitted)
    }

    /// Predicts every row of a table holding the schema's columns. Null numeric cells
    /// are passed through as NaN.
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<f64>, TrainingError> {
        let names: Vec<&str> = self.schema.fields.iter().map(String::as_str).collect();
        for name in &names {
            if df.column(name).is_err() {
                return Err(TrainingError::SchemaMismatch(format!("missing column '{name}'")));
            }
        }

        let mut numeric = Array2::<f64>::zeros((df.height(), self.schema.numeric.len()));
        for (j, name) in self.schema.numeric.iter().enumerate() {
            for (i, value) in f64_values(df, name)?.into_iter().enumerate() {
                numeric[[i, j]] = value.unwrap_or(f64::NAN);
            }
        }
        let seasons: Vec<String> = df
            .column(COL_SEASON)?
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect();

        let x = self.preprocessor.transform(numeric.view(), &seasons)?;
        Ok(self.regressor.predict(&x)?.to_vec())
    }

    /// Preprocessor output columns with their importance, highest first.
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        rank_importances(
            &self.preprocessor.feature_names_out(),
            self.regressor.feature_importances(),
        )
    }
}

/// Searches the configured grid on `engineered`, refits the winner on every eligible
/// row and returns the fitted model labelled `version`.
pub fn train(
    engineered: &DataFrame,
    config: &TrainingConfig,
    random_state: u64,
    version: u32,
) -> Result<(RainfallModel, TrainingReport), TrainingError> {
    let data = TrainingSet::from_frame(engineered)?;
    let outcome = GridSearch::builder()
        .grid(config.grid.clone())
        .n_splits(config.n_splits)
        .random_state(random_state)
        .build()
        .run(&data)?;

    info!("Refitting {} on {} rows", outcome.best, data.len());
    let (preprocessor, regressor) =
        fit_pipeline(&outcome.best, &data, data.all_rows(), random_state)?;

    let model = RainfallModel {
        preprocessor,
        regressor,
        schema: FeatureSchema::current(),
        params: outcome.best,
        cv_mae: outcome.best_mae,
        version,
        trained_at: Utc::now().trunc_subsecs(3),
    };
    let report = TrainingReport {
        version,
        best_params: outcome.best,
        best_mae: outcome.best_mae,
        candidates: outcome.candidates,
        importances: model.feature_importances(),
        eligible_rows: data.len(),
        excluded_rows: data.excluded,
    };
    Ok((model, report))
}
