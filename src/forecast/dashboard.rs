//! Prediction facade for the interactive front-end.

use crate::artifact::store::ModelStore;
use crate::config::PipelineConfig;
use crate::error::RainfallError;
use crate::frame::read_dated_csv;
use crate::training::model::RainfallModel;
use crate::types::feature_vector::FeatureVector;
use crate::types::season::{is_monsoon_month, Season};
use log::{info, warn};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence never exceeds this.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Scalar inputs collected by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardInputs {
    pub max_temp: f64,
    pub min_temp: f64,
    pub humidity: f64,
    pub cloud_cover: f64,
    pub month: u32,
}

impl DashboardInputs {
    /// Lags are taken as dry days and the rolling mean as today's maximum.
    pub fn feature_vector(&self) -> Result<FeatureVector, RainfallError> {
        let season =
            Season::from_month(self.month).ok_or(RainfallError::InvalidMonth(self.month))?;
        Ok(FeatureVector {
            temperature_2m_max: self.max_temp,
            temperature_2m_min: self.min_temp,
            relative_humidity_2m: self.humidity,
            cloud_cover_proxy: self.cloud_cover,
            precipitation_lag1: 0.0,
            precipitation_lag2: 0.0,
            is_monsoon: is_monsoon_month(self.month),
            season,
            temp_rolling_7: self.max_temp,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    Low,
    Moderate,
    High,
}

impl Advisory {
    /// High above 10 mm, Moderate above 5 mm.
    pub fn from_precipitation(mm: f64) -> Self {
        if mm > 10.0 {
            Advisory::High
        } else if mm > 5.0 {
            Advisory::Moderate
        } else {
            Advisory::Low
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Advisory::Low => "Low",
            Advisory::Moderate => "Moderate",
            Advisory::High => "High",
        };
        f.write_str(label)
    }
}

/// Heuristic confidence: `0.7 + humidity/100 * 0.2`, plus 0.1 in the monsoon or
/// minus 0.05 outside it, capped at [`MAX_CONFIDENCE`].
pub fn confidence(humidity: f64, is_monsoon: bool) -> f64 {
    let season_adjustment = if is_monsoon { 0.1 } else { -0.05 };
    (0.7 + humidity / 100.0 * 0.2 + season_adjustment).min(MAX_CONFIDENCE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Predicted daily precipitation in mm.
    pub precipitation: f64,
    pub confidence: f64,
    pub advisory: Advisory,
    pub season: Season,
    pub is_monsoon: bool,
    pub model_version: u32,
}

/// Holds the latest model and, when available, the engineered feature history the
/// summary queries run on.
#[derive(Debug, Clone)]
pub struct Forecaster {
    model: RainfallModel,
    history: Option<DataFrame>,
}

impl Forecaster {
    pub fn new(model: RainfallModel, history: Option<DataFrame>) -> Self {
        Self { model, history }
    }

    /// Loads the highest model version and the engineered CSV from the data dir.
    /// A missing feature table is logged and leaves [`Forecaster::history`] empty.
    pub fn load(config: &PipelineConfig) -> Result<Self, RainfallError> {
        let data_dir = config.data_dir()?;
        let model = ModelStore::new(&data_dir, &config.model_prefix).load_latest()?;
        info!("Loaded model v{} (CV MAE {:.4})", model.version, model.cv_mae);

        let history_path = data_dir.join(&config.engineered_file);
        let history = if history_path.exists() {
            Some(
                read_dated_csv(&history_path)
                    .map_err(|e| RainfallError::HistoryRead(history_path.clone(), e))?,
            )
        } else {
            warn!("No feature history at {}", history_path.display());
            None
        };
        Ok(Self::new(model, history))
    }

    pub fn model(&self) -> &RainfallModel {
        &self.model
    }

    pub fn history(&self) -> Option<&DataFrame> {
        self.history.as_ref()
    }

    pub fn forecast(&self, inputs: &DashboardInputs) -> Result<Forecast, RainfallError> {
        let features = inputs.feature_vector()?;
        let precipitation = self.model.predict(&features)?;
        Ok(Forecast {
            precipitation,
            confidence: confidence(inputs.humidity, features.is_monsoon),
            advisory: Advisory::from_precipitation(precipitation),
            season: features.season,
            is_monsoon: features.is_monsoon,
            model_version: self.model.version,
        })
    }
}
