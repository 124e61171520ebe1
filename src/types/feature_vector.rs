//! The model's input row and its schema.

use crate::types::columns::*;
use crate::types::season::Season;
use serde::{Deserialize, Serialize};

/// Model input fields, in the order the preprocessor consumes them.
pub const FEATURE_NAMES: [&str; 9] = [
    COL_TMAX,
    COL_TMIN,
    COL_RHUM,
    COL_CLOUD,
    COL_PRCP_LAG1,
    COL_PRCP_LAG2,
    COL_MONSOON,
    COL_SEASON,
    COL_TMAX_ROLLING_7,
];

/// Subset of [`FEATURE_NAMES`] that is standardized.
pub const NUMERIC_FEATURES: [&str; 8] = [
    COL_TMAX,
    COL_TMIN,
    COL_RHUM,
    COL_CLOUD,
    COL_PRCP_LAG1,
    COL_PRCP_LAG2,
    COL_MONSOON,
    COL_TMAX_ROLLING_7,
];

/// Subset of [`FEATURE_NAMES`] that is one-hot encoded.
pub const CATEGORICAL_FEATURES: [&str; 1] = [COL_SEASON];

/// One input row for the rainfall model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub temperature_2m_max: f64,
    pub temperature_2m_min: f64,
    pub relative_humidity_2m: f64,
    pub cloud_cover_proxy: f64,
    pub precipitation_lag1: f64,
    pub precipitation_lag2: f64,
    pub is_monsoon: bool,
    pub season: Season,
    pub temp_rolling_7: f64,
}

impl FeatureVector {
    /// Numeric fields in [`NUMERIC_FEATURES`] order.
    pub fn numeric_values(&self) -> [f64; 8] {
        [
            self.temperature_2m_max,
            self.temperature_2m_min,
            self.relative_humidity_2m,
            self.cloud_cover_proxy,
            self.precipitation_lag1,
            self.precipitation_lag2,
            if self.is_monsoon { 1.0 } else { 0.0 },
            self.temp_rolling_7,
        ]
    }

    pub fn field_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

/// Names and order of the fields a fitted model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Full input order, numeric and categorical interleaved as in [`FEATURE_NAMES`].
    pub fields: Vec<String>,
}

impl FeatureSchema {
    pub fn current() -> Self {
        Self {
            numeric: NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect(),
            categorical: CATEGORICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
            fields: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns a description of the first difference between `names` and the schema.
    pub fn mismatch(&self, names: &[&str]) -> Option<String> {
        if names.len() != self.fields.len() {
            return Some(format!(
                "expected {} fields, got {}",
                self.fields.len(),
                names.len()
            ));
        }
        self.fields
            .iter()
            .zip(names)
            .enumerate()
            .find(|(_, (expected, found))| expected.as_str() != **found)
            .map(|(idx, (expected, found))| {
                format!("field {idx}: expected '{expected}', got '{found}'")
            })
    }
}
