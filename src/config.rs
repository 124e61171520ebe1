//! Pipeline configuration.
//!
//! Every stage receives the same [`PipelineConfig`]; nothing reads locations or file
//! names from globals. A config file is plain JSON and any omitted field keeps its
//! default.

use crate::error::RainfallError;
use crate::training::grid_search::ParamGrid;
use crate::types::location::{default_locations, Location};
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Remote fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Inclusive `(start_year, end_year)` chunks requested from the Open-Meteo archive.
    pub year_chunks: Vec<(i32, i32)>,
    pub open_meteo_delay_ms: u64,
    pub nasa_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            year_chunks: vec![
                (2007, 2009),
                (2010, 2012),
                (2013, 2015),
                (2016, 2018),
                (2019, 2021),
                (2022, 2024),
            ],
            open_meteo_delay_ms: 2000,
            nasa_delay_ms: 1500,
            timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    pub fn open_meteo_delay(&self) -> Duration {
        Duration::from_millis(self.open_meteo_delay_ms)
    }

    pub fn nasa_delay(&self) -> Duration {
        Duration::from_millis(self.nasa_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Iterative imputation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    pub ridge_alpha: f64,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            max_iter: 10,
            tolerance: 1e-3,
            ridge_alpha: 1e-6,
        }
    }
}

/// Model search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_splits: usize,
    pub grid: ParamGrid,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            grid: ParamGrid::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding every CSV and model artifact. `None` resolves to the platform
    /// data directory.
    pub data_dir: Option<PathBuf>,
    pub locations: Vec<Location>,
    pub combined_file: String,
    pub engineered_file: String,
    pub model_prefix: String,
    pub random_state: u64,
    pub fetch: FetchConfig,
    pub imputation: ImputationConfig,
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            locations: default_locations(),
            combined_file: "nigeria_weather_final.csv".to_string(),
            engineered_file: "enhanced_weather.csv".to_string(),
            model_prefix: "rainfall_model".to_string(),
            random_state: 42,
            fetch: FetchConfig::default(),
            imputation: ImputationConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes =
            std::fs::read(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: PipelineConfig = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid("no locations configured".to_string()));
        }
        if self.training.n_splits < 2 {
            return Err(ConfigError::Invalid(format!(
                "n_splits must be at least 2, got {}",
                self.training.n_splits
            )));
        }
        if let Some((start, end)) = self.fetch.year_chunks.iter().find(|(s, e)| s > e) {
            return Err(ConfigError::Invalid(format!(
                "year chunk {start}-{end} ends before it starts"
            )));
        }
        self.training.grid.validate().map_err(ConfigError::Invalid)
    }

    pub fn data_dir(&self) -> Result<PathBuf, RainfallError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_data_dir(),
        }
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "data_dir": "/tmp/rain", "training": {{ "n_splits": 3 }} }}"#
        )?;
        let config = PipelineConfig::from_file(file.path())?;

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/rain")));
        assert_eq!(config.training.n_splits, 3);
        assert_eq!(config.training.grid, ParamGrid::default());
        assert_eq!(config.locations.len(), 4);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn rejects_empty_locations() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{ "locations": [] }}"#)?;
        let result = PipelineConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn reports_parse_errors_with_path() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "not json")?;
        match PipelineConfig::from_file(file.path()) {
            Err(ConfigError::Parse(path, _)) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn finds_location_by_name() {
        let config = PipelineConfig::default();
        let bauchi = config.location("Bauchi").expect("Bauchi configured");
        assert_eq!(bauchi.latitude(), 10.31);
        assert!(config.location("Lagos").is_none());
    }
}
