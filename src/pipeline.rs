//! Stage orchestration over a single data directory.
//!
//! Each stage reads the files the previous one wrote, so stages can be run
//! independently (e.g. re-training without re-downloading).

use crate::artifact::store::ModelStore;
use crate::config::PipelineConfig;
use crate::error::RainfallError;
use crate::features::engineer::FeatureEngineer;
use crate::fetch::combine::{combine_locations, CombineSummary};
use crate::fetch::nasa_power::NasaPowerFetcher;
use crate::fetch::open_meteo::OpenMeteoFetcher;
use crate::forecast::dashboard::Forecaster;
use crate::forecast::summary::{location_means, monthly_means, seasonal_means};
use crate::frame::read_dated_csv;
use crate::training::error::TrainingError;
use crate::training::model::train;
use crate::training::report::TrainingReport;
use crate::utils::ensure_dir_exists;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

/// Aggregates drawn from the engineered feature table.
#[derive(Debug, Clone)]
pub struct HistorySummary {
    pub locations: DataFrame,
    pub monthly: DataFrame,
    pub seasonal: DataFrame,
}

/// Runs the pipeline stages against the data directory named by a [`PipelineConfig`].
///
/// # Examples
///
/// ```no_run
/// # use rainfall::{Pipeline, PipelineConfig, RainfallError};
/// # async fn run() -> Result<(), RainfallError> {
/// let pipeline = Pipeline::new(PipelineConfig::default())?;
/// pipeline.fetch_basic().await?;
/// pipeline.enhance().await?;
/// pipeline.combine()?;
/// pipeline.engineer()?;
/// let (report, path) = pipeline.train()?;
/// println!("v{} saved to {}", report.version, path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    data_dir: PathBuf,
}

impl Pipeline {
    /// Validates `config` and creates its data directory if needed.
    pub fn new(config: PipelineConfig) -> Result<Self, RainfallError> {
        config.validate()?;
        let data_dir = config.data_dir()?;
        ensure_dir_exists(&data_dir)?;
        Ok(Self { config, data_dir })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn model_store(&self) -> ModelStore {
        ModelStore::new(&self.data_dir, &self.config.model_prefix)
    }

    /// Downloads `{name}_basic.csv` for every location. A location that fails is
    /// logged and skipped.
    pub async fn fetch_basic(&self) -> Result<Vec<PathBuf>, RainfallError> {
        let fetcher = OpenMeteoFetcher::new(&self.config.fetch)?;
        let mut written = Vec::new();
        for location in &self.config.locations {
            match fetcher.fetch_location(location, &self.data_dir).await {
                Ok(Some(path)) => written.push(path),
                Ok(None) => warn!("No basic data collected for {}", location.name),
                Err(e) => warn!("Fetching {} failed: {}", location.name, e),
            }
        }
        info!(
            "Basic data written for {}/{} locations",
            written.len(),
            self.config.locations.len()
        );
        Ok(written)
    }

    /// Writes `{name}_enhanced.csv` for every location that has a basic file.
    pub async fn enhance(&self) -> Result<Vec<PathBuf>, RainfallError> {
        let fetcher = NasaPowerFetcher::new(&self.config.fetch)?;
        let mut written = Vec::new();
        for location in &self.config.locations {
            match fetcher.enhance_location(location, &self.data_dir).await {
                Ok(Some(path)) => written.push(path),
                Ok(None) => {}
                Err(e) => warn!("Enhancing {} failed: {}", location.name, e),
            }
        }
        info!(
            "Enhanced data written for {}/{} locations",
            written.len(),
            self.config.locations.len()
        );
        Ok(written)
    }

    pub fn combine(&self) -> Result<CombineSummary, RainfallError> {
        Ok(combine_locations(
            &self.config.locations,
            &self.data_dir,
            &self.config.combined_file,
        )?)
    }

    /// Engineers the combined table and writes the feature CSV.
    pub fn engineer(&self) -> Result<DataFrame, RainfallError> {
        let engineer = FeatureEngineer::new(&self.config.imputation, self.config.random_state);
        Ok(engineer.engineer_file(
            &self.data_dir.join(&self.config.combined_file),
            &self.data_dir.join(&self.config.engineered_file),
        )?)
    }

    /// Trains on the feature CSV and saves the model as the next free version.
    pub fn train(&self) -> Result<(TrainingReport, PathBuf), RainfallError> {
        let path = self.data_dir.join(&self.config.engineered_file);
        let engineered =
            read_dated_csv(&path).map_err(|e| TrainingError::CsvRead(path.clone(), e))?;

        let store = self.model_store();
        let version = store.next_version()?;
        let (model, report) = train(
            &engineered,
            &self.config.training,
            self.config.random_state,
            version,
        )?;
        let saved = store.save(&model)?;
        report.log_summary();
        Ok((report, saved))
    }

    pub fn forecaster(&self) -> Result<Forecaster, RainfallError> {
        Forecaster::load(&self.config)
    }

    /// Reads the engineered feature table back from disk.
    pub fn history(&self) -> Result<DataFrame, RainfallError> {
        let path = self.data_dir.join(&self.config.engineered_file);
        read_dated_csv(&path).map_err(|e| RainfallError::HistoryRead(path, e))
    }

    pub fn summarize(&self, history: &DataFrame) -> Result<HistorySummary, RainfallError> {
        Ok(HistorySummary {
            locations: location_means(history, &self.config.locations)
                .map_err(RainfallError::Summary)?,
            monthly: monthly_means(history).map_err(RainfallError::Summary)?,
            seasonal: seasonal_means(history).map_err(RainfallError::Summary)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn new_creates_data_dir() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("nested").join("data");
        let pipeline = Pipeline::new(PipelineConfig {
            data_dir: Some(dir.clone()),
            ..PipelineConfig::default()
        })?;
        assert!(dir.is_dir());
        assert_eq!(pipeline.data_dir(), dir.as_path());
        Ok(())
    }

    #[test]
    fn new_rejects_invalid_config() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let result = Pipeline::new(PipelineConfig {
            data_dir: Some(tmp.path().to_path_buf()),
            locations: Vec::new(),
            ..PipelineConfig::default()
        });
        assert!(matches!(
            result,
            Err(RainfallError::Config(ConfigError::Invalid(_)))
        ));
        Ok(())
    }

    #[test]
    fn stages_fail_cleanly_without_inputs() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let pipeline = Pipeline::new(PipelineConfig {
            data_dir: Some(tmp.path().to_path_buf()),
            ..PipelineConfig::default()
        })?;

        assert!(matches!(pipeline.combine(), Err(RainfallError::Fetch(_))));
        assert!(matches!(pipeline.engineer(), Err(RainfallError::Feature(_))));
        assert!(matches!(
            pipeline.train(),
            Err(RainfallError::Training(TrainingError::CsvRead(..)))
        ));
        assert!(matches!(pipeline.forecaster(), Err(RainfallError::Artifact(_))));
        Ok(())
    }
}
