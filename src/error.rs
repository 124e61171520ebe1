use crate::artifact::error::ArtifactError;
use crate::config::ConfigError;
use crate::features::error::FeatureError;
use crate::fetch::error::FetchError;
use crate::training::error::TrainingError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RainfallError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine data directory")]
    DataDirResolution,

    #[error("Month {0} is outside 1..=12")]
    InvalidMonth(u32),

    #[error("Failed to read feature history '{0}'")]
    HistoryRead(PathBuf, #[source] polars::error::PolarsError),

    #[error("Failed to summarize feature history")]
    Summary(#[source] polars::error::PolarsError),
}
