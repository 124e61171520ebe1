use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Failed to read CSV file '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Missing required column '{0}'")]
    MissingColumn(String, #[source] PolarsError),

    #[error("Failed processing DataFrame")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("No eligible rows: every row has a null target or feature")]
    NoEligibleRows,

    #[error("{n_splits} folds need more than {n_splits} distinct dates, got {dates}")]
    NotEnoughDates { n_splits: usize, dates: usize },

    #[error("Shape mismatch: expected {expected}, got {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("Model is not fitted")]
    NotFitted,

    #[error("No finite predictions to score ({dropped} dropped)")]
    NoScoredRows { dropped: usize },

    #[error("All {0} parameter candidates failed")]
    AllCandidatesFailed(usize),

    #[error("Invalid parameter grid: {0}")]
    InvalidGrid(String),

    #[error("Feature vector does not match the model schema: {0}")]
    SchemaMismatch(String),
}
