use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Failed to read CSV file '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write CSV file '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Missing required column '{0}'")]
    MissingColumn(String, #[source] PolarsError),

    #[error("Failed processing DataFrame")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Column '{0}' has no observed values; refusing to impute it")]
    ColumnEntirelyMissing(String),

    #[error("Cannot impute an empty table")]
    EmptyInput,

    #[error("Imputer expects {expected} columns, got {found}")]
    ColumnCount { expected: usize, found: usize },
}
