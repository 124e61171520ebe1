use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse JSON payload from {0}")]
    JsonParse(String, #[source] serde_json::Error),

    #[error("Payload from {url} is inconsistent: {message}")]
    MalformedPayload { url: String, message: String },

    #[error("Failed to read CSV file '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write CSV file '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Failed processing DataFrame for {location}")]
    DataFrameProcessing {
        location: String,
        #[source]
        source: PolarsError,
    },

    #[error("No enhanced files found for any configured location")]
    NothingToCombine,

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
