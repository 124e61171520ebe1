//! Daily temperature and precipitation from the Open-Meteo historical archive.

use crate::config::FetchConfig;
use crate::fetch::error::FetchError;
use crate::fetch::http::{build_client, get_json};
use crate::frame::write_csv;
use crate::types::columns::*;
use crate::types::location::Location;
use log::{info, warn};
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::task;

const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
}

/// Downloads the basic daily series for a location in year chunks.
pub struct OpenMeteoFetcher {
    client: Client,
    base_url: String,
    config: FetchConfig,
}

impl OpenMeteoFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Self::with_base_url(config, ARCHIVE_URL)
    }

    pub fn with_base_url(config: &FetchConfig, base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config.timeout())?,
            base_url: base_url.to_string(),
            config: config.clone(),
        })
    }

    fn chunk_query(location: &Location, start_year: i32, end_year: i32) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", location.latitude().to_string()),
            ("longitude", location.longitude().to_string()),
            ("start_date", format!("{start_year}-01-01")),
            ("end_date", format!("{end_year}-12-31")),
            ("daily", BASIC_COLUMNS.join(",")),
        ]
    }

    async fn fetch_chunk(
        &self,
        location: &Location,
        start_year: i32,
        end_year: i32,
    ) -> Result<Option<DataFrame>, FetchError> {
        let query = Self::chunk_query(location, start_year, end_year);
        let payload: ArchiveResponse = get_json(&self.client, &self.base_url, &query).await?;
        parse_archive(payload, &location.name, &self.base_url)
    }

    /// Fetches every configured chunk for `location` and writes `{name}_basic.csv` into
    /// `out_dir`. Failed or empty chunks are logged and skipped. Returns `None` when no
    /// chunk produced rows.
    pub async fn fetch_location(
        &self,
        location: &Location,
        out_dir: &Path,
    ) -> Result<Option<PathBuf>, FetchError> {
        info!("Fetching basic data for {}", location.name);
        let mut chunks = Vec::new();

        for (idx, &(start, end)) in self.config.year_chunks.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.config.open_meteo_delay()).await;
            }
            match self.fetch_chunk(location, start, end).await {
                Ok(Some(df)) => {
                    info!("{} {}-{}: {} rows", location.name, start, end, df.height());
                    chunks.push(df);
                }
                Ok(None) => warn!("No data for {} {}-{}", location.name, start, end),
                Err(e) => warn!("Skipping {} {}-{}: {}", location.name, start, end, e),
            }
        }

        if chunks.is_empty() {
            return Ok(None);
        }

        let path = out_dir.join(location.basic_file_name());
        let name = location.name.clone();
        let out = path.clone();
        task::spawn_blocking(move || {
            let mut combined = concat_frames(chunks).map_err(|source| {
                FetchError::DataFrameProcessing {
                    location: name,
                    source,
                }
            })?;
            write_csv(&mut combined, &out).map_err(|e| FetchError::CsvWrite(out.clone(), e))
        })
        .await??;

        info!("Saved basic data for {} to {}", location.name, path.display());
        Ok(Some(path))
    }
}

fn concat_frames(frames: Vec<DataFrame>) -> PolarsResult<DataFrame> {
    let mut iter = frames.into_iter();
    let mut acc = iter.next().unwrap_or_default();
    for df in iter {
        acc.vstack_mut(&df)?;
    }
    Ok(acc)
}

fn parse_archive(
    payload: ArchiveResponse,
    city: &str,
    url: &str,
) -> Result<Option<DataFrame>, FetchError> {
    let Some(daily) = payload.daily else {
        return Ok(None);
    };
    if daily.time.is_empty() {
        return Ok(None);
    }

    let n = daily.time.len();
    for (name, len) in [
        (COL_TMAX, daily.temperature_2m_max.len()),
        (COL_TMIN, daily.temperature_2m_min.len()),
        (COL_PRCP, daily.precipitation_sum.len()),
    ] {
        if len != n {
            return Err(FetchError::MalformedPayload {
                url: url.to_string(),
                message: format!("'{name}' has {len} values for {n} days"),
            });
        }
    }

    let df = df!(
        COL_TIME => daily.time,
        COL_TMAX => daily.temperature_2m_max,
        COL_TMIN => daily.temperature_2m_min,
        COL_PRCP => daily.precipitation_sum,
        COL_CITY => vec![city; n],
    )
    .map_err(|source| FetchError::DataFrameProcessing {
        location: city.to_string(),
        source,
    })?;
    Ok(Some(df))
}
