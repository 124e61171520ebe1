//! Humidity, clear-sky albedo and top-soil wetness from NASA POWER, merged onto the
//! basic series year by year.

use crate::config::FetchConfig;
use crate::fetch::error::FetchError;
use crate::fetch::http::{build_client, get_json};
use crate::frame::{read_dated_csv, write_csv};
use crate::types::columns::*;
use crate::types::location::Location;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const POWER_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";

/// POWER's marker for a missing value.
const FILL_VALUE: f64 = -999.0;

const PARAM_RHUM: &str = "RH2M";
const PARAM_CLOUD: &str = "CLRSKY_SRF_ALB";
const PARAM_SOIL: &str = "GWETTOP";

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Enhances `{name}_basic.csv` files with NASA POWER parameters.
pub struct NasaPowerFetcher {
    client: Client,
    base_url: String,
    config: FetchConfig,
}

impl NasaPowerFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Self::with_base_url(config, POWER_URL)
    }

    pub fn with_base_url(config: &FetchConfig, base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(config.timeout())?,
            base_url: base_url.to_string(),
            config: config.clone(),
        })
    }

    fn year_query(location: &Location, year: i32) -> Vec<(&'static str, String)> {
        vec![
            ("parameters", [PARAM_RHUM, PARAM_CLOUD, PARAM_SOIL].join(",")),
            ("latitude", location.latitude().to_string()),
            ("longitude", location.longitude().to_string()),
            ("start", format!("{year}0101")),
            ("end", format!("{year}1231")),
            ("community", "AG".to_string()),
            ("format", "JSON".to_string()),
        ]
    }

    async fn fetch_year(&self, location: &Location, year: i32) -> Result<DataFrame, FetchError> {
        let query = Self::year_query(location, year);
        let payload: PowerResponse = get_json(&self.client, &self.base_url, &query).await?;
        parse_power(payload, &self.base_url)
    }

    /// Reads `{name}_basic.csv` from `data_dir`, merges NASA parameters per year and
    /// writes `{name}_enhanced.csv`. Years whose NASA request fails are dropped.
    ///
    /// A missing basic file is logged and yields `Ok(None)`.
    pub async fn enhance_location(
        &self,
        location: &Location,
        data_dir: &Path,
    ) -> Result<Option<PathBuf>, FetchError> {
        info!("Enhancing {} data", location.name);
        let basic_path = data_dir.join(location.basic_file_name());
        if !basic_path.exists() {
            warn!("No basic data found for {} at {}", location.name, basic_path.display());
            return Ok(None);
        }
        let basic =
            read_dated_csv(&basic_path).map_err(|e| FetchError::CsvRead(basic_path.clone(), e))?;

        let processing = |source| FetchError::DataFrameProcessing {
            location: location.name.clone(),
            source,
        };

        let years = distinct_years(&basic).map_err(processing)?;
        let mut merged_years: Vec<DataFrame> = Vec::new();

        for (idx, year) in years.into_iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.config.nasa_delay()).await;
            }
            let nasa = match self.fetch_year(location, year).await {
                Ok(df) if df.height() > 0 => df,
                Ok(_) => {
                    warn!("NASA POWER returned no rows for {} {}", location.name, year);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {} {}: {}", location.name, year, e);
                    continue;
                }
            };
            let merged = basic
                .clone()
                .lazy()
                .filter(col(COL_TIME).dt().year().eq(lit(year)))
                .left_join(nasa.lazy(), col(COL_TIME), col(COL_TIME))
                .collect()
                .map_err(processing)?;
            merged_years.push(merged);
        }

        if merged_years.is_empty() {
            warn!("No enhanced data for {}", location.name);
            return Ok(None);
        }

        let frames: Vec<LazyFrame> = merged_years.into_iter().map(DataFrame::lazy).collect();
        let mut enhanced = concat(frames, UnionArgs::default())
            .and_then(LazyFrame::collect)
            .map_err(processing)?;

        let out = data_dir.join(location.enhanced_file_name());
        write_csv(&mut enhanced, &out).map_err(|e| FetchError::CsvWrite(out.clone(), e))?;
        info!("Saved enhanced data for {} to {}", location.name, out.display());
        Ok(Some(out))
    }
}

fn distinct_years(df: &DataFrame) -> PolarsResult<Vec<i32>> {
    let years = df
        .clone()
        .lazy()
        .select([col(COL_TIME).dt().year().unique().sort(Default::default()).alias("year")])
        .collect()?;
    Ok(years.column("year")?.i32()?.into_iter().flatten().collect())
}

fn fill_to_null(value: f64) -> Option<f64> {
    (value != FILL_VALUE).then_some(value)
}

fn parse_power(payload: PowerResponse, url: &str) -> Result<DataFrame, FetchError> {
    let params = payload.properties.parameter;
    let series = |name: &str| {
        params.get(name).ok_or_else(|| FetchError::MalformedPayload {
            url: url.to_string(),
            message: format!("missing parameter '{name}'"),
        })
    };
    let rhum = series(PARAM_RHUM)?;
    let cloud = series(PARAM_CLOUD)?;
    let soil = series(PARAM_SOIL)?;

    let mut dates = Vec::with_capacity(rhum.len());
    let mut humidity = Vec::with_capacity(rhum.len());
    let mut cloud_cover = Vec::with_capacity(rhum.len());
    let mut soil_moisture = Vec::with_capacity(rhum.len());

    for (key, value) in rhum {
        let date = NaiveDate::parse_from_str(key, "%Y%m%d").map_err(|e| {
            FetchError::MalformedPayload {
                url: url.to_string(),
                message: format!("bad date key '{key}': {e}"),
            }
        })?;
        dates.push(date);
        humidity.push(fill_to_null(*value));
        cloud_cover.push(cloud.get(key).copied().and_then(fill_to_null));
        soil_moisture.push(soil.get(key).copied().and_then(fill_to_null));
    }

    df!(
        COL_TIME => dates,
        COL_RHUM => humidity,
        COL_CLOUD => cloud_cover,
        COL_SOIL => soil_moisture,
    )
    .map_err(|source| FetchError::DataFrameProcessing {
        location: url.to_string(),
        source,
    })
}
