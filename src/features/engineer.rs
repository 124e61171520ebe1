//! Turns the combined observation table into the engineered feature table.

use crate::config::ImputationConfig;
use crate::features::error::FeatureError;
use crate::features::imputation::IterativeImputer;
use crate::frame::{f64_values, parse_time, read_csv, sort_unique_by_city_time, write_csv};
use crate::types::columns::*;
use crate::types::season::{monsoon_expr, season_expr};
use log::{info, warn};
use ndarray::Array2;
use polars::prelude::*;
use std::ops::Range;
use std::path::Path;

/// Trailing window of the rolling max-temperature mean.
pub const ROLLING_WINDOW: usize = 7;

const REQUIRED_COLUMNS: [&str; 8] = [
    COL_CITY, COL_TIME, COL_TMAX, COL_TMIN, COL_PRCP, COL_RHUM, COL_CLOUD, COL_SOIL,
];

#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    imputer: IterativeImputer,
}

impl FeatureEngineer {
    pub fn new(config: &ImputationConfig, seed: u64) -> Self {
        Self {
            imputer: IterativeImputer::from_config(config, seed),
        }
    }

    /// Derives calendar, imputed, lag, rolling, monsoon and season columns.
    ///
    /// Rows come out sorted by (city, time) with one row per pair. Lag and rolling
    /// values never look across a city boundary.
    pub fn engineer(&self, combined: DataFrame) -> Result<DataFrame, FeatureError> {
        for name in REQUIRED_COLUMNS {
            combined
                .column(name)
                .map_err(|e| FeatureError::MissingColumn(name.to_string(), e))?;
        }
        let time_dtype = combined.column(COL_TIME)?.dtype().clone();

        let mut df = sort_unique_by_city_time(parse_time(combined.lazy(), &time_dtype))
            .with_columns([
                col(COL_TIME).dt().year().cast(DataType::Int32).alias(COL_YEAR),
                col(COL_TIME).dt().month().cast(DataType::Int32).alias(COL_MONTH),
                col(COL_TIME)
                    .dt()
                    .ordinal_day()
                    .cast(DataType::Int32)
                    .alias(COL_DAY_OF_YEAR),
            ])
            .collect()?;

        self.impute(&mut df)?;

        let cities: Vec<Option<String>> = df
            .column(COL_CITY)?
            .str()?
            .into_iter()
            .map(|c| c.map(str::to_string))
            .collect();
        let runs = city_runs(&cities);
        let precipitation = f64_values(&df, COL_PRCP)?;
        let max_temp = f64_values(&df, COL_TMAX)?;

        df.with_column(Column::new(COL_PRCP_LAG1.into(), lag(&precipitation, &runs, 1)))?;
        df.with_column(Column::new(COL_PRCP_LAG2.into(), lag(&precipitation, &runs, 2)))?;

        let mut engineered = df
            .lazy()
            .with_columns([
                monsoon_expr().cast(DataType::Int32).alias(COL_MONSOON),
                season_expr().alias(COL_SEASON),
            ])
            .collect()?;
        engineered.with_column(Column::new(
            COL_TMAX_ROLLING_7.into(),
            trailing_mean(&max_temp, &runs, ROLLING_WINDOW),
        ))?;

        info!(
            "Engineered {} rows across {} locations",
            engineered.height(),
            runs.len()
        );
        Ok(engineered)
    }

    /// Reads the combined CSV, engineers it, and writes the result to `output`.
    pub fn engineer_file(&self, input: &Path, output: &Path) -> Result<DataFrame, FeatureError> {
        let combined = read_csv(input).map_err(|e| FeatureError::CsvRead(input.to_path_buf(), e))?;
        let mut engineered = self.engineer(combined)?;
        write_csv(&mut engineered, output)
            .map_err(|e| FeatureError::CsvWrite(output.to_path_buf(), e))?;
        info!("Saved engineered features to {}", output.display());
        Ok(engineered)
    }

    fn impute(&self, df: &mut DataFrame) -> Result<(), FeatureError> {
        let rows = df.height();
        let mut matrix = Array2::<f64>::from_elem((rows, IMPUTED_COLUMNS.len()), f64::NAN);
        for (j, name) in IMPUTED_COLUMNS.iter().enumerate() {
            for (i, value) in f64_values(df, name)?.into_iter().enumerate() {
                if let Some(v) = value {
                    matrix[[i, j]] = v;
                }
            }
        }

        let missing = matrix.iter().filter(|v| v.is_nan()).count();
        let imputed = self.imputer.fit_transform(&IMPUTED_COLUMNS, &matrix)?;
        if imputed.converged {
            info!("Imputed {} cells in {} rounds", missing, imputed.iterations);
        } else {
            warn!(
                "Imputation stopped after {} rounds without converging ({} cells)",
                imputed.iterations, missing
            );
        }

        for (j, name) in IMPUTED_COLUMNS.iter().enumerate() {
            let values: Vec<f64> = imputed.data.column(j).to_vec();
            df.with_column(Column::new((*name).into(), values))?;
        }
        Ok(())
    }
}

/// Contiguous index ranges sharing the same city. Input must be grouped by city.
pub(crate) fn city_runs(cities: &[Option<String>]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=cities.len() {
        if i == cities.len() || cities[i] != cities[start] {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

/// Value `n` rows back within the same run; null for the first `n` rows of a run.
pub(crate) fn lag(values: &[Option<f64>], runs: &[Range<usize>], n: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    for run in runs {
        for i in run.clone().skip(n) {
            out[i] = values[i - n];
        }
    }
    out
}

/// Mean over the trailing `window` rows of the same run. Null until the window is
/// full, or when any value in it is null.
pub(crate) fn trailing_mean(
    values: &[Option<f64>],
    runs: &[Range<usize>],
    window: usize,
) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for run in runs {
        for i in run.clone().skip(window - 1) {
            let slice = &values[i + 1 - window..=i];
            out[i] = slice
                .iter()
                .copied()
                .sum::<Option<f64>>()
                .map(|sum| sum / window as f64);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::season::Season;

    fn dates(n: usize, start_month: u32) -> Vec<String> {
        (0..n)
            .map(|d| format!("2020-{:02}-{:02}", start_month, d + 1))
            .collect()
    }

    fn combined_frame() -> PolarsResult<DataFrame> {
        // Yola listed before Gombe and out of date order on purpose.
        let mut yola_days = dates(8, 6);
        yola_days.reverse();
        let gombe_days = dates(8, 3);
        let time: Vec<String> = yola_days.iter().chain(gombe_days.iter()).cloned().collect();
        let city: Vec<&str> = [vec!["Yola"; 8], vec!["Gombe"; 8]].concat();
        let prcp: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let tmax: Vec<Option<f64>> = (0..16)
            .map(|i| if i == 3 { None } else { Some(30.0 + i as f64) })
            .collect();
        let rhum: Vec<Option<f64>> = (0..16)
            .map(|i| if i % 5 == 0 { None } else { Some(40.0 + i as f64) })
            .collect();
        df!(
            COL_TIME => time,
            COL_TMAX => tmax,
            COL_TMIN => vec![20.0; 16],
            COL_PRCP => prcp,
            COL_CITY => city,
            COL_RHUM => rhum,
            COL_CLOUD => vec![0.2; 16],
            COL_SOIL => (0..16).map(|i| 0.1 + i as f64 / 100.0).collect::<Vec<f64>>(),
        )
    }

    fn engineered() -> Result<DataFrame, FeatureError> {
        FeatureEngineer::default().engineer(combined_frame()?)
    }

    #[test]
    fn rows_sorted_per_city_without_duplicates() -> Result<(), Box<dyn std::error::Error>> {
        let mut input = combined_frame()?;
        let dup = input.slice(0, 1);
        input.vstack_mut(&dup)?;
        let df = FeatureEngineer::default().engineer(input)?;

        assert_eq!(df.height(), 16);
        let cities: Vec<Option<&str>> = df.column(COL_CITY)?.str()?.into_iter().collect();
        let days: Vec<Option<i32>> = df
            .column(COL_TIME)?
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .collect();
        for i in 1..df.height() {
            if cities[i] == cities[i - 1] {
                assert!(days[i] > days[i - 1], "row {i} not strictly after row {}", i - 1);
            }
        }
        assert_eq!(cities[0], Some("Gombe"));
        Ok(())
    }

    #[test]
    fn lags_follow_each_city_series() -> Result<(), Box<dyn std::error::Error>> {
        let df = engineered()?;
        let cities: Vec<Option<&str>> = df.column(COL_CITY)?.str()?.into_iter().collect();
        let prcp = f64_values(&df, COL_PRCP)?;
        let lag1 = f64_values(&df, COL_PRCP_LAG1)?;
        let lag2 = f64_values(&df, COL_PRCP_LAG2)?;

        for i in 0..df.height() {
            let first = i == 0 || cities[i] != cities[i - 1];
            if first {
                assert_eq!(lag1[i], None);
                assert_eq!(lag2[i], None);
            } else {
                assert_eq!(lag1[i], prcp[i - 1]);
            }
        }
        // Gombe occupies rows 0..8, Yola 8..16.
        assert_eq!(lag2[9], None);
        assert_eq!(lag2[10], prcp[8]);
        Ok(())
    }

    #[test]
    fn rolling_mean_covers_seven_rows_of_one_city() -> Result<(), Box<dyn std::error::Error>> {
        let df = engineered()?;
        let tmax = f64_values(&df, COL_TMAX)?;
        let rolling = f64_values(&df, COL_TMAX_ROLLING_7)?;

        for run in [0..8usize, 8..16] {
            for i in run.clone() {
                if i - run.start < 6 {
                    assert_eq!(rolling[i], None, "row {i}");
                } else {
                    let expected: f64 =
                        tmax[i - 6..=i].iter().map(|v| v.unwrap_or(f64::NAN)).sum::<f64>() / 7.0;
                    let got = rolling[i].expect("window full");
                    assert!((got - expected).abs() < 1e-9, "row {i}: {got} vs {expected}");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn imputed_columns_have_no_nulls() -> Result<(), Box<dyn std::error::Error>> {
        let df = engineered()?;
        for name in IMPUTED_COLUMNS {
            assert_eq!(df.column(name)?.null_count(), 0, "{name}");
        }
        Ok(())
    }

    #[test]
    fn calendar_monsoon_and_season() -> Result<(), Box<dyn std::error::Error>> {
        let df = engineered()?;
        let months: Vec<Option<i32>> = df.column(COL_MONTH)?.i32()?.into_iter().collect();
        let monsoon: Vec<Option<i32>> = df.column(COL_MONSOON)?.i32()?.into_iter().collect();
        let seasons: Vec<Option<&str>> = df.column(COL_SEASON)?.str()?.into_iter().collect();

        // Gombe rows are March, Yola rows are June.
        assert_eq!(months[0], Some(3));
        assert_eq!(months[15], Some(6));
        assert_eq!(monsoon[0], Some(0));
        assert_eq!(monsoon[15], Some(1));
        assert_eq!(seasons[0], Some(Season::Winter.as_str()));
        assert_eq!(seasons[15], Some(Season::Spring.as_str()));

        let doy: Vec<Option<i32>> = df.column(COL_DAY_OF_YEAR)?.i32()?.into_iter().collect();
        // 2020-03-01 in a leap year
        assert_eq!(doy[0], Some(61));
        Ok(())
    }

    #[test]
    fn all_missing_column_fails() -> Result<(), Box<dyn std::error::Error>> {
        let mut input = combined_frame()?;
        input.with_column(Column::full_null(COL_SOIL.into(), 16, &DataType::Float64))?;
        let result = FeatureEngineer::default().engineer(input);
        assert!(matches!(result, Err(FeatureError::ColumnEntirelyMissing(name)) if name == COL_SOIL));
        Ok(())
    }

    #[test]
    fn missing_input_column_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let input = combined_frame()?.drop(COL_CLOUD)?;
        let result = FeatureEngineer::default().engineer(input);
        assert!(matches!(result, Err(FeatureError::MissingColumn(name, _)) if name == COL_CLOUD));
        Ok(())
    }

    #[test]
    fn engineer_file_writes_csv() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let input = tmp.path().join("combined.csv");
        let output = tmp.path().join("engineered.csv");
        write_csv(&mut combined_frame()?, &input)?;

        let df = FeatureEngineer::default().engineer_file(&input, &output)?;
        let back = read_csv(&output)?;
        assert_eq!(back.height(), df.height());
        assert!(back.column(COL_TMAX_ROLLING_7).is_ok());
        Ok(())
    }

    #[test]
    fn helpers_respect_run_boundaries() {
        let cities: Vec<Option<String>> = ["a", "a", "a", "b", "b"]
            .iter()
            .map(|c| Some(c.to_string()))
            .collect();
        let runs = city_runs(&cities);
        assert_eq!(runs, vec![0..3, 3..5]);

        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
        assert_eq!(lag(&values, &runs, 1), vec![None, Some(1.0), Some(2.0), None, Some(4.0)]);
        assert_eq!(trailing_mean(&values, &runs, 2), vec![None, Some(1.5), None, None, Some(4.5)]);
    }
}
