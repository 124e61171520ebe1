use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use rainfall::columns::*;
use rainfall::{
    Advisory, DashboardInputs, FeatureVector, ModelStore, ParamGrid, Pipeline, PipelineConfig,
    RainfallError, Season, TimeSeriesSplit, TrainingConfig,
};
use std::fs::File;
use std::path::Path;

const DAYS: usize = 240;

/// Two cities of daily observations with a few gaps, shaped like the combined file.
fn write_combined(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).ok_or("bad date")?;
    let mut city = Vec::new();
    let mut time = Vec::new();
    let mut tmax = Vec::new();
    let mut tmin = Vec::new();
    let mut prcp = Vec::new();
    let mut rhum = Vec::new();
    let mut cloud = Vec::new();
    let mut soil = Vec::new();

    // Yola first so combining has something to reorder.
    for (offset, name) in [(3usize, "Yola"), (0, "Gombe")] {
        for d in 0..DAYS {
            let date = start + Duration::days(d as i64);
            let wet = (6..=9).contains(&date.month());
            let humidity = 35.0 + ((d * 7 + offset) % 50) as f64 + if wet { 15.0 } else { 0.0 };
            city.push(name);
            time.push(date.format("%Y-%m-%d").to_string());
            tmax.push(if d % 37 == 5 { None } else { Some(33.0 - (d % 6) as f64) });
            tmin.push(21.0 + (d % 4) as f64);
            prcp.push(if humidity > 70.0 { (humidity - 70.0) / 2.0 } else { 0.0 });
            rhum.push(if d % 29 == 11 { None } else { Some(humidity) });
            cloud.push(0.1 + (d % 9) as f64 / 10.0);
            soil.push(0.15 + (humidity / 1000.0));
        }
    }

    let mut df = df!(
        COL_CITY => city,
        COL_TIME => time,
        COL_TMAX => tmax,
        COL_TMIN => tmin,
        COL_PRCP => prcp,
        COL_RHUM => rhum,
        COL_CLOUD => cloud,
        COL_SOIL => soil,
    )?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

fn config(data_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: Some(data_dir.to_path_buf()),
        training: TrainingConfig {
            n_splits: 3,
            grid: ParamGrid {
                n_estimators: vec![8, 16],
                max_depth: vec![Some(6), None],
                min_samples_split: vec![2, 5],
            },
        },
        ..PipelineConfig::default()
    }
}

fn scenario() -> FeatureVector {
    FeatureVector {
        temperature_2m_max: 30.0,
        temperature_2m_min: 20.0,
        relative_humidity_2m: 60.0,
        cloud_cover_proxy: 50.0,
        precipitation_lag1: 0.0,
        precipitation_lag2: 0.0,
        is_monsoon: true,
        season: Season::Summer,
        temp_rolling_7: 30.0,
    }
}

#[test]
fn engineer_train_save_and_predict() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let pipeline = Pipeline::new(config(tmp.path()))?;
    write_combined(&tmp.path().join(&pipeline.config().combined_file))?;

    let engineered = pipeline.engineer()?;
    assert_eq!(engineered.height(), 2 * DAYS);
    for name in [COL_TMAX, COL_RHUM, COL_SOIL] {
        assert_eq!(engineered.column(name)?.null_count(), 0, "{name}");
    }

    let (report, path) = pipeline.train()?;
    assert_eq!(report.version, 1);
    assert_eq!(report.candidates.len(), 8);
    assert!(report.best_mae.is_finite() && report.best_mae >= 0.0);
    // First two rows of each city lack lags, the first six lack a rolling mean.
    assert_eq!(report.excluded_rows, 2 * 6);
    assert_eq!(path, tmp.path().join("rainfall_model_v1.bin"));

    let loaded = ModelStore::load(&path)?;
    let prediction = loaded.predict(&scenario())?;
    assert!(prediction.is_finite() && prediction >= 0.0);

    let forecaster = pipeline.forecaster()?;
    let forecast = forecaster.forecast(&DashboardInputs {
        max_temp: 30.0,
        min_temp: 20.0,
        humidity: 60.0,
        cloud_cover: 50.0,
        month: 7,
    })?;
    assert_eq!(forecast.precipitation, prediction);
    assert_eq!(forecast.advisory, Advisory::from_precipitation(prediction));
    assert_eq!(forecast.season, Season::Summer);
    assert!(forecaster.history().is_some());
    Ok(())
}

#[test]
fn retraining_adds_a_version_with_the_same_model() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let pipeline = Pipeline::new(config(tmp.path()))?;
    write_combined(&tmp.path().join(&pipeline.config().combined_file))?;
    pipeline.engineer()?;

    let (first, first_path) = pipeline.train()?;
    let (second, second_path) = pipeline.train()?;
    assert_eq!(second.version, first.version + 1);
    assert!(first_path.exists() && second_path.exists());

    let a = ModelStore::load(&first_path)?;
    let b = ModelStore::load(&second_path)?;
    assert_eq!(a.params, b.params);
    assert_eq!(a.predict(&scenario())?, b.predict(&scenario())?);
    assert_eq!(pipeline.model_store().load_latest()?.version, 2);
    Ok(())
}

#[test]
fn folds_never_train_on_the_future() -> Result<(), Box<dyn std::error::Error>> {
    // Two cities share every date, so each date appears twice.
    let dates: Vec<i32> = (0..100).flat_map(|d| [d, d]).collect();
    let folds = TimeSeriesSplit::new(5).split(&dates)?;
    assert_eq!(folds.len(), 5);

    for fold in &folds {
        let train_max = dates[fold.train_indices.clone()].iter().max().ok_or("empty train")?;
        let test_min = dates[fold.test_indices.clone()].iter().min().ok_or("empty test")?;
        assert!(train_max < test_min, "fold {}", fold.fold);
    }
    Ok(())
}

#[test]
fn summary_reads_the_feature_table() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let pipeline = Pipeline::new(config(tmp.path()))?;
    assert!(matches!(
        pipeline.history(),
        Err(RainfallError::HistoryRead(..))
    ));

    write_combined(&tmp.path().join(&pipeline.config().combined_file))?;
    pipeline.engineer()?;
    let summary = pipeline.summarize(&pipeline.history()?)?;

    assert_eq!(summary.locations.height(), 2);
    assert_eq!(summary.monthly.height(), 8);
    assert!(summary.seasonal.column(COL_SEASON).is_ok());
    Ok(())
}
