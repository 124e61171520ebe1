//! Model-ready rows extracted from the engineered feature table.

use crate::frame::{f64_values, parse_time};
use crate::training::error::TrainingError;
use crate::types::columns::{COL_CITY, COL_PRCP, COL_SEASON, COL_TIME};
use crate::types::feature_vector::{FEATURE_NAMES, NUMERIC_FEATURES};
use log::info;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use polars::prelude::*;
use std::ops::Range;

/// Eligible rows sorted by (date, city): numeric features, season labels, target and
/// the day number of each row.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub numeric: Array2<f64>,
    pub seasons: Vec<String>,
    pub target: Array1<f64>,
    pub dates: Vec<i32>,
    /// Rows dropped for a null target or feature.
    pub excluded: usize,
}

impl TrainingSet {
    pub fn from_frame(df: &DataFrame) -> Result<Self, TrainingError> {
        for name in FEATURE_NAMES.iter().chain([COL_PRCP, COL_TIME, COL_CITY].iter()) {
            df.column(name)
                .map_err(|e| TrainingError::MissingColumn(name.to_string(), e))?;
        }

        let complete = FEATURE_NAMES
            .iter()
            .chain([COL_PRCP, COL_TIME].iter())
            .fold(lit(true), |acc, name| acc.and(col(*name).is_not_null()));
        let time_dtype = df.column(COL_TIME)?.dtype().clone();
        let eligible = parse_time(df.clone().lazy(), &time_dtype)
            .filter(complete)
            .sort(
                [COL_TIME, COL_CITY],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;

        let rows = eligible.height();
        let excluded = df.height() - rows;
        if rows == 0 {
            return Err(TrainingError::NoEligibleRows);
        }
        info!("{} eligible training rows, {} excluded for nulls", rows, excluded);

        let mut numeric = Array2::<f64>::zeros((rows, NUMERIC_FEATURES.len()));
        for (j, name) in NUMERIC_FEATURES.iter().enumerate() {
            for (i, value) in f64_values(&eligible, name)?.into_iter().enumerate() {
                numeric[[i, j]] = value.unwrap_or(f64::NAN);
            }
        }

        let seasons: Vec<String> = eligible
            .column(COL_SEASON)?
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect();

        let target = Array1::from_iter(
            f64_values(&eligible, COL_PRCP)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN)),
        );

        let dates: Vec<i32> = eligible
            .column(COL_TIME)?
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .map(|d| d.unwrap_or_default())
            .collect();

        Ok(Self {
            numeric,
            seasons,
            target,
            dates,
            excluded,
        })
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn numeric_rows(&self, rows: Range<usize>) -> ArrayView2<'_, f64> {
        self.numeric.slice(s![rows, ..])
    }

    pub fn season_rows(&self, rows: Range<usize>) -> &[String] {
        &self.seasons[rows]
    }

    pub fn target_rows(&self, rows: Range<usize>) -> ArrayView1<'_, f64> {
        self.target.slice(s![rows])
    }

    pub fn all_rows(&self) -> Range<usize> {
        0..self.len()
    }
}
