//! Polars helpers shared by the pipeline stages.

use crate::types::columns::{COL_CITY, COL_TIME};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads a headered CSV file eagerly.
pub(crate) fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

/// Writes a DataFrame as a headered CSV file, replacing any existing file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> PolarsResult<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)
}

/// Converts a `YYYY-MM-DD` string `time` column into a `Date` column.
/// Columns that are already dates are left as they are.
pub(crate) fn parse_time(lf: LazyFrame, dtype: &DataType) -> LazyFrame {
    if matches!(dtype, DataType::Date) {
        return lf;
    }
    lf.with_column(
        col(COL_TIME)
            .str()
            .to_date(StrptimeOptions {
                format: Some(DATE_FORMAT.into()),
                strict: true,
                ..Default::default()
            })
            .alias(COL_TIME),
    )
}

/// Reads a CSV with a `time` column and parses it into dates.
pub(crate) fn read_dated_csv(path: &Path) -> PolarsResult<DataFrame> {
    let df = read_csv(path)?;
    let dtype = df.column(COL_TIME)?.dtype().clone();
    parse_time(df.lazy(), &dtype).collect()
}

/// Sorts by (city, time) and keeps the first row of every (city, time) pair.
///
/// The sort is stable, so "first" means first in input order.
pub(crate) fn sort_unique_by_city_time(lf: LazyFrame) -> LazyFrame {
    let is_new_key = col(COL_CITY)
        .neq(col(COL_CITY).shift(lit(1)))
        .or(col(COL_TIME).neq(col(COL_TIME).shift(lit(1))))
        .fill_null(lit(true));
    lf.sort(
        [COL_CITY, COL_TIME],
        SortMultipleOptions::default().with_maintain_order(true),
    )
    .filter(is_new_key)
}

/// Extracts a float column as options, casting integer columns.
pub(crate) fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}
