//! Merges the per-location enhanced files into one table.

use crate::fetch::error::FetchError;
use crate::frame::{read_dated_csv, sort_unique_by_city_time, write_csv};
use crate::types::columns::{BASIC_COLUMNS, ENHANCED_COLUMNS};
use crate::types::location::Location;
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct CombineSummary {
    pub path: PathBuf,
    pub locations: Vec<String>,
    pub rows: usize,
    pub duplicates_dropped: usize,
}

/// Reads one enhanced file with every measurement column as `Float64`. An all-empty
/// column would otherwise be inferred as a string and break the concatenation.
fn read_enhanced(path: &Path) -> PolarsResult<DataFrame> {
    let measurements: Vec<Expr> = BASIC_COLUMNS
        .iter()
        .chain(ENHANCED_COLUMNS.iter())
        .map(|name| col(*name).cast(DataType::Float64))
        .collect();
    read_dated_csv(path)?
        .lazy()
        .with_columns(measurements)
        .collect()
}

/// Concatenates `{name}_enhanced.csv` for every location found in `data_dir`, drops
/// duplicate (city, time) rows keeping the first, sorts by (city, time) and writes
/// `out_file`. Locations whose enhanced file is missing or unreadable are skipped
/// with a warning.
pub fn combine_locations(
    locations: &[Location],
    data_dir: &Path,
    out_file: &str,
) -> Result<CombineSummary, FetchError> {
    let mut frames = Vec::new();
    let mut found = Vec::new();

    for location in locations {
        let path = data_dir.join(location.enhanced_file_name());
        if !path.exists() {
            warn!("No enhanced data for {}, skipping", location.name);
            continue;
        }
        match read_enhanced(&path) {
            Ok(df) => {
                frames.push(df.lazy());
                found.push(location.name.clone());
            }
            Err(e) => warn!(
                "Skipping {}, failed to read {}: {}",
                location.name,
                path.display(),
                e
            ),
        }
    }

    if frames.is_empty() {
        return Err(FetchError::NothingToCombine);
    }

    let processing = |source| FetchError::DataFrameProcessing {
        location: found.join(","),
        source,
    };
    let all = concat(frames, UnionArgs::default())
        .and_then(LazyFrame::collect)
        .map_err(processing)?;
    let total = all.height();

    let mut combined = sort_unique_by_city_time(all.lazy())
        .collect()
        .map_err(processing)?;
    let rows = combined.height();

    let out = data_dir.join(out_file);
    write_csv(&mut combined, &out).map_err(|e| FetchError::CsvWrite(out.clone(), e))?;
    info!(
        "Combined {} locations into {} ({} rows, {} duplicates dropped)",
        found.len(),
        out.display(),
        rows,
        total - rows
    );

    Ok(CombineSummary {
        path: out,
        locations: found,
        rows,
        duplicates_dropped: total - rows,
    })
}
