//! Aggregations the front-end charts are drawn from.

use crate::types::columns::*;
use crate::types::location::Location;
use polars::prelude::*;

pub const COL_MEAN_PRCP: &str = "mean_precipitation";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

/// Mean precipitation per location with its coordinates, ordered by name.
/// Cities in the table but not in `locations` get null coordinates.
pub fn location_means(history: &DataFrame, locations: &[Location]) -> PolarsResult<DataFrame> {
    let coordinates = df!(
        COL_CITY => locations.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
        COL_LATITUDE => locations.iter().map(Location::latitude).collect::<Vec<_>>(),
        COL_LONGITUDE => locations.iter().map(Location::longitude).collect::<Vec<_>>(),
    )?;

    history
        .clone()
        .lazy()
        .group_by([col(COL_CITY)])
        .agg([col(COL_PRCP).mean().alias(COL_MEAN_PRCP)])
        .left_join(coordinates.lazy(), col(COL_CITY), col(COL_CITY))
        .sort([COL_CITY], SortMultipleOptions::default())
        .collect()
}

/// Mean precipitation per calendar (year, month) across all locations.
pub fn monthly_means(history: &DataFrame) -> PolarsResult<DataFrame> {
    history
        .clone()
        .lazy()
        .group_by([col(COL_YEAR), col(COL_MONTH)])
        .agg([col(COL_PRCP).mean().alias(COL_MEAN_PRCP)])
        .sort([COL_YEAR, COL_MONTH], SortMultipleOptions::default())
        .collect()
}

/// Mean precipitation per (location, season).
pub fn seasonal_means(history: &DataFrame) -> PolarsResult<DataFrame> {
    history
        .clone()
        .lazy()
        .group_by([col(COL_CITY), col(COL_SEASON)])
        .agg([col(COL_PRCP).mean().alias(COL_MEAN_PRCP)])
        .sort([COL_CITY, COL_SEASON], SortMultipleOptions::default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::location::LatLon;

    fn history() -> PolarsResult<DataFrame> {
        df!(
            COL_CITY => ["Yola", "Yola", "Gombe", "Gombe", "Gombe"],
            COL_YEAR => [2020, 2020, 2020, 2020, 2021],
            COL_MONTH => [7, 7, 7, 1, 1],
            COL_SEASON => ["Summer", "Summer", "Summer", "Winter", "Winter"],
            COL_PRCP => [Some(10.0), Some(20.0), Some(4.0), Some(0.0), None],
        )
    }

    #[test]
    fn location_means_carry_coordinates() -> PolarsResult<()> {
        let locations = vec![
            Location::new("Gombe", LatLon(10.29, 11.17)),
            Location::new("Yola", LatLon(9.21, 12.48)),
        ];
        let out = location_means(&history()?, &locations)?;

        let cities: Vec<Option<&str>> = out.column(COL_CITY)?.str()?.into_iter().collect();
        assert_eq!(cities, vec![Some("Gombe"), Some("Yola")]);
        let means: Vec<Option<f64>> = out.column(COL_MEAN_PRCP)?.f64()?.into_iter().collect();
        assert_eq!(means, vec![Some(2.0), Some(15.0)]);
        let lat: Vec<Option<f64>> = out.column(COL_LATITUDE)?.f64()?.into_iter().collect();
        assert_eq!(lat, vec![Some(10.29), Some(9.21)]);
        Ok(())
    }

    #[test]
    fn monthly_means_are_chronological() -> PolarsResult<()> {
        let out = monthly_means(&history()?)?;
        assert_eq!(out.height(), 3);
        let means: Vec<Option<f64>> = out.column(COL_MEAN_PRCP)?.f64()?.into_iter().collect();
        // 2020-01, 2020-07, 2021-01 (all nulls)
        assert_eq!(means, vec![Some(0.0), Some(34.0 / 3.0), None]);
        Ok(())
    }

    #[test]
    fn seasonal_means_group_by_city_and_season() -> PolarsResult<()> {
        let out = seasonal_means(&history()?)?;
        let seasons: Vec<Option<&str>> = out.column(COL_SEASON)?.str()?.into_iter().collect();
        assert_eq!(seasons, vec![Some("Summer"), Some("Winter"), Some("Summer")]);
        let means: Vec<Option<f64>> = out.column(COL_MEAN_PRCP)?.f64()?.into_iter().collect();
        assert_eq!(means, vec![Some(4.0), Some(0.0), Some(15.0)]);
        Ok(())
    }
}
