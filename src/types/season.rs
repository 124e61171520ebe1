//! Month based seasonal encodings.
//!
//! Seasons are quarter bins with open-low, closed-high boundaries over the month
//! number: (0,3] Winter, (3,6] Spring, (6,9] Summer, (9,12] Autumn. Month 6 is
//! therefore Spring and month 9 is Summer.

use crate::types::columns::COL_MONTH;
use polars::prelude::{col, lit, when, Expr, NULL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Months counted as the rainy season.
pub const MONSOON_MONTHS: [u32; 4] = [6, 7, 8, 9];

/// Quarter based season label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

/// Upper (inclusive) month bound of each bin, in ascending order.
const SEASON_BINS: [(u32, Season); 4] = [
    (3, Season::Winter),
    (6, Season::Spring),
    (9, Season::Summer),
    (12, Season::Autumn),
];

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// Bins a month number. Returns `None` outside `1..=12`.
    ///
    /// ```
    /// use rainfall::Season;
    ///
    /// assert_eq!(Season::from_month(3), Some(Season::Winter));
    /// assert_eq!(Season::from_month(6), Some(Season::Spring));
    /// assert_eq!(Season::from_month(7), Some(Season::Summer));
    /// assert_eq!(Season::from_month(13), None);
    /// ```
    pub fn from_month(month: u32) -> Option<Season> {
        if month == 0 {
            return None;
        }
        SEASON_BINS
            .iter()
            .find(|(upper, _)| month <= *upper)
            .map(|(_, season)| *season)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|season| season.as_str() == s)
            .ok_or_else(|| format!("unknown season '{s}'"))
    }
}

pub fn is_monsoon_month(month: u32) -> bool {
    MONSOON_MONTHS.contains(&month)
}

/// Polars expression producing the season label from the `month` column.
/// Months outside `1..=12` become null.
pub(crate) fn season_expr() -> Expr {
    let month = || col(COL_MONTH);
    let [(b0, s0), (b1, s1), (b2, s2), (b3, s3)] = SEASON_BINS;
    when(month().gt(lit(0)).and(month().lt_eq(lit(b0))))
        .then(lit(s0.as_str()))
        .when(month().gt(lit(b0)).and(month().lt_eq(lit(b1))))
        .then(lit(s1.as_str()))
        .when(month().gt(lit(b1)).and(month().lt_eq(lit(b2))))
        .then(lit(s2.as_str()))
        .when(month().gt(lit(b2)).and(month().lt_eq(lit(b3))))
        .then(lit(s3.as_str()))
        .otherwise(lit(NULL))
}

/// Polars expression producing the 0/1 monsoon flag from the `month` column.
pub(crate) fn monsoon_expr() -> Expr {
    let first = MONSOON_MONTHS[0];
    let last = MONSOON_MONTHS[MONSOON_MONTHS.len() - 1];
    col(COL_MONTH)
        .gt_eq(lit(first))
        .and(col(COL_MONTH).lt_eq(lit(last)))
}
