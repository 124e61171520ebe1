//! Named sites the pipeline collects data for.

use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use rainfall::LatLon;
///
/// let gombe = LatLon(10.29, 11.17);
/// assert_eq!(gombe.0, 10.29); // Latitude
/// assert_eq!(gombe.1, 11.17); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// A named site with its coordinates.
///
/// The name doubles as the value of the `city` column and as the prefix of the
/// per-location CSV files (`{name}_basic.csv`, `{name}_enhanced.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coordinates: LatLon,
}

impl Location {
    pub fn new(name: impl Into<String>, coordinates: LatLon) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates.0
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates.1
    }

    pub(crate) fn basic_file_name(&self) -> String {
        format!("{}_basic.csv", self.name)
    }

    pub(crate) fn enhanced_file_name(&self) -> String {
        format!("{}_enhanced.csv", self.name)
    }
}

/// The four sites of the north-eastern Nigeria study area.
pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Gombe", LatLon(10.29, 11.17)),
        Location::new("Bauchi", LatLon(10.31, 9.84)),
        Location::new("Potiskum", LatLon(11.71, 11.08)),
        Location::new("Yola", LatLon(9.21, 12.48)),
    ]
}
