//! Raw data collection: remote fetchers and the per-location combiner.

pub mod combine;
pub mod error;
mod http;
pub mod nasa_power;
pub mod open_meteo;
