//! Prediction facade and the front-end's summary queries.

pub mod dashboard;
pub mod summary;
