//! Random-forest training with time-ordered cross-validated grid search.

pub mod dataset;
pub mod decision_tree;
pub mod error;
pub mod grid_search;
pub mod metrics;
pub mod model;
pub mod preprocessor;
pub mod random_forest;
pub mod report;
pub mod split;

pub use model::{train, RainfallModel};
