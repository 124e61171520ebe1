//! Versioned, immutable model artifacts on disk.

pub mod error;
pub mod store;
