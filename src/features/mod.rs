//! Feature engineering over the combined observation table.

pub mod engineer;
pub mod error;
pub mod imputation;
