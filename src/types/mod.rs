pub mod columns;
pub mod feature_vector;
pub mod location;
pub mod season;
