mod artifact;
mod config;
mod error;
mod features;
mod fetch;
mod forecast;
mod frame;
mod pipeline;
mod training;
mod types;
mod utils;

pub use config::*;
pub use error::RainfallError;
pub use pipeline::*;

pub use artifact::error::ArtifactError;
pub use artifact::store::{ModelStore, ARTIFACT_FORMAT};

pub use features::engineer::{FeatureEngineer, ROLLING_WINDOW};
pub use features::error::FeatureError;
pub use features::imputation::{Imputed, IterativeImputer};

pub use fetch::combine::{combine_locations, CombineSummary};
pub use fetch::error::FetchError;
pub use fetch::nasa_power::NasaPowerFetcher;
pub use fetch::open_meteo::OpenMeteoFetcher;

pub use forecast::dashboard::*;
pub use forecast::summary::*;

pub use training::dataset::TrainingSet;
pub use training::decision_tree::{RegressionTree, TreeNode};
pub use training::error::TrainingError;
pub use training::grid_search::{CandidateScore, ForestParams, GridSearch, ParamGrid, SearchOutcome};
pub use training::metrics::{masked_mae, MaeScore};
pub use training::{train, RainfallModel};
pub use training::preprocessor::{OneHotEncoder, Preprocessor, StandardScaler};
pub use training::random_forest::RandomForestRegressor;
pub use training::report::{rank_importances, FeatureImportance, TrainingReport};
pub use training::split::{Fold, TimeSeriesSplit};

pub use types::columns;
pub use types::feature_vector::*;
pub use types::location::*;
pub use types::season::{is_monsoon_month, Season, MONSOON_MONTHS};
