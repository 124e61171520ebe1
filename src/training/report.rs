use crate::training::grid_search::{CandidateScore, ForestParams};
use log::info;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

/// Summary of a training run. Informational only; nothing downstream reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub version: u32,
    pub best_params: ForestParams,
    pub best_mae: f64,
    pub candidates: Vec<CandidateScore>,
    /// Highest first.
    pub importances: Vec<FeatureImportance>,
    pub eligible_rows: usize,
    pub excluded_rows: usize,
}

/// Pairs names with importances and sorts them descending. Equal importances keep
/// their input order.
pub fn rank_importances(names: &[String], importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(name, importance)| FeatureImportance {
            name: name.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by_key(|f| Reverse(OrderedFloat(f.importance)));
    ranked
}

impl TrainingReport {
    pub fn log_summary(&self) {
        info!(
            "Model v{}: {} | CV MAE {:.4} | {} rows ({} excluded)",
            self.version, self.best_params, self.best_mae, self.eligible_rows, self.excluded_rows
        );
        for candidate in &self.candidates {
            match candidate.mean_mae {
                Some(mae) => info!("  {} -> {:.4}", candidate.params, mae),
                None => info!("  {} -> failed", candidate.params),
            }
        }
        for (rank, feature) in self.importances.iter().enumerate() {
            info!("  #{} {} {:.4}", rank + 1, feature.name, feature.importance);
        }
    }
}
