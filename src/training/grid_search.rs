//! Exhaustive hyperparameter search scored by time-ordered cross-validation.

use crate::training::dataset::TrainingSet;
use crate::training::error::TrainingError;
use crate::training::metrics::{masked_mae, MaeScore};
use crate::training::preprocessor::Preprocessor;
use crate::training::random_forest::RandomForestRegressor;
use crate::training::split::{Fold, TimeSeriesSplit};
use crate::types::feature_vector::{CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use bon::Builder;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Scores closer than this are treated as tied.
const TIE_EPSILON: f64 = 1e-12;

/// Values tried for each forest parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    /// `None` grows trees until leaves are pure or too small to split.
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200],
            max_depth: vec![Some(10), Some(20), None],
            min_samples_split: vec![2, 5],
        }
    }
}

impl ParamGrid {
    /// Every combination, `n_estimators` varying slowest.
    pub fn candidates(&self) -> Vec<ForestParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    out.push(ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                    });
                }
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.n_estimators.is_empty()
            || self.max_depth.is_empty()
            || self.min_samples_split.is_empty()
        {
            return Err("every grid axis needs at least one value".to_string());
        }
        if self.n_estimators.contains(&0) {
            return Err("n_estimators must be positive".to_string());
        }
        if self.max_depth.contains(&Some(0)) {
            return Err("max_depth must be positive or null".to_string());
        }
        if let Some(v) = self.min_samples_split.iter().find(|v| **v < 2) {
            return Err(format!("min_samples_split must be at least 2, got {v}"));
        }
        Ok(())
    }
}

/// One point of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl ForestParams {
    pub fn forest(&self, random_state: u64) -> RandomForestRegressor {
        RandomForestRegressor::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_random_state(random_state)
    }
}

impl fmt::Display for ForestParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}",
            self.n_estimators, depth, self.min_samples_split
        )
    }
}

/// Cross-validation outcome of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    /// Per-fold MAE; `None` where the fold failed.
    pub fold_maes: Vec<Option<f64>>,
    /// Mean over successful folds; `None` if every fold failed.
    pub mean_mae: Option<f64>,
    pub dropped_predictions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best: ForestParams,
    pub best_mae: f64,
    pub candidates: Vec<CandidateScore>,
}

/// Fits the preprocessor and forest on `rows` of `data`.
pub(crate) fn fit_pipeline(
    params: &ForestParams,
    data: &TrainingSet,
    rows: Range<usize>,
    random_state: u64,
) -> Result<(Preprocessor, RandomForestRegressor), TrainingError> {
    let preprocessor = Preprocessor::fit(
        &NUMERIC_FEATURES,
        CATEGORICAL_FEATURES[0],
        data.numeric_rows(rows.clone()),
        data.season_rows(rows.clone()),
    )?;
    let x = preprocessor.transform(data.numeric_rows(rows.clone()), data.season_rows(rows.clone()))?;
    let y = data.target_rows(rows).to_owned();
    let mut forest = params.forest(random_state);
    forest.fit(&x, &y)?;
    Ok((preprocessor, forest))
}

#[derive(Debug, Clone, Builder)]
pub struct GridSearch {
    #[builder(default)]
    grid: ParamGrid,
    #[builder(default = 5)]
    n_splits: usize,
    #[builder(default = 42)]
    random_state: u64,
}

impl GridSearch {
    fn score_fold(
        &self,
        params: &ForestParams,
        data: &TrainingSet,
        fold: &Fold,
    ) -> Result<MaeScore, TrainingError> {
        let (preprocessor, forest) =
            fit_pipeline(params, data, fold.train_indices.clone(), self.random_state)?;
        let test = fold.test_indices.clone();
        let x = preprocessor.transform(data.numeric_rows(test.clone()), data.season_rows(test.clone()))?;
        let predictions = forest.predict(&x)?;
        masked_mae(data.target_rows(test), predictions.view())
    }

    /// Scores every candidate on every fold in parallel and picks the lowest mean MAE.
    /// Ties go to fewer estimators, then to the earlier grid entry.
    pub fn run(&self, data: &TrainingSet) -> Result<SearchOutcome, TrainingError> {
        self.grid.validate().map_err(TrainingError::InvalidGrid)?;
        let folds = TimeSeriesSplit::new(self.n_splits).split(&data.dates)?;
        let candidates = self.grid.candidates();
        info!(
            "Searching {} candidates x {} folds over {} rows",
            candidates.len(),
            folds.len(),
            data.len()
        );

        let jobs: Vec<(usize, &Fold)> = (0..candidates.len())
            .flat_map(|c| folds.iter().map(move |f| (c, f)))
            .collect();
        let results: Vec<(usize, usize, Result<MaeScore, TrainingError>)> = jobs
            .into_par_iter()
            .map(|(c, fold)| (c, fold.fold, self.score_fold(&candidates[c], data, fold)))
            .collect();

        let mut scores: Vec<CandidateScore> = candidates
            .iter()
            .map(|params| CandidateScore {
                params: *params,
                fold_maes: vec![None; folds.len()],
                mean_mae: None,
                dropped_predictions: 0,
            })
            .collect();
        for (c, fold, result) in results {
            match result {
                Ok(score) => {
                    debug!("[{}] fold {}: MAE {:.4}", candidates[c], fold, score.mae);
                    scores[c].fold_maes[fold] = Some(score.mae);
                    scores[c].dropped_predictions += score.dropped;
                }
                Err(e) => warn!("[{}] fold {} failed: {}", candidates[c], fold, e),
            }
        }
        for score in &mut scores {
            let ok: Vec<f64> = score.fold_maes.iter().flatten().copied().collect();
            if !ok.is_empty() {
                score.mean_mae = Some(ok.iter().sum::<f64>() / ok.len() as f64);
            }
        }

        let (best, best_mae) = select_best(&scores)
            .ok_or(TrainingError::AllCandidatesFailed(scores.len()))?;
        info!("Best parameters: {} (CV MAE {:.4})", best, best_mae);
        Ok(SearchOutcome {
            best,
            best_mae,
            candidates: scores,
        })
    }
}

fn select_best(scores: &[CandidateScore]) -> Option<(ForestParams, f64)> {
    let mut best: Option<(ForestParams, f64)> = None;
    for score in scores {
        let Some(mae) = score.mean_mae else {
            continue;
        };
        let better = match best {
            None => true,
            Some((params, best_mae)) => {
                mae < best_mae - TIE_EPSILON
                    || ((mae - best_mae).abs() <= TIE_EPSILON
                        && score.params.n_estimators < params.n_estimators)
            }
        };
        if better {
            best = Some((score.params, mae));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(n_estimators: usize, depth: Option<usize>, mae: Option<f64>) -> CandidateScore {
        CandidateScore {
            params: ForestParams {
                n_estimators,
                max_depth: depth,
                min_samples_split: 2,
            },
            fold_maes: vec![mae],
            mean_mae: mae,
            dropped_predictions: 0,
        }
    }

    #[test]
    fn default_grid_has_twelve_candidates() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 12);
        assert_eq!(
            candidates[0],
            ForestParams {
                n_estimators: 100,
                max_depth: Some(10),
                min_samples_split: 2
            }
        );
        assert_eq!(candidates[5].max_depth, None);
        assert_eq!(candidates[11].n_estimators, 200);
    }

    #[test]
    fn grid_validation_rejects_bad_values() {
        let mut grid = ParamGrid::default();
        grid.min_samples_split = vec![1];
        assert!(grid.validate().is_err());

        let mut grid = ParamGrid::default();
        grid.max_depth.clear();
        assert!(grid.validate().is_err());

        assert!(ParamGrid::default().validate().is_ok());
    }

    #[test]
    fn lowest_mae_wins() {
        let scores = vec![score(100, Some(10), Some(2.0)), score(200, None, Some(1.5))];
        let (best, mae) = select_best(&scores).unwrap();
        assert_eq!(best.n_estimators, 200);
        assert_eq!(mae, 1.5);
    }

    #[test]
    fn ties_prefer_fewer_estimators_then_grid_order() {
        let scores = vec![
            score(200, Some(10), Some(1.0)),
            score(100, Some(20), Some(1.0)),
            score(100, None, Some(1.0)),
        ];
        let (best, _) = select_best(&scores).unwrap();
        assert_eq!(best.n_estimators, 100);
        assert_eq!(best.max_depth, Some(20));
    }

    #[test]
    fn failed_candidates_are_skipped() {
        let scores = vec![score(100, Some(10), None), score(200, None, Some(3.0))];
        let (best, _) = select_best(&scores).unwrap();
        assert_eq!(best.n_estimators, 200);

        assert!(select_best(&[score(100, None, None)]).is_none());
    }

    #[test]
    fn params_display_names_none_depth() {
        let params = ForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 5,
        };
        assert_eq!(
            params.to_string(),
            "n_estimators=100, max_depth=None, min_samples_split=5"
        );
    }
}
