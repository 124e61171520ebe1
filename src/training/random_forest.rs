//! Bagged ensemble of regression trees.

use crate::training::decision_tree::RegressionTree;
use crate::training::error::TrainingError;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest regressor. Every tree sees a bootstrap sample and all features at
/// each split; the prediction is the mean over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    /// Individual trees
    trees: Vec<RegressionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Features examined per split; `None` examines all of them
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Tree `i` is seeded with `random_state + i`
    pub random_state: u64,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            bootstrap: true,
            random_state: 42,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self, TrainingError> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("y length = {}", n_samples),
                found: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TrainingError::NoEligibleRows);
        }

        // Build trees in parallel
        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<RegressionTree, TrainingError> {
                let seed = self.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = RegressionTree::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_split(self.min_samples_split)
                    .with_max_features(self.max_features);
                tree.fit_sample(x, y.view(), &sample, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<_, TrainingError>>()?;

        // Average tree importances, then renormalize.
        let n_features = x.ncols();
        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (acc, imp) in importances.iter_mut().zip(tree.feature_importances()) {
                *acc += imp;
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= total);
        }

        self.trees = trees;
        self.n_features = n_features;
        self.feature_importances = importances;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, TrainingError> {
        if self.trees.is_empty() {
            return Err(TrainingError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                found: format!("{} features", x.ncols()),
            });
        }

        let predictions = (0..x.nrows())
            .into_par_iter()
            .map(|i| -> Result<f64, TrainingError> {
                let row = x.row(i);
                let total = self
                    .trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<Result<f64, TrainingError>>()?;
                Ok(total / self.trees.len() as f64)
            })
            .collect::<Result<Vec<f64>, TrainingError>>()?;
        Ok(Array1::from_vec(predictions))
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
