//! CART regression tree with variance-reduction splits.

use crate::training::error::TrainingError;
use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Features examined per split; `None` examines all of them
    pub max_features: Option<usize>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
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

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fits the tree on the rows of `x` named by `sample`, which may repeat rows.
    pub fn fit_sample(
        &mut self,
        x: &Array2<f64>,
        y: ArrayView1<f64>,
        sample: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self, TrainingError> {
        if x.nrows() != y.len() {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("y length = {}", x.nrows()),
                found: format!("y length = {}", y.len()),
            });
        }
        if sample.is_empty() {
            return Err(TrainingError::NoEligibleRows);
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let mut indices = sample.to_vec();
        let root = self.build(x, &y, &mut indices, 0, &mut importances, rng);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= total);
        }
        self.root = Some(root);
        self.feature_importances = importances;
        Ok(self)
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &ArrayView1<f64>,
        indices: &mut [usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sum_sq) = indices
            .iter()
            .fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
        let mean = sum / n_samples as f64;
        let sse = (sum_sq - sum * sum / n_samples as f64).max(0.0);
        let first = y[indices[0]];

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.is_some_and(|d| depth >= d)
            || indices.iter().all(|&i| y[i] == first);
        if should_stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        let Some(best) = self.best_split(x, y, indices, sum, sse, rng) else {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        };

        // Partition in place: left block first.
        let mut boundary = 0;
        for k in 0..n_samples {
            if x[[indices[k], best.feature_idx]] <= best.threshold {
                indices.swap(k, boundary);
                boundary += 1;
            }
        }
        if boundary == 0 || boundary == n_samples {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }
        importances[best.feature_idx] += best.gain;

        let (left_idx, right_idx) = indices.split_at_mut(boundary);
        let left = self.build(x, y, left_idx, depth + 1, importances, rng);
        let right = self.build(x, y, right_idx, depth + 1, importances, rng);

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples,
        }
    }

    /// Sorted sweep over each candidate feature with running sums, so a node costs
    /// O(features * n log n).
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &ArrayView1<f64>,
        indices: &[usize],
        total_sum: f64,
        parent_sse: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let mut features: Vec<usize> = (0..self.n_features).collect();
        if let Some(k) = self.max_features.filter(|&k| k < self.n_features) {
            features.shuffle(rng);
            features.truncate(k.max(1));
        }

        // Minimizing child SSE is maximizing sum_l^2/n_l + sum_r^2/n_r.
        let parent_score = total_sum * total_sum / n as f64;
        let mut best: Option<(usize, f64, f64)> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature in &features {
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (x[[i, feature]], y[i])));
            pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for split in 0..n - 1 {
                left_sum += pairs[split].1;
                let (here, next) = (pairs[split].0, pairs[split + 1].0);
                if here >= next {
                    continue;
                }
                let n_left = (split + 1) as f64;
                let n_right = (n - split - 1) as f64;
                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / n_left + right_sum * right_sum / n_right;
                if best.map_or(true, |(_, _, s)| score > s) {
                    let mid = here + (next - here) / 2.0;
                    best = Some((feature, if mid < next { mid } else { here }, score));
                }
            }
        }

        let (feature_idx, threshold, score) = best?;
        let gain = (score - parent_score).min(parent_sse);
        (gain > 0.0).then_some(BestSplit {
            feature_idx,
            threshold,
            gain,
        })
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64, TrainingError> {
        let mut node = self.root.as_ref().ok_or(TrainingError::NotFitted)?;
        if row.len() != self.n_features {
            return Err(TrainingError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                found: format!("{} features", row.len()),
            });
        }
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Normalized total variance reduction per feature.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        self.root.as_ref().map_or(0, depth_of)
    }
}
