//! Multivariate iterative imputation.
//!
//! Every incomplete column is regressed (ridge) on the other columns, round robin,
//! starting from a mean fill. Rounds repeat until the largest change in an imputed
//! cell, scaled by its column's observed range, falls below `tolerance`.

use crate::config::ImputationConfig;
use crate::features::error::FeatureError;
use log::debug;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct IterativeImputer {
    max_iter: usize,
    tolerance: f64,
    ridge_alpha: f64,
    seed: u64,
}

/// Result of an imputation run.
#[derive(Debug, Clone)]
pub struct Imputed {
    pub data: Array2<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl Default for IterativeImputer {
    fn default() -> Self {
        Self::from_config(&ImputationConfig::default(), 42)
    }
}

impl IterativeImputer {
    pub fn from_config(config: &ImputationConfig, seed: u64) -> Self {
        Self {
            max_iter: config.max_iter.max(1),
            tolerance: config.tolerance.max(0.0),
            ridge_alpha: config.ridge_alpha.max(0.0),
            seed,
        }
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fills every NaN in `data`. `names` label the columns for error messages.
    ///
    /// Fails with [`FeatureError::ColumnEntirelyMissing`] if any column has no observed
    /// value: a mean or regression fill would be invented from nothing.
    pub fn fit_transform(&self, names: &[&str], data: &Array2<f64>) -> Result<Imputed, FeatureError> {
        if names.len() != data.ncols() {
            return Err(FeatureError::ColumnCount {
                expected: names.len(),
                found: data.ncols(),
            });
        }
        if data.nrows() == 0 {
            return Err(FeatureError::EmptyInput);
        }

        let missing = data.mapv(f64::is_nan);
        let mut result = data.clone();
        let mut ranges = Vec::with_capacity(names.len());

        for (j, name) in names.iter().enumerate() {
            let observed: Vec<f64> = data.column(j).iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                return Err(FeatureError::ColumnEntirelyMissing(name.to_string()));
            }
            let mean = observed.iter().sum::<f64>() / observed.len() as f64;
            let (lo, hi) = observed
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
            ranges.push(if hi > lo { hi - lo } else { 1.0 });
            result
                .column_mut(j)
                .iter_mut()
                .filter(|v| v.is_nan())
                .for_each(|v| *v = mean);
        }

        let order = self.imputation_order(&missing);
        if order.is_empty() {
            return Ok(Imputed {
                data: result,
                iterations: 0,
                converged: true,
            });
        }

        for iteration in 1..=self.max_iter {
            let previous = result.clone();
            for &target in &order {
                self.impute_column(&mut result, &missing, target);
            }
            let change = (&result - &previous)
                .axis_iter(Axis(1))
                .zip(&ranges)
                .map(|(col, range)| col.iter().fold(0.0f64, |acc, v| acc.max(v.abs())) / range)
                .fold(0.0f64, f64::max);
            debug!("Imputation round {}: scaled change {:.6}", iteration, change);
            if change < self.tolerance {
                return Ok(Imputed {
                    data: result,
                    iterations: iteration,
                    converged: true,
                });
            }
        }

        Ok(Imputed {
            data: result,
            iterations: self.max_iter,
            converged: false,
        })
    }

    /// Incomplete columns, fewest missing first. Equal counts are ordered by a seeded
    /// shuffle so runs are reproducible.
    fn imputation_order(&self, missing: &Array2<bool>) -> Vec<usize> {
        let mut columns: Vec<(usize, usize)> = missing
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(j, col)| (j, col.iter().filter(|m| **m).count()))
            .filter(|(_, count)| *count > 0)
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        columns.shuffle(&mut rng);
        columns.sort_by_key(|(_, count)| *count);
        columns.into_iter().map(|(j, _)| j).collect()
    }

    fn impute_column(&self, data: &mut Array2<f64>, missing: &Array2<bool>, target: usize) {
        let predictors: Vec<usize> = (0..data.ncols()).filter(|&j| j != target).collect();
        let (observed, unobserved): (Vec<usize>, Vec<usize>) =
            (0..data.nrows()).partition(|&i| !missing[[i, target]]);

        let x_train = data.select(Axis(0), &observed).select(Axis(1), &predictors);
        let y_train = data.column(target).select(Axis(0), &observed);
        let (coefficients, intercept) = fit_ridge(&x_train, &y_train, self.ridge_alpha);

        for &i in &unobserved {
            let prediction = predictors
                .iter()
                .zip(coefficients.iter())
                .fold(intercept, |acc, (&j, &c)| acc + c * data[[i, j]]);
            data[[i, target]] = prediction;
        }
    }
}

/// Centered ridge regression. Falls back to the mean of `y` when the system is
/// singular or there are no predictors.
fn fit_ridge(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> (Array1<f64>, f64) {
    let p = x.ncols();
    let y_mean = y.mean().unwrap_or(0.0);
    if p == 0 || x.nrows() < 2 {
        return (Array1::zeros(p), y_mean);
    }

    let x_means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
    let xc = x - &x_means;
    let yc = y - y_mean;

    let mut gram = xc.t().dot(&xc);
    for j in 0..p {
        gram[[j, j]] += alpha;
    }
    let rhs = xc.t().dot(&yc);

    match solve(gram, rhs) {
        Some(beta) => {
            let intercept = y_mean - x_means.dot(&beta);
            (beta, intercept)
        }
        None => (Array1::zeros(p), y_mean),
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for k in 0..n {
        let pivot = (k..n).max_by(|&i, &j| a[[i, k]].abs().total_cmp(&a[[j, k]].abs()))?;
        if a[[pivot, k]].abs() < 1e-12 {
            return None;
        }
        if pivot != k {
            for c in 0..n {
                a.swap([k, c], [pivot, c]);
            }
            b.swap(k, pivot);
        }
        for i in (k + 1)..n {
            let factor = a[[i, k]] / a[[k, k]];
            for c in k..n {
                a[[i, c]] -= factor * a[[k, c]];
            }
            b[i] -= factor * b[k];
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|c| a[[i, c]] * x[c]).sum();
        x[i] = (b[i] - tail) / a[[i, i]];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const NAMES: [&str; 3] = ["a", "b", "c"];

    #[test]
    fn recovers_linear_relationship() -> Result<(), FeatureError> {
        // c = a + b on complete rows
        let data = array![
            [1.0, 2.0, 3.0],
            [2.0, 1.0, 3.0],
            [3.0, 5.0, 8.0],
            [4.0, 2.0, 6.0],
            [5.0, 4.0, 9.0],
            [6.0, 1.0, f64::NAN],
        ];
        let imputed = IterativeImputer::default().fit_transform(&NAMES, &data)?;

        assert!((imputed.data[[5, 2]] - 7.0).abs() < 1e-3, "{}", imputed.data[[5, 2]]);
        assert!(imputed.converged);
        Ok(())
    }

    #[test]
    fn observed_values_are_untouched() -> Result<(), FeatureError> {
        let data = array![
            [1.0, f64::NAN, 3.0],
            [f64::NAN, 5.0, 6.0],
            [7.0, 8.0, f64::NAN],
            [10.0, 11.0, 12.0],
        ];
        let imputed = IterativeImputer::default().fit_transform(&NAMES, &data)?;

        assert!(imputed.data.iter().all(|v| v.is_finite()));
        for ((i, j), v) in data.indexed_iter() {
            if !v.is_nan() {
                assert_eq!(imputed.data[[i, j]], *v);
            }
        }
        Ok(())
    }

    #[test]
    fn entirely_missing_column_fails() {
        let data = array![[1.0, f64::NAN, 3.0], [2.0, f64::NAN, 4.0]];
        match IterativeImputer::default().fit_transform(&NAMES, &data) {
            Err(FeatureError::ColumnEntirelyMissing(name)) => assert_eq!(name, "b"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn complete_input_is_returned_unchanged() -> Result<(), FeatureError> {
        let data = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let imputed = IterativeImputer::default().fit_transform(&NAMES, &data)?;
        assert_eq!(imputed.data, data);
        assert_eq!(imputed.iterations, 0);
        Ok(())
    }

    #[test]
    fn same_seed_same_result() -> Result<(), FeatureError> {
        let data = array![
            [1.0, f64::NAN, 3.0],
            [f64::NAN, 5.0, 6.5],
            [7.0, 8.0, f64::NAN],
            [10.0, 11.5, 12.0],
            [2.0, 2.5, 4.0],
        ];
        let first = IterativeImputer::default().with_seed(7).fit_transform(&NAMES, &data)?;
        let second = IterativeImputer::default().with_seed(7).fit_transform(&NAMES, &data)?;
        assert_eq!(first.data, second.data);
        Ok(())
    }

    #[test]
    fn solve_handles_pivoting() {
        let a = array![[0.0, 1.0], [2.0, 0.0]];
        let b = array![3.0, 4.0];
        let x = solve(a, b).expect("non-singular");
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }
}
