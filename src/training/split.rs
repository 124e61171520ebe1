//! Expanding-window cross-validation over calendar dates.

use crate::training::error::TrainingError;
use std::ops::Range;

/// One train/validation split. Indices are contiguous row ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub fold: usize,
    pub train_indices: Range<usize>,
    pub test_indices: Range<usize>,
}

/// Splits rows sorted by date into `n_splits` folds of equal date count. Every date
/// lands wholly in one block, so all locations observed on a date share a side.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesSplit {
    n_splits: usize,
}

impl TimeSeriesSplit {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits: n_splits.max(2),
        }
    }

    /// `dates` holds one day number per row and must be ascending.
    ///
    /// With `n` distinct dates the test block is `n / (n_splits + 1)` dates and fold `k`
    /// tests on the block starting at date `n - (n_splits - k) * size`, training on
    /// every earlier date.
    pub fn split(&self, dates: &[i32]) -> Result<Vec<Fold>, TrainingError> {
        if dates.windows(2).any(|w| w[0] > w[1]) {
            return Err(TrainingError::ShapeMismatch {
                expected: "rows sorted by date".to_string(),
                found: "unsorted dates".to_string(),
            });
        }

        // Row offset where each distinct date starts, plus the end sentinel.
        let mut starts: Vec<usize> = Vec::new();
        for (row, date) in dates.iter().enumerate() {
            if row == 0 || dates[row - 1] != *date {
                starts.push(row);
            }
        }
        let n_dates = starts.len();
        starts.push(dates.len());

        let size = n_dates / (self.n_splits + 1);
        if size == 0 {
            return Err(TrainingError::NotEnoughDates {
                n_splits: self.n_splits,
                dates: n_dates,
            });
        }

        Ok((0..self.n_splits)
            .map(|k| {
                let test_start = n_dates - (self.n_splits - k) * size;
                let test_end = test_start + size;
                Fold {
                    fold: k,
                    train_indices: 0..starts[test_start],
                    test_indices: starts[test_start]..starts[test_end],
                }
            })
            .collect())
    }
}
