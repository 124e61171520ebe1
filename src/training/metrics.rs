use crate::training::error::TrainingError;
use log::warn;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Mean absolute error over rows with a finite prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaeScore {
    pub mae: f64,
    pub scored: usize,
    /// Rows skipped because the prediction was NaN or infinite.
    pub dropped: usize,
}

pub fn masked_mae(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<MaeScore, TrainingError> {
    if y_true.len() != y_pred.len() {
        return Err(TrainingError::ShapeMismatch {
            expected: format!("{} predictions", y_true.len()),
            found: format!("{} predictions", y_pred.len()),
        });
    }

    let (total, scored) = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(_, pred)| pred.is_finite())
        .fold((0.0, 0usize), |(sum, n), (t, p)| (sum + (t - p).abs(), n + 1));
    let dropped = y_true.len() - scored;

    if scored == 0 {
        return Err(TrainingError::NoScoredRows { dropped });
    }
    if dropped > 0 {
        warn!("Dropped {} non-finite predictions out of {}", dropped, y_true.len());
    }

    Ok(MaeScore {
        mae: total / scored as f64,
        scored,
        dropped,
    })
}
