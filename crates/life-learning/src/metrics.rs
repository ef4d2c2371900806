//! Regression metrics.

use crate::error::LearningError;
use serde::{Deserialize, Serialize};

/// Regression metrics on one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean absolute error.
    pub mae: f64,

    /// Mean absolute percentage error, in percent.
    ///
    /// Rows with a zero target are skipped; `None` when every target is zero.
    pub mape: Option<f64>,

    /// Mean squared error.
    pub mse: f64,

    /// Root mean squared error.
    pub rmse: f64,

    /// Coefficient of determination.
    pub r2: f64,

    pub n_samples: usize,
}

impl Metrics {
    /// Compute every metric from targets and predictions.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if the slices are empty or
    /// differ in length.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self, LearningError> {
        check_lengths(y_true, y_pred)?;
        let mse = mean_squared_error(y_true, y_pred);
        Ok(Self {
            mae: mean_absolute_error(y_true, y_pred),
            mape: mean_absolute_percentage_error(y_true, y_pred),
            mse,
            rmse: mse.sqrt(),
            r2: r2_score(y_true, y_pred),
            n_samples: y_true.len(),
        })
    }
}

pub(crate) fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<(), LearningError> {
    if y_true.is_empty() {
        return Err(LearningError::InvalidData(
            "cannot score an empty set of predictions".to_string(),
        ));
    }
    if y_true.len() != y_pred.len() {
        return Err(LearningError::InvalidData(format!(
            "{} targets but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

// Callers pass non-empty slices of equal length.

pub(crate) fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    total / y_true.len() as f64
}

pub(crate) fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    total / y_true.len() as f64
}

pub(crate) fn mean_absolute_percentage_error(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    let ratios: Vec<f64> = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, _)| **t != 0.0)
        .map(|(t, p)| ((t - p) / t).abs())
        .collect();
    if ratios.is_empty() {
        return None;
    }
    Some(100.0 * ratios.iter().sum::<f64>() / ratios.len() as f64)
}

/// `1 - SS_res / SS_tot`. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub(crate) fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
