//! Post-hoc analysis of test predictions.
//!
//! [`ModelEvaluator`] borrows the targets, predictions and training history
//! of an [`EvaluationResult`] and derives the views a report needs: the R²
//! score, residuals, a comparison histogram, an actual-vs-predicted table and
//! the loss curve.

use crate::error::LearningError;
use crate::metrics::{
    check_lengths, mean_absolute_error, mean_absolute_percentage_error, mean_squared_error, r2_score,
};
use crate::types::{ComparisonHistogram, EvaluationReport, EvaluationResult, TrainingHistory};
use polars::prelude::*;

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 30;

/// Default number of rows in the comparison table.
pub const DEFAULT_TABLE_ROWS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct ModelEvaluator<'a> {
    y_true: &'a [f64],
    y_pred: &'a [f64],
    history: &'a TrainingHistory,
}

impl<'a> ModelEvaluator<'a> {
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if the slices are empty or
    /// differ in length.
    pub fn new(
        y_true: &'a [f64],
        y_pred: &'a [f64],
        history: &'a TrainingHistory,
    ) -> Result<Self, LearningError> {
        check_lengths(y_true, y_pred)?;
        Ok(Self {
            y_true,
            y_pred,
            history,
        })
    }

    pub fn from_result(result: &'a EvaluationResult) -> Result<Self, LearningError> {
        Self::new(&result.y_true, &result.y_pred, &result.history)
    }

    pub fn len(&self) -> usize {
        self.y_true.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_true.is_empty()
    }

    pub fn r2_score(&self) -> f64 {
        r2_score(self.y_true, self.y_pred)
    }

    /// `actual - predicted` per row.
    pub fn residuals(&self) -> Vec<f64> {
        self.y_true
            .iter()
            .zip(self.y_pred)
            .map(|(actual, predicted)| actual - predicted)
            .collect()
    }

    /// Histogram both series over `bins` equal-width bins spanning the
    /// combined range.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if `bins` is zero.
    pub fn comparison_distribution(&self, bins: usize) -> Result<ComparisonHistogram, LearningError> {
        if bins == 0 {
            return Err(LearningError::InvalidConfig(
                "histogram needs at least one bin".to_string(),
            ));
        }

        let (mut low, mut high) = self
            .y_true
            .iter()
            .chain(self.y_pred)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if low == high {
            low -= 0.5;
            high += 0.5;
        }

        let width = (high - low) / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| low + width * i as f64).collect();
        edges.push(high);

        let count = |values: &[f64]| {
            let mut counts = vec![0usize; bins];
            for &value in values {
                let bin = (((value - low) / width).floor() as usize).min(bins - 1);
                counts[bin] += 1;
            }
            counts
        };

        Ok(ComparisonHistogram {
            actual: count(self.y_true),
            predicted: count(self.y_pred),
            edges,
        })
    }

    /// The first `rows` rows as a frame with `Actual`, `Predicted` and
    /// `Residual` columns.
    pub fn comparison_table(&self, rows: usize) -> Result<DataFrame, LearningError> {
        let n = rows.min(self.len());
        let actual = &self.y_true[..n];
        let predicted = &self.y_pred[..n];
        let residual: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

        Ok(df![
            "Actual" => actual,
            "Predicted" => predicted,
            "Residual" => residual,
        ]?)
    }

    /// `(loss, val_loss)` per epoch.
    pub fn loss_curve(&self) -> Vec<(f64, f64)> {
        self.history
            .epochs
            .iter()
            .map(|e| (e.loss, e.val_loss))
            .collect()
    }

    pub fn report(&self) -> EvaluationReport {
        let mse = mean_squared_error(self.y_true, self.y_pred);
        let residuals = self.residuals();
        let n = residuals.len() as f64;
        let residual_mean = residuals.iter().sum::<f64>() / n;
        let variance = residuals
            .iter()
            .map(|r| (r - residual_mean).powi(2))
            .sum::<f64>()
            / n;

        EvaluationReport {
            r2: self.r2_score(),
            mae: mean_absolute_error(self.y_true, self.y_pred),
            mape: mean_absolute_percentage_error(self.y_true, self.y_pred),
            mse,
            rmse: mse.sqrt(),
            residual_mean,
            residual_std: variance.sqrt(),
            max_abs_residual: residuals.iter().fold(0.0_f64, |max, r| max.max(r.abs())),
            n_samples: self.len(),
        }
    }
}
