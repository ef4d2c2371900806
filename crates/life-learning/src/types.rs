//! Result types returned by the regression model and the evaluator.
//!
//! # Overview
//!
//! - [`TrainingHistory`]: per-epoch losses recorded by
//!   [`RegressionModel::train()`](crate::RegressionModel::train)
//! - [`CrossValidationReport`]: per-fold and averaged K-fold metrics
//! - [`EvaluationResult`]: test-partition metrics plus the raw targets and
//!   predictions, ready for [`ModelEvaluator`](crate::ModelEvaluator)
//! - [`EvaluationReport`]: the evaluator's summary
//! - [`ComparisonHistogram`]: shared-bin histogram of actual and predicted values

use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};

/// Losses and mean absolute errors after one training epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// 1-based epoch number.
    pub epoch: usize,

    /// Mean mini-batch training loss.
    pub loss: f64,

    /// Loss on the monitored partition after the epoch.
    pub val_loss: f64,

    /// Training MAE after the epoch.
    pub mae: f64,

    /// MAE on the monitored partition after the epoch.
    pub val_mae: f64,
}

/// Training history of one network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,

    /// Whether early stopping ended training before the last epoch.
    pub stopped_early: bool,

    /// Epoch whose weights were kept, when early stopping is enabled.
    pub best_epoch: Option<usize>,
}

impl TrainingHistory {
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.epochs.last()
    }

    pub fn losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.loss).collect()
    }

    pub fn val_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.val_loss).collect()
    }

    /// Lowest validation loss seen, with its epoch.
    pub fn best_val_loss(&self) -> Option<(usize, f64)> {
        self.epochs
            .iter()
            .map(|e| (e.epoch, e.val_loss))
            .reduce(|best, next| if next.1 < best.1 { next } else { best })
    }
}

/// Held-out metrics of one cross-validation fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    /// 1-based fold number.
    pub fold: usize,
    pub train_rows: usize,
    pub held_out_rows: usize,
    pub mae: f64,
    pub r2: f64,
}

/// K-fold cross-validation over the training partition.
///
/// Each fold trains an independently initialized network; the means are
/// plain arithmetic means over folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldMetrics>,
    pub mean_mae: f64,
    pub mean_r2: f64,
}

impl CrossValidationReport {
    pub fn from_folds(folds: Vec<FoldMetrics>) -> Self {
        let n = folds.len().max(1) as f64;
        let mean_mae = folds.iter().map(|f| f.mae).sum::<f64>() / n;
        let mean_r2 = folds.iter().map(|f| f.r2).sum::<f64>() / n;
        Self {
            folds,
            mean_mae,
            mean_r2,
        }
    }
}

/// Output of [`RegressionModel::evaluate()`](crate::RegressionModel::evaluate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Metrics on the test partition.
    pub metrics: Metrics,

    /// Test targets, in test-partition order.
    pub y_true: Vec<f64>,

    /// Predictions aligned with `y_true`.
    pub y_pred: Vec<f64>,

    pub history: TrainingHistory,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_validation: Option<CrossValidationReport>,
}

/// Summary produced by [`ModelEvaluator::report()`](crate::ModelEvaluator::report).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub r2: f64,
    pub mae: f64,
    pub mape: Option<f64>,
    pub mse: f64,
    pub rmse: f64,

    /// Mean of `actual - predicted`.
    pub residual_mean: f64,

    /// Population standard deviation of the residuals.
    pub residual_std: f64,

    pub max_abs_residual: f64,
    pub n_samples: usize,
}

/// Histogram of actual and predicted values over shared bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonHistogram {
    /// `bins + 1` ascending bin edges. The last bin includes its right edge.
    pub edges: Vec<f64>,
    pub actual: Vec<usize>,
    pub predicted: Vec<usize>,
}

impl ComparisonHistogram {
    pub fn bins(&self) -> usize {
        self.actual.len()
    }
}
