//! Progress reporting types for model training.
//!
//! Training reports a [`TrainingProgress`] after every epoch, first for each
//! cross-validation fold (when enabled) and then for the final network.
//! Evaluation reports once more when it completes.
//!
//! # Example
//!
//! ```rust,ignore
//! use life_learning::{ModelConfig, RegressionModel};
//!
//! let mut model = RegressionModel::new(&df, ModelConfig::default())?
//!     .on_progress(|update| {
//!         println!("[{}] {:.0}% - {}", update.stage, update.progress * 100.0, update.message);
//!     });
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// The current stage of a training run.
///
/// Terminal states: [`Complete`](Self::Complete), [`Failed`](Self::Failed),
/// [`Cancelled`](Self::Cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TrainingStage {
    /// Model built, nothing trained yet.
    #[default]
    Initializing,

    /// Training a fresh network per cross-validation fold.
    CrossValidation,

    /// Training the final network on the full training partition.
    Training,

    /// Scoring the test partition.
    Evaluation,

    /// Evaluation finished.
    Complete,

    /// Training failed. Check the returned error for details.
    Failed,

    /// Training was cancelled through the cancellation token.
    Cancelled,
}

impl TrainingStage {
    /// Returns the snake_case name of this stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::Initializing => "initializing",
            TrainingStage::CrossValidation => "cross_validation",
            TrainingStage::Training => "training",
            TrainingStage::Evaluation => "evaluation",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
            TrainingStage::Cancelled => "cancelled",
        }
    }

    /// Returns `true` if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrainingStage::Complete | TrainingStage::Failed | TrainingStage::Cancelled
        )
    }
}

impl std::fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for parsing a [`TrainingStage`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTrainingStageError {
    invalid_value: String,
}

impl ParseTrainingStageError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParseTrainingStageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid training stage: '{}'. Valid values are: initializing, cross_validation, \
             training, evaluation, complete, failed, cancelled",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTrainingStageError {}

impl FromStr for TrainingStage {
    type Err = ParseTrainingStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(TrainingStage::Initializing),
            "cross_validation" => Ok(TrainingStage::CrossValidation),
            "training" => Ok(TrainingStage::Training),
            "evaluation" => Ok(TrainingStage::Evaluation),
            "complete" => Ok(TrainingStage::Complete),
            "failed" => Ok(TrainingStage::Failed),
            "cancelled" => Ok(TrainingStage::Cancelled),
            _ => Err(ParseTrainingStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A progress update from a training run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0.
    ///
    /// Training epochs (folds included) cover `[0.0, 0.9]`; evaluation
    /// brings it to 1.0.
    pub progress: f64,

    pub message: String,

    /// `(completed, total)` epochs of the network being trained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<(usize, usize)>,

    /// `(current, total)` fold, during cross-validation only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fold: Option<(usize, usize)>,
}

impl TrainingProgress {
    pub fn new(stage: TrainingStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            epoch: None,
            fold: None,
        }
    }

    pub fn with_epoch(mut self, completed: usize, total: usize) -> Self {
        self.epoch = Some((completed, total));
        self
    }

    pub fn with_fold(mut self, current: usize, total: usize) -> Self {
        self.fold = Some((current, total));
        self
    }
}

/// Callback receiving [`TrainingProgress`] updates.
///
/// Callbacks must be thread-safe (`Send + Sync`) and should return quickly.
pub type ProgressCallback = Arc<dyn Fn(TrainingProgress) + Send + Sync>;

static_assertions::assert_impl_all!(TrainingProgress: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_stage_as_str_roundtrip() {
        let stages = [
            TrainingStage::Initializing,
            TrainingStage::CrossValidation,
            TrainingStage::Training,
            TrainingStage::Evaluation,
            TrainingStage::Complete,
            TrainingStage::Failed,
            TrainingStage::Cancelled,
        ];
        for stage in stages {
            assert_eq!(stage.as_str().parse::<TrainingStage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_training_stage_is_terminal() {
        assert!(TrainingStage::Complete.is_terminal());
        assert!(TrainingStage::Failed.is_terminal());
        assert!(TrainingStage::Cancelled.is_terminal());
        assert!(!TrainingStage::Training.is_terminal());
        assert!(!TrainingStage::CrossValidation.is_terminal());
    }

    #[test]
    fn test_parse_invalid_stage() {
        let err = "warming_up".parse::<TrainingStage>().unwrap_err();
        assert_eq!(err.invalid_value(), "warming_up");
        assert!(err.to_string().contains("cross_validation"));
    }

    #[test]
    fn test_training_stage_serde() {
        let json = serde_json::to_string(&TrainingStage::CrossValidation).unwrap();
        assert_eq!(json, "\"cross_validation\"");
    }

    #[test]
    fn test_training_progress_builders() {
        let update = TrainingProgress::new(TrainingStage::CrossValidation, 1.5, "Fold 2")
            .with_epoch(3, 10)
            .with_fold(2, 5);
        assert_eq!(update.progress, 1.0);
        assert_eq!(update.epoch, Some((3, 10)));
        assert_eq!(update.fold, Some((2, 5)));
        assert_eq!(TrainingProgress::default().stage, TrainingStage::Initializing);
    }
}
