//! Configuration for the regression model.
//!
//! This module provides [`ModelConfig`] and its builder, the [`LossKind`]
//! selector and the [`CompileOptions`] bound at compile time.
//!
//! # Example
//!
//! ```rust,ignore
//! use life_learning::{LossKind, ModelConfig};
//!
//! let config = ModelConfig::builder()
//!     .epochs(200)
//!     .cv_folds(5)
//!     .loss(LossKind::MeanSquaredError)
//!     .build()?;
//! ```

use crate::error::LearningError;
use life_processing::schema::{COUNTRY, LIFE_EXPECTANCY, STATUS};
use serde::{Deserialize, Serialize};

/// Regression loss minimized during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Huber loss with `delta = 1.0`: squared error for small residuals,
    /// absolute error for large ones.
    #[default]
    Huber,
    /// Mean squared error.
    MeanSquaredError,
}

impl LossKind {
    /// Returns the string representation of this loss.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LossKind::Huber => "huber",
            LossKind::MeanSquaredError => "mean_squared_error",
        }
    }
}

impl std::fmt::Display for LossKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for a [`RegressionModel`](crate::RegressionModel).
///
/// Use [`ModelConfig::builder()`] for a validated configuration, or
/// [`ModelConfig::default()`] for the life-expectancy defaults.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `target_column` | `"Life expectancy "` |
/// | `label_columns` | `["Country", "Status"]` |
/// | `holdout_fraction` | 0.4 |
/// | `random_seed` | 123 |
/// | `hidden_layers` | `[128, 64]` |
/// | `epochs` | 100 |
/// | `batch_size` | 32 |
/// | `learning_rate` | 0.001 |
/// | `loss` | Huber |
/// | `cv_folds` | None |
/// | `early_stopping_patience` | None |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Column to predict.
    ///
    /// Every other column of the frame is a feature, in frame order.
    pub target_column: String,

    /// Feature columns integer-encoded instead of min-max scaled.
    ///
    /// Codes follow the sorted order of the training values. Values that
    /// only appear in validation, test or prediction rows get the reserved
    /// code `n_classes`.
    pub label_columns: Vec<String>,

    /// Fraction of rows held out for validation and test together.
    ///
    /// The holdout is split in two halves; the test half gets the extra row
    /// when the holdout is odd. Must be in `(0.0, 1.0)`.
    pub holdout_fraction: f64,

    /// Seed for the split shuffle, weight initialization and batch order.
    pub random_seed: u64,

    /// Widths of the hidden ReLU layers.
    ///
    /// The output layer is always a single linear unit.
    pub hidden_layers: Vec<usize>,

    /// Number of passes over the training partition.
    pub epochs: usize,

    /// Mini-batch size for Adam updates.
    pub batch_size: usize,

    /// Adam step size.
    pub learning_rate: f64,

    /// Loss minimized during training.
    pub loss: LossKind,

    /// Number of cross-validation folds over the training partition.
    ///
    /// `None` skips cross-validation. When set, must be at least 2.
    pub cv_folds: Option<usize>,

    /// Epochs without validation improvement before training stops.
    ///
    /// When training stops early the weights with the best validation loss
    /// are restored. `None` always trains for `epochs` epochs.
    pub early_stopping_patience: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            target_column: LIFE_EXPECTANCY.to_string(),
            label_columns: vec![COUNTRY.to_string(), STATUS.to_string()],
            holdout_fraction: 0.4,
            random_seed: 123,
            hidden_layers: vec![128, 64],
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.001,
            loss: LossKind::Huber,
            cv_folds: None,
            early_stopping_patience: None,
        }
    }
}

impl ModelConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ModelConfigBuilder {
        ModelConfigBuilder::default()
    }

    /// Validate every setting.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] naming the first invalid
    /// setting.
    pub fn validate(&self) -> Result<(), LearningError> {
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(LearningError::InvalidConfig(
                "holdout_fraction must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if self.epochs == 0 {
            return Err(LearningError::InvalidConfig(
                "epochs must be at least 1".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(LearningError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }

        validate_learning_rate(self.learning_rate)?;

        if let Some(folds) = self.cv_folds
            && folds < 2
        {
            return Err(LearningError::InvalidConfig(
                "cv_folds must be at least 2".to_string(),
            ));
        }

        if self.early_stopping_patience == Some(0) {
            return Err(LearningError::InvalidConfig(
                "early_stopping_patience must be at least 1".to_string(),
            ));
        }

        if self.hidden_layers.is_empty() {
            return Err(LearningError::InvalidConfig(
                "hidden_layers must contain at least one layer".to_string(),
            ));
        }

        if self.hidden_layers.contains(&0) {
            return Err(LearningError::InvalidConfig(
                "hidden layer widths must be at least 1".to_string(),
            ));
        }

        if self.target_column.is_empty() {
            return Err(LearningError::InvalidConfig(
                "target_column must not be empty".to_string(),
            ));
        }

        if self.label_columns.contains(&self.target_column) {
            return Err(LearningError::InvalidConfig(format!(
                "target column '{}' cannot also be a label column",
                self.target_column
            )));
        }

        Ok(())
    }
}

fn validate_learning_rate(learning_rate: f64) -> Result<(), LearningError> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(LearningError::InvalidConfig(format!(
            "learning_rate must be positive and finite, got {learning_rate}"
        )));
    }
    Ok(())
}

/// Builder for [`ModelConfig`].
///
/// Created via [`ModelConfig::builder()`]. All setters return `self` to allow
/// method chaining.
#[derive(Debug, Clone, Default)]
pub struct ModelConfigBuilder {
    config: ModelConfig,
}

impl ModelConfigBuilder {
    /// Set the target column name.
    #[must_use]
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.config.target_column = column.into();
        self
    }

    /// Set the label-encoded feature columns.
    #[must_use]
    pub fn label_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.label_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the validation+test holdout fraction (default: 0.4).
    #[must_use]
    pub fn holdout_fraction(mut self, fraction: f64) -> Self {
        self.config.holdout_fraction = fraction;
        self
    }

    /// Set the random seed for reproducibility (default: 123).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the hidden layer widths (default: `[128, 64]`).
    #[must_use]
    pub fn hidden_layers(mut self, layers: impl Into<Vec<usize>>) -> Self {
        self.config.hidden_layers = layers.into();
        self
    }

    /// Set the number of training epochs (default: 100).
    #[must_use]
    pub fn epochs(mut self, epochs: usize) -> Self {
        self.config.epochs = epochs;
        self
    }

    /// Set the mini-batch size (default: 32).
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set the Adam learning rate (default: 0.001).
    #[must_use]
    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    /// Set the training loss (default: Huber).
    #[must_use]
    pub fn loss(mut self, loss: LossKind) -> Self {
        self.config.loss = loss;
        self
    }

    /// Enable K-fold cross-validation with `folds` folds.
    ///
    /// [`build()`](Self::build) will return an error if `folds < 2`.
    #[must_use]
    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = Some(folds);
        self
    }

    /// Enable early stopping after `patience` epochs without improvement.
    #[must_use]
    pub fn early_stopping_patience(mut self, patience: usize) -> Self {
        self.config.early_stopping_patience = Some(patience);
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if:
    /// - `holdout_fraction` is not in range `(0.0, 1.0)`
    /// - `epochs` or `batch_size` is 0
    /// - `learning_rate` is not positive and finite
    /// - `cv_folds` is set below 2
    /// - `early_stopping_patience` is set to 0
    /// - `hidden_layers` is empty or holds a zero width
    /// - the target column is empty or listed as a label column
    pub fn build(self) -> Result<ModelConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Options bound to the model by [`RegressionModel::compile()`](crate::RegressionModel::compile).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub loss: LossKind,
    pub learning_rate: f64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for CompileOptions {
    fn from(config: &ModelConfig) -> Self {
        Self {
            loss: config.loss,
            learning_rate: config.learning_rate,
        }
    }
}

impl CompileOptions {
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] for a non-positive or
    /// non-finite learning rate.
    pub fn validate(&self) -> Result<(), LearningError> {
        validate_learning_rate(self.learning_rate)
    }
}
