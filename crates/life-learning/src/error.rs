//! Error types for the life-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by every
//! fallible operation in the crate: configuration, preprocessing, training,
//! evaluation and prediction.
//!
//! # Example
//!
//! ```rust,ignore
//! use life_learning::{LearningError, ModelConfig};
//!
//! fn configure() -> Result<ModelConfig, LearningError> {
//!     // Errors are propagated with ?
//!     ModelConfig::builder().epochs(50).build()
//! }
//! ```

use life_processing::ProcessingError;
use thiserror::Error;

/// The main error type for life-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the model.
    ///
    /// The message names the offending setting and its accepted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training, evaluation or prediction.
    ///
    /// Common causes:
    /// - The frame is empty or too small to split into three partitions
    /// - A feature column holds missing values (clean the frame first)
    /// - A non-label feature column is not numeric
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The configured target column was not found in the DataFrame.
    ///
    /// Column names are case-sensitive and the default target carries a
    /// trailing space (`"Life expectancy "`).
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// A required feature or label column was not found.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// An operation was called in the wrong model state.
    ///
    /// The model moves through Constructed, Compiled, Trained and Evaluated
    /// in that order; e.g. `train()` before `compile()` fails here.
    #[error("Invalid state: cannot {operation} while the model is {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the model was in.
        state: &'static str,
    },

    /// Training diverged or produced non-finite values.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// Training was cancelled through a cancellation token.
    #[error("Training cancelled")]
    Cancelled,

    /// An error raised by the cleaning stages.
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LearningError {
    /// Returns `true` if this error represents a cancellation, including a
    /// cancelled cleaning run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Processing(inner) => inner.is_cancelled(),
            _ => false,
        }
    }
}
