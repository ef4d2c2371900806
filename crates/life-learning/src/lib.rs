//! life-learning: Dense-network regression for the cleaned life-expectancy
//! dataset.
//!
//! This crate takes the frame produced by
//! [`life_processing::CleaningPipeline`] and fits a small feed-forward network
//! that predicts life expectancy from every other column. Everything runs in
//! process on [`ndarray`] matrices; no external runtime is required.
//!
//! # Features
//!
//! - **Seeded Split**: Reproducible train / validation / test partitions
//! - **Preprocessing**: Label encoding and min-max scaling fit on training rows only
//! - **Dense Network**: ReLU hidden layers, Glorot initialization, Adam optimizer
//! - **Huber or MSE Loss**: Robust default with a squared-error alternative
//! - **Cross-Validation**: Optional K-fold scoring over the training partition
//! - **Early Stopping**: Optional patience with best-weight restoration
//! - **Evaluation**: R², MAE, MAPE, residuals, histograms and comparison tables
//! - **Progress Reporting**: Per-epoch callbacks and cooperative cancellation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use life_learning::{CompileOptions, ModelConfig, ModelEvaluator, RegressionModel};
//!
//! let config = ModelConfig::builder()
//!     .epochs(100)
//!     .cv_folds(5)
//!     .build()?;
//!
//! let mut model = RegressionModel::new(&cleaned, config)?
//!     .on_progress(|u| println!("{:.0}% - {}", u.progress * 100.0, u.message));
//! model.compile(CompileOptions::from(model.config()))?;
//! model.train()?;
//!
//! let result = model.evaluate()?;
//! let evaluator = ModelEvaluator::from_result(&result)?;
//! println!("R² = {:.4}", evaluator.r2_score());
//! println!("{}", evaluator.comparison_table(10)?);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        RegressionModel                           │
//! │                                                                  │
//! │  DataFrame ──► SplitIndices ──► FittedPreprocessor ──► Array2    │
//! │                                                          │       │
//! │                          compile() ──► Network + Adam ◄──┘       │
//! │                                          │                       │
//! │                          train()    ──► TrainingHistory          │
//! │                                          │  (+ CrossValidation)  │
//! │                          evaluate() ──► EvaluationResult         │
//! └──────────────────────────────────────────┬───────────────────────┘
//!                                            ▼
//!                                     ModelEvaluator
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]:
//!
//! - [`LearningError::InvalidConfig`] - Invalid model configuration
//! - [`LearningError::InvalidData`] - Empty, non-numeric or incomplete input
//! - [`LearningError::TargetNotFound`] - Target column absent from the frame
//! - [`LearningError::InvalidState`] - Operation called out of order
//! - [`LearningError::TrainingFailed`] - Loss diverged during training
//! - [`LearningError::Cancelled`] - Cancellation token fired
//!
//! See [`LearningError`] for the complete list.

mod config;
mod error;
mod evaluator;
mod metrics;
mod model;
mod network;
mod preprocessing;
mod progress;
mod split;
mod types;

// Re-export public API
//
// Configuration types
pub use config::{CompileOptions, LossKind, ModelConfig, ModelConfigBuilder};
// Error types
pub use error::LearningError;
// Evaluation
pub use evaluator::{DEFAULT_BINS, DEFAULT_TABLE_ROWS, ModelEvaluator};
pub use metrics::Metrics;
// Model and network
pub use model::{ModelState, RegressionModel};
pub use network::{Adam, Network};
// Preprocessing and splitting
pub use preprocessing::{FeatureEncoding, FeatureTransform, FittedPreprocessor};
pub use split::{SplitIndices, k_fold};
// Progress reporting types
pub use progress::{ParseTrainingStageError, ProgressCallback, TrainingProgress, TrainingStage};
// Result types
pub use types::{
    ComparisonHistogram, CrossValidationReport, EpochRecord, EvaluationReport, EvaluationResult,
    FoldMetrics, TrainingHistory,
};

// Cancellation is shared with the cleaning pipeline.
pub use life_processing::CancellationToken;
