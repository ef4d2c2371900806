//! Progress reporting and cancellation support for the cleaning pipeline.
//!
//! A [`CancellationToken`] can be cloned into another thread and cancelled
//! from there; the pipeline checks it between stages.
//!
//! # Example
//!
//! ```rust,ignore
//! use life_processing::{CancellationToken, CleaningPipeline};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let result = CleaningPipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run(&df);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Validating configuration and input columns
    Initializing,
    /// Duplicate and missing-value diagnostics
    Diagnostics,
    /// Per-group Z-score outlier treatment
    OutlierTreatment,
    /// KNN imputation of missing numeric values
    Imputation,
    /// Summary and correlation check of the cleaned frame
    FinalCheck,
    /// Dropping redundant columns
    Pruning,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline was cancelled by user
    Cancelled,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Diagnostics => "Running Diagnostics",
            Self::OutlierTreatment => "Treating Outliers",
            Self::Imputation => "Imputing Values",
            Self::FinalCheck => "Checking Final Frame",
            Self::Pruning => "Pruning Columns",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage (0.0 - 1.0).
    ///
    /// Weights of the working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::Diagnostics => 0.10,
            Self::OutlierTreatment => 0.25,
            Self::Imputation => 0.50,
            Self::FinalCheck => 0.08,
            Self::Pruning => 0.05,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Diagnostics => 0.02,
            Self::OutlierTreatment => 0.12,
            Self::Imputation => 0.37,
            Self::FinalCheck => 0.87,
            Self::Pruning => 0.95,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// A progress event emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: CleaningStage,

    /// Optional sub-stage description (e.g., "Column: GDP")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a new progress update with sub-stage information.
    pub fn with_sub_stage(
        stage: CleaningStage,
        sub_stage: impl Into<String>,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            stage: CleaningStage::Cancelled,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: "Pipeline cancelled by user".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receiver of pipeline progress updates.
///
/// Implementations must be `Send + Sync` so a pipeline running on a worker
/// thread can report to a caller on another thread.
pub trait ProgressReporter: Send + Sync {
    /// Called at every stage boundary. Keep it cheap and non-blocking.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running pipeline or training run.
///
/// Cloning shares the underlying flag. Call [`cancel()`](Self::cancel) from
/// any thread; the run stops at its next check with
/// [`ProcessingError::Cancelled`](crate::error::ProcessingError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
