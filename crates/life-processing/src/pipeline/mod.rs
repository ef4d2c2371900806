//! Pipeline module.
//!
//! This module provides the cleaning pipeline and its progress types.

mod builder;
pub mod progress;

pub use builder::{CleaningPipeline, CleaningPipelineBuilder};
pub use progress::{
    CancellationToken, ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
