//! Life-Expectancy Cleaning Library
//!
//! Cleaning stages for the WHO life-expectancy dataset, built on Polars.
//!
//! # Overview
//!
//! - **Diagnostics**: duplicate keys, missing values per column and per
//!   country, and a final-frame summary with strong correlations
//! - **Outlier Treatment**: per-country Z-scores, flagged values replaced by
//!   linear interpolation inside the country
//! - **KNN Imputation**: missing numeric values filled from the most similar
//!   rows (nan-euclidean distance)
//! - **Column Pruning**: removal of a configured list of redundant columns
//! - **Progress Reporting**: stage updates with cancellation support
//!
//! Every stage borrows its input frame and returns a new one. Categorical and
//! identifier columns, as declared by the [`DatasetSchema`], are never
//! rewritten.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use life_processing::{CleaningConfig, CleaningPipeline};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("Life Expectancy Data.csv".into()))?
//!     .finish()?;
//!
//! let result = CleaningPipeline::builder()
//!     .config(CleaningConfig::builder().knn_neighbors(20).build()?)
//!     .build()?
//!     .run(&df)?;
//!
//! println!("{} cells imputed", result.report.imputed_cells);
//! ```
//!
//! # Individual Stages
//!
//! ```rust,ignore
//! use life_processing::{KnnConfig, KnnImputer, OutlierConfig, OutlierTreater};
//!
//! let treated = OutlierTreater::new(&df, OutlierConfig::default()).treat()?;
//! let imputed = KnnImputer::new(&treated.data, KnnConfig::default()).impute()?;
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod imputers;
pub mod outliers;
pub mod pipeline;
pub mod pruning;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, DEFAULT_REDUNDANT_COLUMNS,
    KnnConfig, KnnWeighting, OutlierConfig, PruneConfig,
};
pub use diagnostics::{DuplicateAnalyzer, FinalFrameAnalyzer, MissingValueAnalyzer};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use imputers::{ImputationOutcome, KnnImputer};
pub use outliers::{OutlierTreater, OutlierTreatment};
pub use pipeline::{
    CancellationToken, CleaningPipeline, CleaningPipelineBuilder, CleaningStage,
    ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
pub use pruning::{PruneOutcome, RedundantColumnPruner};
pub use schema::{ColumnRole, ColumnSpec, DatasetSchema, require_columns};
pub use types::{
    CleaningReport, CleaningResult, ColumnCount, ColumnStats, CorrelationPair, DuplicateReport,
    FinalFrameReport, GroupCount, MissingValueReport, OutlierReport, PruneReport,
};
pub use utils::is_numeric_dtype;
