//! The cleaning pipeline and its builder.
//!
//! Stages run in a fixed order: diagnostics, outlier treatment, KNN
//! imputation, final-frame check and column pruning. Each stage borrows the
//! previous stage's frame and returns a new one.

use crate::config::{CleaningConfig, ConfigValidationError};
use crate::diagnostics::{DuplicateAnalyzer, FinalFrameAnalyzer, MissingValueAnalyzer};
use crate::error::{ProcessingError, Result, ResultExt};
use crate::imputers::KnnImputer;
use crate::outliers::OutlierTreater;
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::pruning::RedundantColumnPruner;
use crate::schema::require_columns;
use crate::types::{CleaningReport, CleaningResult};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The cleaning pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use life_processing::{CleaningConfig, CleaningPipeline};
///
/// let result = CleaningPipeline::builder()
///     .config(CleaningConfig::builder().z_threshold(2.5).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(&df)?;
///
/// println!("{} outliers treated", result.report.outliers.total_flagged);
/// ```
pub struct CleaningPipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(CleaningPipeline: Send);

impl CleaningPipeline {
    pub fn builder() -> CleaningPipelineBuilder {
        CleaningPipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run every stage over `df`. The input frame is never modified.
    ///
    /// # Errors
    ///
    /// Returns `Err(ProcessingError::Cancelled)` if the cancellation token was
    /// triggered. Stage errors are returned with the failing stage as context.
    pub fn run(&self, df: &DataFrame) -> Result<CleaningResult> {
        match self.run_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Cleaning completed successfully"));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Cleaning pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, df: &DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();
        let config = &self.config;

        info!(
            "Starting cleaning pipeline on {} rows x {} columns",
            df.height(),
            df.width()
        );
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            0.0,
            "Validating input columns...",
        ));

        let mut required = vec![config.schema.group_column.clone()];
        required.extend(
            config
                .duplicate_subset
                .iter()
                .filter(|name| **name != config.schema.group_column)
                .cloned(),
        );
        require_columns(df, &required)?;

        let mut report = CleaningReport {
            rows: df.height(),
            columns_before: df.width(),
            ..Default::default()
        };

        self.check_cancelled()?;

        // Step 1: read-only diagnostics
        self.report_progress(ProgressUpdate::with_sub_stage(
            CleaningStage::Diagnostics,
            "Duplicates",
            0.0,
            "Checking for duplicate rows...",
        ));
        report.duplicates = DuplicateAnalyzer::new(df)
            .analyze(&config.duplicate_subset)
            .context("Duplicate diagnostics failed")?;
        info!(
            "Step 1: {} duplicate rows over [{}]",
            report.duplicates.duplicate_count,
            config.duplicate_subset.join(", ")
        );

        self.report_progress(ProgressUpdate::with_sub_stage(
            CleaningStage::Diagnostics,
            "Missing values",
            0.5,
            "Counting missing values...",
        ));
        report.missing_before = MissingValueAnalyzer::new(df, config.schema.group_column.as_str())
            .analyze()
            .context("Missing-value diagnostics failed")?;
        info!(
            "Step 1: {} missing cells in {} groups",
            report.missing_before.total_missing,
            report.missing_before.groups_with_missing.len()
        );

        self.check_cancelled()?;

        // Step 2: outliers
        self.report_progress(ProgressUpdate::new(
            CleaningStage::OutlierTreatment,
            0.0,
            format!("Treating outliers (|z| > {})...", config.z_threshold),
        ));
        let treatment = OutlierTreater::new(df, config.outlier_config())
            .treat()
            .context("Outlier treatment failed")?;
        report.outliers = treatment.report;
        self.report_progress(ProgressUpdate::new(
            CleaningStage::OutlierTreatment,
            1.0,
            format!("Treated {} outliers", report.outliers.total_flagged),
        ));

        self.check_cancelled()?;

        // Step 3: imputation
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Imputation,
            0.0,
            format!("Imputing missing values (k = {})...", config.knn_neighbors),
        ));
        let imputation = KnnImputer::new(&treatment.data, config.knn_config())
            .impute_with_outcome()
            .context("KNN imputation failed")?;
        report.imputed_cells = imputation.imputed_cells;
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Imputation,
            1.0,
            format!("Imputed {} cells", imputation.imputed_cells),
        ));

        self.check_cancelled()?;

        // Step 4: final-frame check
        self.report_progress(ProgressUpdate::new(
            CleaningStage::FinalCheck,
            0.0,
            "Summarizing cleaned frame...",
        ));
        report.final_frame = FinalFrameAnalyzer::new(&imputation.data)
            .with_correlation_threshold(config.correlation_threshold)
            .summarize()
            .context("Final-frame check failed")?;
        info!(
            "Step 4: {} missing cells remain, {} strongly correlated pairs",
            report.final_frame.remaining_missing,
            report.final_frame.strong_correlations.len()
        );

        self.check_cancelled()?;

        // Step 5: pruning
        let data = if config.prune_columns {
            self.report_progress(ProgressUpdate::new(
                CleaningStage::Pruning,
                0.0,
                "Pruning redundant columns...",
            ));
            let outcome = RedundantColumnPruner::new(&imputation.data, config.prune_config()).prune();
            report.pruning = Some(outcome.report());
            outcome.frame
        } else {
            info!("Step 5: Skipping column pruning (disabled)");
            imputation.data
        };

        report.columns_after = data.width();
        report.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Cleaning finished in {} ms: {} -> {} columns",
            report.duration_ms, report.columns_before, report.columns_after
        );

        Ok(CleaningResult { data, report })
    }
}

/// Builder for [`CleaningPipeline`].
#[derive(Default)]
pub struct CleaningPipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(CleaningPipelineBuilder: Send);

impl CleaningPipelineBuilder {
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token checked between stages.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<CleaningPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(CleaningPipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_frame() -> DataFrame {
        df![
            "Country" => ["A", "A", "A", "B", "B", "B"],
            "Year" => [2000i64, 2001, 2002, 2000, 2001, 2002],
            "Status" => ["Developing", "Developing", "Developing", "Developed", "Developed", "Developed"],
            "Life expectancy " => [Some(60.0), Some(61.0), None, Some(75.0), Some(76.0), Some(77.0)],
            "GDP" => [Some(100.0), None, Some(120.0), Some(900.0), Some(950.0), Some(1000.0)],
            "Diphtheria " => [90.0, 91.0, 92.0, 98.0, 99.0, 97.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_builder_default() {
        let pipeline = CleaningPipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().knn_neighbors, 20);
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = CleaningConfig {
            knn_neighbors: 0,
            ..Default::default()
        };
        assert!(CleaningPipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_run_cleans_and_prunes() {
        let df = sample_frame();
        let result = CleaningPipeline::builder().build().unwrap().run(&df).unwrap();

        assert_eq!(result.data.height(), 6);
        assert!(result.data.column("Diphtheria ").is_err());
        assert_eq!(result.report.columns_before, 6);
        assert_eq!(result.report.columns_after, 5);
        assert_eq!(result.report.imputed_cells, 2);
        assert_eq!(result.report.missing_before.total_missing, 2);
        assert_eq!(result.report.final_frame.remaining_missing, 0);
        assert_eq!(
            result.report.pruning.as_ref().map(|p| p.removed.clone()),
            Some(vec!["Diphtheria ".to_string()])
        );
    }

    #[test]
    fn test_run_without_pruning() {
        let df = sample_frame();
        let config = CleaningConfig::builder().prune_columns(false).build().unwrap();
        let result = CleaningPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&df)
            .unwrap();

        assert_eq!(result.data.width(), 6);
        assert!(result.report.pruning.is_none());
    }

    #[test]
    fn test_run_reports_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let df = sample_frame();
        CleaningPipeline::builder()
            .on_progress(move |update| {
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap()
            .run(&df)
            .unwrap();

        let mut seen = stages.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                CleaningStage::Initializing,
                CleaningStage::Diagnostics,
                CleaningStage::OutlierTreatment,
                CleaningStage::Imputation,
                CleaningStage::FinalCheck,
                CleaningStage::Pruning,
                CleaningStage::Complete,
            ]
        );
    }

    #[test]
    fn test_missing_required_columns_fail_fast() {
        let df = df!["GDP" => [1.0, 2.0]].unwrap();
        let err = CleaningPipeline::builder().build().unwrap().run(&df).unwrap_err();
        match err {
            ProcessingError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Country".to_string(), "Year".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_before_run() {
        let token = CancellationToken::new();
        token.cancel();

        let last_stage = Arc::new(Mutex::new(None));
        let last_stage_clone = last_stage.clone();

        let df = sample_frame();
        let result = CleaningPipeline::builder()
            .cancellation_token(token)
            .on_progress(move |update| {
                *last_stage_clone.lock().unwrap() = Some(update.stage);
            })
            .build()
            .unwrap()
            .run(&df);

        assert!(matches!(result, Err(ProcessingError::Cancelled)));
        assert_eq!(*last_stage.lock().unwrap(), Some(CleaningStage::Cancelled));
    }

    #[test]
    fn test_stage_error_carries_context() {
        let df = df![
            "Country" => ["A", "B"],
            "Year" => [2000i64, 2001],
            "Status" => ["Developing", "Developed"],
        ]
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let err = CleaningPipeline::builder()
            .on_progress(move |_| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap()
            .run(&df)
            .unwrap_err();

        assert_eq!(err.error_code(), "NO_NUMERIC_COLUMNS");
        assert!(err.to_string().starts_with("Outlier treatment failed"));
        assert!(calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_input_frame_untouched() {
        let df = sample_frame();
        let snapshot = df.clone();
        let _ = CleaningPipeline::builder().build().unwrap().run(&df).unwrap();
        assert!(df.equals_missing(&snapshot));
    }
}
