//! CLI entry point: clean the life-expectancy CSV, then train and evaluate
//! the regression model.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use life_learning::{
    CompileOptions, CrossValidationReport, EvaluationReport, EvaluationResult, ModelConfig,
    ModelEvaluator, RegressionModel,
};
use life_processing::schema::LIFE_EXPECTANCY;
use life_processing::{CleaningConfig, CleaningPipeline, CleaningReport, ColumnRole, DatasetSchema};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Life-expectancy cleaning and regression pipeline",
    long_about = "Cleans the WHO life-expectancy dataset (outlier treatment, KNN imputation, \
                  column pruning) and fits a dense regression network on the result.\n\n\
                  EXAMPLES:\n  \
                  life-expectancy --input life_expectancy.csv\n\n  \
                  # Five-fold cross-validation, 200 epochs\n  \
                  life-expectancy --input life_expectancy.csv --cv-folds 5 --epochs 200\n\n  \
                  # Machine-readable report\n  \
                  life-expectancy --input life_expectancy.csv --json | jq .evaluation.r2"
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long)]
    input: PathBuf,

    /// Column to predict
    #[arg(short, long, default_value = LIFE_EXPECTANCY)]
    target: String,

    /// Number of neighbors for KNN imputation
    #[arg(long, default_value = "20")]
    knn_neighbors: usize,

    /// Absolute z-score above which a value is treated as an outlier
    #[arg(long, default_value = "3.0")]
    z_threshold: f64,

    /// Training epochs
    #[arg(long, default_value = "100")]
    epochs: usize,

    /// Number of cross-validation folds over the training partition
    #[arg(long)]
    cv_folds: Option<usize>,

    /// Seed for the split, weight initialization and batch order
    #[arg(long, default_value = "123")]
    seed: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logging; only the final JSON report is written.
    #[arg(long)]
    json: bool,

    /// Rows shown in the actual-vs-predicted table
    #[arg(long, default_value = "10")]
    rows: usize,
}

/// Everything the run produced, as printed by `--json`.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    input: String,
    cleaning: &'a CleaningReport,
    features: Vec<String>,
    evaluation: EvaluationReport,
    result: &'a EvaluationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    cross_validation: Option<&'a CrossValidationReport>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    info!("Loading dataset from: {}", args.input.display());
    let data = load_csv(&args.input)?;
    info!("Dataset loaded: {:?}", data.shape());

    let cleaned = run_cleaning(&args, &data)?;
    let (model, result) = run_training(&args, &cleaned.data)?;

    let evaluator = ModelEvaluator::from_result(&result)?;
    let report = RunReport {
        input: args.input.display().to_string(),
        cleaning: &cleaned.report,
        features: model.feature_names(),
        evaluation: evaluator.report(),
        result: &result,
        cross_validation: result.cross_validation.as_ref(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report, &evaluator, args.rows)
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn run_cleaning(args: &Args, data: &DataFrame) -> Result<life_processing::CleaningResult> {
    let mut schema = DatasetSchema::life_expectancy();
    if args.target != LIFE_EXPECTANCY {
        schema = schema
            .with_column(LIFE_EXPECTANCY, ColumnRole::Numeric)
            .with_column(&args.target, ColumnRole::Target);
    }

    let config = CleaningConfig::builder()
        .schema(schema)
        .knn_neighbors(args.knn_neighbors)
        .z_threshold(args.z_threshold)
        .build()?;

    let mut builder = CleaningPipeline::builder().config(config);
    if !args.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    builder.build()?.run(data).map_err(|e| {
        error!("Cleaning failed: {}", e);
        anyhow!("Cleaning failed: {}", e)
    })
}

fn run_training(args: &Args, data: &DataFrame) -> Result<(RegressionModel, EvaluationResult)> {
    let mut config = ModelConfig::builder()
        .target_column(&args.target)
        .epochs(args.epochs)
        .random_seed(args.seed);
    if let Some(folds) = args.cv_folds {
        config = config.cv_folds(folds);
    }
    let config = config.build()?;

    let mut model = RegressionModel::new(data, config)?;
    if !args.quiet {
        model = model.on_progress(|update| {
            info!("[{:.0}%] {}: {}", update.progress * 100.0, update.stage, update.message);
        });
    }

    model.compile(CompileOptions::from(model.config()))?;
    model.train().context("Training failed")?;
    let result = model.evaluate()?;
    Ok((model, result))
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` for user-facing output so it shows regardless of log
/// level.
fn print_human_readable_summary(
    report: &RunReport<'_>,
    evaluator: &ModelEvaluator<'_>,
    rows: usize,
) -> Result<()> {
    let cleaning = report.cleaning;
    let evaluation = &report.evaluation;

    println!();
    println!("{}", "=".repeat(80));
    println!("LIFE EXPECTANCY MODEL");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input: {}", report.input);
    println!();

    println!("Cleaning Summary:");
    println!("  Duration: {}ms", cleaning.duration_ms);
    println!("  Rows: {}", cleaning.rows);
    println!(
        "  Columns: {} -> {}",
        cleaning.columns_before, cleaning.columns_after
    );
    println!("  Duplicate rows: {}", cleaning.duplicates.duplicate_count);
    println!("  Missing cells before cleaning: {}", cleaning.missing_before.total_missing);
    println!(
        "  Outliers flagged: {} ({} interpolated)",
        cleaning.outliers.total_flagged, cleaning.outliers.interpolated
    );
    println!("  Cells imputed: {}", cleaning.imputed_cells);
    if let Some(ref pruning) = cleaning.pruning
        && !pruning.removed.is_empty()
    {
        println!("  Pruned: {}", pruning.removed.join(", "));
    }
    println!();

    println!("Features ({}): {}", report.features.len(), report.features.join(", "));
    println!();

    let history = &report.result.history;
    if let Some(last) = history.last() {
        println!("Training:");
        println!("  Epochs: {}", history.len());
        println!("  Final loss: {:.4} (val {:.4})", last.loss, last.val_loss);
        if let Some(best) = history.best_epoch {
            println!("  Best epoch: {best}");
        }
        println!();
    }

    if let Some(cv) = report.cross_validation {
        println!("Cross-Validation ({} folds):", cv.folds.len());
        for fold in &cv.folds {
            println!("  Fold {}: MAE {:.4}, R² {:.4}", fold.fold, fold.mae, fold.r2);
        }
        println!("  Mean: MAE {:.4}, R² {:.4}", cv.mean_mae, cv.mean_r2);
        println!();
    }

    println!("Test Metrics ({} rows):", evaluation.n_samples);
    println!("  R²:   {:.4}", evaluation.r2);
    println!("  MAE:  {:.4}", evaluation.mae);
    match evaluation.mape {
        Some(mape) => println!("  MAPE: {mape:.2}%"),
        None => println!("  MAPE: n/a"),
    }
    println!("  RMSE: {:.4}", evaluation.rmse);
    println!(
        "  Residuals: mean {:.4}, std {:.4}, max |r| {:.4}",
        evaluation.residual_mean, evaluation.residual_std, evaluation.max_abs_residual
    );
    println!();

    println!("{}", evaluator.comparison_table(rows)?);
    println!();
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
    Ok(())
}
