//! Integration tests for the cleaning pipeline.
//!
//! These tests run the public API end to end on a small fixture shaped like
//! the WHO life-expectancy dataset and on synthetic frames.

use life_processing::{
    CancellationToken, CleaningConfig, CleaningPipeline, CleaningStage, DuplicateAnalyzer,
    KnnConfig, KnnImputer, MissingValueAnalyzer, OutlierConfig, OutlierTreater, ProcessingError,
    PruneConfig, RedundantColumnPruner,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_sample() -> DataFrame {
    let path = fixtures_path().join("life_expectancy_sample.csv");
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

fn f64_at(df: &DataFrame, column: &str, row: usize) -> Option<f64> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .get(row)
}

fn row_of(df: &DataFrame, country: &str, year: i64) -> usize {
    let countries = df.column("Country").unwrap().as_materialized_series().str().unwrap().clone();
    let years = df.column("Year").unwrap().as_materialized_series().i64().unwrap().clone();
    (0..df.height())
        .find(|&i| countries.get(i) == Some(country) && years.get(i) == Some(year))
        .expect("row exists")
}

// ============================================================================
// Full Pipeline on the Fixture
// ============================================================================

#[test]
fn test_full_pipeline_on_sample() {
    let df = load_sample();
    assert_eq!(df.shape(), (37, 14));

    let result = CleaningPipeline::builder()
        .build()
        .unwrap()
        .run(&df)
        .expect("Pipeline should complete successfully");
    let report = &result.report;

    assert_eq!(report.rows, 37);
    assert_eq!(report.duplicates.duplicate_count, 1);
    assert_eq!(report.missing_before.total_missing, 4);
    assert_eq!(
        report.missing_before.groups_with_missing,
        vec!["Albania".to_string(), "Norway".to_string(), "Chad".to_string()]
    );

    assert_eq!(report.outliers.total_flagged, 1);
    assert_eq!(report.outliers.interpolated, 1);
    let gdp_flags = report
        .outliers
        .flagged_per_column
        .iter()
        .find(|c| c.column == "GDP")
        .unwrap();
    assert_eq!(gdp_flags.count, 1);

    assert_eq!(report.imputed_cells, 4);
    assert_eq!(report.final_frame.remaining_missing, 0);

    let pruning = report.pruning.as_ref().unwrap();
    assert_eq!(pruning.removed.len(), 5);
    assert!(pruning.skipped.is_empty());
    assert_eq!(report.columns_after, 9);
    assert_eq!(result.data.shape(), (37, 9));
}

#[test]
fn test_outlier_replaced_by_neighbor_interpolation() {
    let df = load_sample();
    let result = CleaningPipeline::builder().build().unwrap().run(&df).unwrap();

    let row = row_of(&result.data, "Albania", 2010);
    let gdp = f64_at(&result.data, "GDP", row).unwrap();
    assert!((gdp - 2604.8).abs() < 1e-9, "GDP = {gdp}");

    // Neighbors keep their original values.
    let before = row_of(&result.data, "Albania", 2009);
    assert_eq!(f64_at(&result.data, "GDP", before), Some(2530.0));
}

#[test]
fn test_categorical_columns_survive_cleaning() {
    let df = load_sample();
    let result = CleaningPipeline::builder().build().unwrap().run(&df).unwrap();

    for name in ["Country", "Status", "Year"] {
        let before = df.column(name).unwrap().as_materialized_series();
        let after = result.data.column(name).unwrap().as_materialized_series();
        assert!(after.equals_missing(before), "{name} changed");
    }
}

#[test]
fn test_json_report() {
    let df = load_sample();
    let result = CleaningPipeline::builder().build().unwrap().run(&df).unwrap();

    let json = serde_json::to_value(&result.report).unwrap();
    assert_eq!(json["duplicates"]["duplicate_count"], 1);
    assert_eq!(json["outliers"]["total_flagged"], 1);
    assert!(json["final_frame"]["numeric_summary"].is_array());
}

// ============================================================================
// Stage Properties
// ============================================================================

#[test]
fn test_duplicate_count_with_injected_row() {
    let df = df![
        "Country" => ["A", "A", "B"],
        "Year" => [2000i64, 2001, 2000],
    ]
    .unwrap();
    let injected = df.vstack(&df.slice(1, 1)).unwrap();

    let analyzer = DuplicateAnalyzer::new(&injected);
    assert_eq!(analyzer.count_duplicates(&["Country", "Year"]).unwrap(), 1);
    assert_eq!(
        DuplicateAnalyzer::new(&df)
            .count_duplicates(&["Country", "Year"])
            .unwrap(),
        0
    );
}

#[test]
fn test_gdp_outlier_scenario() {
    let df = df![
        "Country" => ["A"; 10],
        "Year" => (2000i64..2010).collect::<Vec<_>>(),
        "GDP" => [100.0, 102.0, 98.0, 101.0, 99.0, 5100.0, 100.0, 103.0, 97.0, 100.0],
        "Life expectancy " => [60.0, 60.5, 61.0, 61.5, 62.0, 62.5, 63.0, 63.5, 64.0, 64.5],
    ]
    .unwrap();

    let config = OutlierConfig {
        z_threshold: 2.5,
        ..Default::default()
    };
    let treated = OutlierTreater::new(&df, config).treat().unwrap();

    assert_eq!(treated.report.total_flagged, 1);
    assert_eq!(f64_at(&treated.data, "GDP", 5), Some(99.5));
    for row in (0..10).filter(|&r| r != 5) {
        assert_eq!(f64_at(&treated.data, "GDP", row), f64_at(&df, "GDP", row));
    }
}

#[test]
fn test_small_groups_never_flag() {
    let df = df![
        "Country" => ["A", "B", "C"],
        "GDP" => [1.0, 1e12, -1e12],
    ]
    .unwrap();
    let config = OutlierConfig {
        z_threshold: 0.01,
        ..Default::default()
    };
    let treated = OutlierTreater::new(&df, config).treat().unwrap();
    assert_eq!(treated.report.total_flagged, 0);
    assert!(treated.data.equals_missing(&df));
}

#[test]
fn test_all_missing_column_scenario() {
    let with_context = df![
        "Country" => ["A", "B", "C", "D"],
        "GDP" => [1.0, 2.0, 3.0, 4.0],
        "X" => [Option::<f64>::None, None, None, None],
    ]
    .unwrap();
    let imputed = KnnImputer::new(&with_context, KnnConfig::default())
        .impute()
        .unwrap();
    assert_eq!(imputed.column("X").unwrap().null_count(), 0);

    let alone = with_context.drop("GDP").unwrap();
    let err = KnnImputer::new(&alone, KnnConfig::default())
        .impute()
        .unwrap_err();
    assert_eq!(err.error_code(), "DEGENERATE_DATA");
}

#[test]
fn test_imputation_no_op_on_complete_data() {
    let df = df![
        "Country" => ["A", "B", "C"],
        "GDP" => [1.0, 2.0, 3.0],
        "Schooling" => [10.0, 12.0, 14.0],
    ]
    .unwrap();
    let imputed = KnnImputer::new(&df, KnnConfig::default()).impute().unwrap();
    assert!(imputed.equals_missing(&df));
}

#[test]
fn test_pruning_is_idempotent_on_sample() {
    let df = load_sample();
    let once = RedundantColumnPruner::new(&df, PruneConfig::default()).prune();
    let twice = RedundantColumnPruner::new(&once.frame, PruneConfig::default()).prune();

    assert!(once.pruned());
    assert!(!twice.pruned());
    assert!(twice.frame.equals_missing(&once.frame));
}

#[test]
fn test_missing_per_group_on_sample() {
    let df = load_sample();
    let per_group = MissingValueAnalyzer::new(&df, "Country")
        .missing_per_group()
        .unwrap();

    let counts: Vec<(&str, usize)> = per_group
        .iter()
        .map(|g| (g.group.as_str(), g.count))
        .collect();
    assert_eq!(counts, vec![("Chad", 2), ("Albania", 1), ("Norway", 1)]);
}

// ============================================================================
// Progress and Cancellation
// ============================================================================

#[test]
fn test_progress_is_monotonic() {
    let progress = Arc::new(Mutex::new(Vec::new()));
    let progress_clone = progress.clone();

    let df = load_sample();
    CleaningPipeline::builder()
        .on_progress(move |update| {
            progress_clone.lock().unwrap().push(update.progress);
        })
        .build()
        .unwrap()
        .run(&df)
        .unwrap();

    let values = progress.lock().unwrap().clone();
    assert!(values.len() >= 7);
    assert!(values.windows(2).all(|w| w[0] <= w[1] + 1e-6));
    assert_eq!(values.last(), Some(&1.0));
}

#[test]
fn test_cancellation_from_progress_callback() {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let updates = Arc::new(AtomicUsize::new(0));
    let updates_clone = updates.clone();

    let df = load_sample();
    let result = CleaningPipeline::builder()
        .cancellation_token(token)
        .on_progress(move |update| {
            updates_clone.fetch_add(1, Ordering::SeqCst);
            if update.stage == CleaningStage::OutlierTreatment {
                token_clone.cancel();
            }
        })
        .build()
        .unwrap()
        .run(&df);

    match result {
        Err(e) => assert!(e.is_cancelled()),
        Ok(_) => panic!("pipeline should have been cancelled"),
    }
    assert!(updates.load(Ordering::SeqCst) > 0);
}

#[test]
fn test_custom_config_changes_behavior() {
    let df = load_sample();
    let config = CleaningConfig::builder()
        .redundant_columns(["GDP", "Population"])
        .knn_neighbors(3)
        .build()
        .unwrap();

    let result = CleaningPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&df)
        .unwrap();

    assert!(result.data.column("GDP").is_err());
    assert!(result.data.column("Diphtheria ").is_ok());
    assert_eq!(result.report.columns_after, 12);
}

#[test]
fn test_missing_group_column_is_reported() {
    let df = load_sample().drop("Country").unwrap();
    let err = CleaningPipeline::builder().build().unwrap().run(&df).unwrap_err();
    assert!(matches!(err, ProcessingError::MissingColumns(ref cols) if cols == &vec!["Country".to_string()]));
    assert!(err.is_input_error());
}
