//! Report types produced by the cleaning stages.
//!
//! Every report is plain data, serializable to JSON, and never written back
//! into the dataset.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// A count attached to a column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCount {
    pub column: String,
    pub count: usize,
}

impl ColumnCount {
    pub fn new(column: impl Into<String>, count: usize) -> Self {
        Self {
            column: column.into(),
            count,
        }
    }
}

/// A count attached to a group key (country).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

/// Result of the duplicate diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Columns that formed the row key.
    pub subset: Vec<String>,
    /// Rows whose key repeats an earlier row's key.
    pub duplicate_count: usize,
    /// Distinct values per non-numeric column.
    pub distinct_counts: Vec<ColumnCount>,
}

/// Result of the missing-value diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingValueReport {
    /// Missing cells per column, in frame order.
    pub per_column: Vec<ColumnCount>,
    /// Groups with at least one missing cell, in order of first appearance.
    pub groups_with_missing: Vec<String>,
    /// Missing cells per group, largest first.
    pub per_group: Vec<GroupCount>,
    /// Missing cells in the whole frame.
    pub total_missing: usize,
}

/// Outcome of outlier treatment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Columns that were scanned, in frame order.
    pub columns: Vec<String>,
    /// Flagged cells per scanned column (zero counts included).
    pub flagged_per_column: Vec<ColumnCount>,
    /// Number of groups scanned.
    pub groups: usize,
    pub total_flagged: usize,
    /// Flagged cells that received an interpolated value.
    pub interpolated: usize,
    /// Flagged cells with no valid neighbor in their group, left missing.
    pub left_missing: usize,
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Pearson correlation between two numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
}

/// Snapshot of the frame after cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalFrameReport {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    /// Missing cells remaining anywhere in the frame.
    pub remaining_missing: usize,
    pub numeric_summary: Vec<ColumnStats>,
    /// Column pairs at or above the configured correlation threshold.
    pub strong_correlations: Vec<CorrelationPair>,
}

/// Which redundant columns were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub removed: Vec<String>,
    /// Configured columns that were not present.
    pub skipped: Vec<String>,
}

/// Summary of a full cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub duplicates: DuplicateReport,
    pub missing_before: MissingValueReport,
    pub outliers: OutlierReport,
    /// Cells filled by the imputation stage.
    pub imputed_cells: usize,
    pub final_frame: FinalFrameReport,
    /// `None` when pruning is disabled.
    pub pruning: Option<PruneReport>,
    pub duration_ms: u64,
}

/// Cleaned data plus its report.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    pub data: DataFrame,
    pub report: CleaningReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaning_report_serialization() {
        let report = CleaningReport {
            rows: 10,
            columns_before: 5,
            columns_after: 4,
            outliers: OutlierReport {
                columns: vec!["GDP".to_string()],
                flagged_per_column: vec![ColumnCount::new("GDP", 1)],
                groups: 1,
                total_flagged: 1,
                interpolated: 1,
                left_missing: 0,
            },
            pruning: Some(PruneReport {
                removed: vec!["Diphtheria ".to_string()],
                skipped: vec![],
            }),
            ..Default::default()
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: CleaningReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert!(json.contains("\"total_flagged\":1"));
    }
}
