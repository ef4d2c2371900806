//! Per-group Z-score outlier treatment.
//!
//! Within every (group, column) pair the observed values get a sample Z-score
//! (ddof = 1). Values beyond the threshold are blanked and refilled by linear
//! interpolation over their position inside the group, using the group's own
//! non-flagged values. Nothing outside the flagged cells changes.

use crate::config::OutlierConfig;
use crate::error::{ProcessingError, Result};
use crate::types::{ColumnCount, OutlierReport};
use crate::utils::{group_rows, mean_and_sample_std, numeric_values, replace_numeric, string_values};
use polars::prelude::*;
use tracing::{debug, info};

/// Cleaned frame plus what was changed.
#[derive(Debug, Clone)]
pub struct OutlierTreatment {
    pub data: DataFrame,
    pub report: OutlierReport,
}

/// Replaces per-country Z-score outliers with interpolated values.
pub struct OutlierTreater {
    df: DataFrame,
    config: OutlierConfig,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct GroupOutcome {
    flagged: usize,
    interpolated: usize,
    left_missing: usize,
}

impl OutlierTreater {
    /// Take a private copy of `df`.
    pub fn new(df: &DataFrame, config: OutlierConfig) -> Self {
        Self {
            df: df.clone(),
            config,
        }
    }

    /// Detect and interpolate outliers.
    ///
    /// # Errors
    ///
    /// - [`ProcessingError::ColumnNotFound`] if the grouping column is absent
    /// - [`ProcessingError::NoNumericColumns`] if no cleanable numeric column exists
    pub fn treat(&self) -> Result<OutlierTreatment> {
        let schema = &self.config.schema;
        schema.require_group_column(&self.df)?;

        let columns = schema.numeric_columns(&self.df);
        if columns.is_empty() {
            return Err(ProcessingError::NoNumericColumns(
                "outlier treatment".to_string(),
            ));
        }

        let keys = string_values(&self.df, &schema.group_column)?;
        let groups = group_rows(&keys);
        debug!(
            "Scanning {} columns across {} groups (threshold {})",
            columns.len(),
            groups.len(),
            self.config.z_threshold
        );

        let mut data = self.df.clone();
        let mut report = OutlierReport {
            columns: columns.clone(),
            groups: groups.len(),
            ..Default::default()
        };

        for column in &columns {
            let mut values = numeric_values(&self.df, column)?;
            let mut column_outcome = GroupOutcome::default();

            for (_, rows) in &groups {
                let outcome = treat_group(&mut values, rows, self.config.z_threshold);
                column_outcome.flagged += outcome.flagged;
                column_outcome.interpolated += outcome.interpolated;
                column_outcome.left_missing += outcome.left_missing;
            }

            if column_outcome.flagged > 0 {
                debug!("Column '{}': {} outliers flagged", column, column_outcome.flagged);
                replace_numeric(&mut data, column, values)?;
            }

            report
                .flagged_per_column
                .push(ColumnCount::new(column.as_str(), column_outcome.flagged));
            report.total_flagged += column_outcome.flagged;
            report.interpolated += column_outcome.interpolated;
            report.left_missing += column_outcome.left_missing;
        }

        info!(
            "Outlier treatment flagged {} cells ({} interpolated, {} left missing)",
            report.total_flagged, report.interpolated, report.left_missing
        );

        Ok(OutlierTreatment { data, report })
    }
}

/// Flag and interpolate one group's slice of a column in place.
fn treat_group(values: &mut [Option<f64>], rows: &[usize], z_threshold: f64) -> GroupOutcome {
    let observed: Vec<f64> = rows.iter().filter_map(|&row| values[row]).collect();

    let Some((mean, std)) = mean_and_sample_std(&observed) else {
        return GroupOutcome::default();
    };
    if !std.is_finite() || std <= 0.0 {
        return GroupOutcome::default();
    }

    let flags: Vec<bool> = rows
        .iter()
        .map(|&row| {
            values[row].is_some_and(|v| {
                let z = (v - mean) / std;
                z.is_finite() && z.abs() > z_threshold
            })
        })
        .collect();

    let flagged = flags.iter().filter(|&&f| f).count();
    if flagged == 0 {
        return GroupOutcome::default();
    }

    // Anchors are positions whose value survives: observed and not flagged.
    let anchors: Vec<Option<f64>> = rows
        .iter()
        .zip(&flags)
        .map(|(&row, &flag)| if flag { None } else { values[row] })
        .collect();

    let mut outcome = GroupOutcome {
        flagged,
        ..Default::default()
    };

    for (pos, &row) in rows.iter().enumerate() {
        if !flags[pos] {
            continue;
        }
        let filled = interpolate_at(&anchors, pos);
        if filled.is_some() {
            outcome.interpolated += 1;
        } else {
            outcome.left_missing += 1;
        }
        values[row] = filled;
    }

    outcome
}

/// Linear interpolation by position between the nearest anchors.
///
/// With an anchor on one side only, that anchor's value is used.
fn interpolate_at(anchors: &[Option<f64>], pos: usize) -> Option<f64> {
    let before = anchors[..pos]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, v)| v.map(|v| (i, v)));
    let after = anchors[pos + 1..]
        .iter()
        .enumerate()
        .find_map(|(i, v)| v.map(|v| (pos + 1 + i, v)));

    match (before, after) {
        (Some((i0, v0)), Some((i1, v1))) => {
            let t = (pos - i0) as f64 / (i1 - i0) as f64;
            Some(v0 + (v1 - v0) * t)
        }
        (Some((_, v)), None) | (None, Some((_, v))) => Some(v),
        (None, None) => None,
    }
}
