use crate::error::{ProcessingError, Result};
use crate::types::{ColumnCount, GroupCount, MissingValueReport};
use crate::utils::{group_rows, missing_count, missing_mask, string_values};
use polars::prelude::*;
use tracing::debug;

/// Missing-value counts per column and per group.
///
/// A cell is missing when it is null, or NaN in a float column.
pub struct MissingValueAnalyzer<'a> {
    df: &'a DataFrame,
    group_column: String,
}

impl<'a> MissingValueAnalyzer<'a> {
    pub fn new(df: &'a DataFrame, group_column: impl Into<String>) -> Self {
        Self {
            df,
            group_column: group_column.into(),
        }
    }

    /// Missing cells per column, in frame order.
    pub fn missing_per_column(&self) -> Result<Vec<ColumnCount>> {
        self.df
            .get_columns()
            .iter()
            .map(|col| Ok(ColumnCount::new(col.name().as_str(), missing_count(col)?)))
            .collect()
    }

    /// Groups owning at least one missing cell, in order of first appearance.
    pub fn groups_with_missing(&self) -> Result<Vec<String>> {
        Ok(self
            .group_totals()?
            .into_iter()
            .filter(|g| g.count > 0)
            .map(|g| g.group)
            .collect())
    }

    /// Missing cells per group, largest first. Ties sort by group key.
    pub fn missing_per_group(&self) -> Result<Vec<GroupCount>> {
        let mut totals = self.group_totals()?;
        totals.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.group.cmp(&b.group)));
        Ok(totals)
    }

    pub fn analyze(&self) -> Result<MissingValueReport> {
        let per_column = self.missing_per_column()?;
        let total_missing = per_column.iter().map(|c| c.count).sum();
        let report = MissingValueReport {
            per_column,
            groups_with_missing: self.groups_with_missing()?,
            per_group: self.missing_per_group()?,
            total_missing,
        };
        debug!(
            "{} missing cells across {} groups",
            report.total_missing,
            report.groups_with_missing.len()
        );
        Ok(report)
    }

    /// Missing cells per group, groups in order of first appearance.
    fn group_totals(&self) -> Result<Vec<GroupCount>> {
        if self.df.get_column_index(&self.group_column).is_none() {
            return Err(ProcessingError::ColumnNotFound(self.group_column.clone()));
        }

        let mut per_row = vec![0usize; self.df.height()];
        for col in self.df.get_columns() {
            for (row, missing) in missing_mask(col)?.into_iter().enumerate() {
                if missing {
                    per_row[row] += 1;
                }
            }
        }

        let keys = string_values(self.df, &self.group_column)?;
        Ok(group_rows(&keys)
            .into_iter()
            .map(|(group, rows)| GroupCount {
                group,
                count: rows.iter().map(|&row| per_row[row]).sum(),
            })
            .collect())
    }
}
