use crate::error::{ProcessingError, Result};
use crate::schema::require_columns;
use crate::types::{ColumnCount, DuplicateReport};
use crate::utils::{is_numeric_dtype, string_values};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Duplicate-key and cardinality checks.
pub struct DuplicateAnalyzer<'a> {
    df: &'a DataFrame,
}

impl<'a> DuplicateAnalyzer<'a> {
    pub fn new(df: &'a DataFrame) -> Self {
        Self { df }
    }

    /// Number of rows whose `subset` key repeats an earlier row's key.
    ///
    /// Missing values compare equal to each other.
    pub fn count_duplicates<S: AsRef<str>>(&self, subset: &[S]) -> Result<usize> {
        if subset.is_empty() {
            return Err(ProcessingError::invalid_parameter(
                "subset",
                "at least one column is required",
            ));
        }
        require_columns(self.df, subset)?;

        let key_columns = subset
            .iter()
            .map(|name| string_values(self.df, name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(self.df.height());
        let mut duplicates = 0;
        for row in 0..self.df.height() {
            let key: Vec<Option<&str>> = key_columns
                .iter()
                .map(|values| values[row].as_deref())
                .collect();
            if !seen.insert(key) {
                duplicates += 1;
            }
        }

        debug!("Found {} duplicate rows over {} key columns", duplicates, subset.len());
        Ok(duplicates)
    }

    /// Distinct non-missing values of every non-numeric column, in frame order.
    pub fn distinct_counts(&self) -> Result<Vec<ColumnCount>> {
        self.df
            .get_columns()
            .iter()
            .filter(|col| !is_numeric_dtype(col.dtype()))
            .map(|col| {
                let name = col.name().as_str();
                let values = string_values(self.df, name)?;
                let distinct: HashSet<&str> = values.iter().flatten().map(String::as_str).collect();
                Ok(ColumnCount::new(name, distinct.len()))
            })
            .collect()
    }

    pub fn analyze<S: AsRef<str>>(&self, subset: &[S]) -> Result<DuplicateReport> {
        Ok(DuplicateReport {
            subset: subset.iter().map(|s| s.as_ref().to_string()).collect(),
            duplicate_count: self.count_duplicates(subset)?,
            distinct_counts: self.distinct_counts()?,
        })
    }
}
