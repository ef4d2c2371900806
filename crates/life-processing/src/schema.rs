//! Typed dataset schema.
//!
//! Columns carry an explicit [`ColumnRole`]. Stages that work on "numeric
//! columns" ask the schema for them instead of guessing from dtypes alone, so
//! categorical and identifier columns are never rewritten even when their dtype
//! happens to be numeric.

use crate::error::{ProcessingError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Grouping column of the life-expectancy dataset.
pub const COUNTRY: &str = "Country";
/// Development status column.
pub const STATUS: &str = "Status";
/// Observation year.
pub const YEAR: &str = "Year";
/// Target column. The source dataset header carries a trailing space.
pub const LIFE_EXPECTANCY: &str = "Life expectancy ";

/// Semantic role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Part of the row key, never cleaned (e.g. `Year`).
    Identifier,
    /// Non-numeric label, never cleaned or imputed.
    Categorical,
    /// Numeric indicator, subject to outlier treatment and imputation.
    Numeric,
    /// Prediction target; numeric and cleaned like any indicator.
    Target,
}

impl ColumnRole {
    /// Whether cleaning stages may rewrite values of this role.
    pub fn is_cleanable(&self) -> bool {
        matches!(self, ColumnRole::Numeric | ColumnRole::Target)
    }
}

/// A declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Named columns with declared roles plus the grouping key.
///
/// Columns that are present in a frame but not declared here get a role from
/// their dtype: numeric dtypes are [`ColumnRole::Numeric`], everything else is
/// [`ColumnRole::Categorical`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Column used to group rows (one group per country).
    pub group_column: String,
    /// Declared columns, in declaration order.
    pub columns: Vec<ColumnSpec>,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self::life_expectancy()
    }
}

impl DatasetSchema {
    /// Create a schema with only a grouping column declared.
    pub fn new(group_column: impl Into<String>) -> Self {
        let group_column = group_column.into();
        Self {
            columns: vec![ColumnSpec {
                name: group_column.clone(),
                role: ColumnRole::Categorical,
            }],
            group_column,
        }
    }

    /// The schema of the WHO life-expectancy dataset.
    pub fn life_expectancy() -> Self {
        Self::new(COUNTRY)
            .with_column(STATUS, ColumnRole::Categorical)
            .with_column(YEAR, ColumnRole::Identifier)
            .with_column(LIFE_EXPECTANCY, ColumnRole::Target)
    }

    /// Declare (or redeclare) a column.
    pub fn with_column(mut self, name: impl Into<String>, role: ColumnRole) -> Self {
        let name = name.into();
        if let Some(spec) = self.columns.iter_mut().find(|c| c.name == name) {
            spec.role = role;
        } else {
            self.columns.push(ColumnSpec { name, role });
        }
        self
    }

    /// Role declared for `name`, if any.
    pub fn declared_role(&self, name: &str) -> Option<ColumnRole> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.role)
    }

    /// Effective role of a frame column.
    pub fn role_of(&self, column: &Column) -> ColumnRole {
        self.declared_role(column.name().as_str())
            .unwrap_or_else(|| {
                if is_numeric_dtype(column.dtype()) {
                    ColumnRole::Numeric
                } else {
                    ColumnRole::Categorical
                }
            })
    }

    /// Name of the declared target column, if any.
    pub fn target_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.role == ColumnRole::Target)
            .map(|c| c.name.as_str())
    }

    /// Columns of `df` that cleaning stages may rewrite, in frame order.
    ///
    /// A column qualifies when its dtype is numeric and its role is
    /// [`ColumnRole::Numeric`] or [`ColumnRole::Target`].
    pub fn numeric_columns(&self, df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()) && self.role_of(col).is_cleanable())
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Columns of `df` with a categorical role, in frame order.
    pub fn categorical_columns(&self, df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| self.role_of(col) == ColumnRole::Categorical)
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Fail with [`ProcessingError::ColumnNotFound`] if the grouping column is absent.
    pub fn require_group_column(&self, df: &DataFrame) -> Result<()> {
        if df.get_column_index(&self.group_column).is_none() {
            return Err(ProcessingError::ColumnNotFound(self.group_column.clone()));
        }
        Ok(())
    }
}

/// Fail with [`ProcessingError::MissingColumns`] listing every absent column.
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, required: &[S]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| df.get_column_index(name).is_none())
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProcessingError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        df![
            "Country" => ["A", "A", "B"],
            "Year" => [2000i64, 2001, 2000],
            "Status" => ["Developing", "Developing", "Developed"],
            "Life expectancy " => [60.0, 61.0, 75.0],
            "GDP" => [Some(100.0), None, Some(900.0)],
        ]
        .unwrap()
    }

    #[test]
    fn test_life_expectancy_roles() {
        let schema = DatasetSchema::life_expectancy();
        assert_eq!(schema.group_column, COUNTRY);
        assert_eq!(schema.declared_role(YEAR), Some(ColumnRole::Identifier));
        assert_eq!(schema.declared_role(STATUS), Some(ColumnRole::Categorical));
        assert_eq!(schema.target_column(), Some(LIFE_EXPECTANCY));
        assert_eq!(schema.declared_role("GDP"), None);
    }

    #[test]
    fn test_numeric_columns_skip_identifiers() {
        let schema = DatasetSchema::life_expectancy();
        let df = sample_frame();
        assert_eq!(
            schema.numeric_columns(&df),
            vec!["Life expectancy ".to_string(), "GDP".to_string()]
        );
        assert_eq!(
            schema.categorical_columns(&df),
            vec!["Country".to_string(), "Status".to_string()]
        );
    }

    #[test]
    fn test_declared_categorical_with_numeric_dtype_is_not_cleanable() {
        let schema = DatasetSchema::new("Country").with_column("Code", ColumnRole::Categorical);
        let df = df![
            "Country" => ["A", "B"],
            "Code" => [1i64, 2],
            "Value" => [1.0, 2.0],
        ]
        .unwrap();
        assert_eq!(schema.numeric_columns(&df), vec!["Value".to_string()]);
    }

    #[test]
    fn test_with_column_redeclares() {
        let schema = DatasetSchema::life_expectancy().with_column(YEAR, ColumnRole::Numeric);
        assert_eq!(schema.declared_role(YEAR), Some(ColumnRole::Numeric));
        assert_eq!(schema.columns.iter().filter(|c| c.name == YEAR).count(), 1);
    }

    #[test]
    fn test_require_columns() {
        let df = sample_frame();
        assert!(require_columns(&df, &["Country", "Year"]).is_ok());

        let err = require_columns(&df, &["Country", "Population", "BMI"]).unwrap_err();
        match err {
            ProcessingError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Population".to_string(), "BMI".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_group_column() {
        let schema = DatasetSchema::life_expectancy();
        let df = df!["GDP" => [1.0, 2.0]].unwrap();
        assert!(matches!(
            schema.require_group_column(&df),
            Err(ProcessingError::ColumnNotFound(name)) if name == "Country"
        ));
    }
}
