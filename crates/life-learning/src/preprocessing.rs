//! Feature preprocessing fit on the training partition.
//!
//! Label columns are integer-encoded in sorted order of the training values.
//! Every other feature is min-max scaled with the training minimum and
//! maximum. The fitted parameters are reused unchanged on validation, test
//! and prediction rows, so those values may fall outside `[0, 1]`.

use crate::error::LearningError;
use life_processing::utils::{is_numeric_dtype, numeric_values, string_values};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a single feature column is turned into a model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoding {
    /// Index into the sorted training classes; unseen values map to
    /// `classes.len()`.
    Label { classes: Vec<String> },
    /// `(x - min) / (max - min)`, or 0.0 when the training range is empty.
    MinMax { min: f64, max: f64 },
}

impl FeatureEncoding {
    fn encode_label(classes: &[String], value: &str) -> f64 {
        classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .unwrap_or(classes.len()) as f64
    }

    fn scale(min: f64, max: f64, value: f64) -> f64 {
        let range = max - min;
        if range > 0.0 { (value - min) / range } else { 0.0 }
    }
}

/// A feature column and its fitted encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransform {
    pub column: String,
    pub encoding: FeatureEncoding,
}

/// Label encodings and min-max bounds fit on the training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    features: Vec<FeatureTransform>,
}

impl FittedPreprocessor {
    /// Fit on `train_rows` of `df`.
    ///
    /// Features are every column except `target_column`, in frame order.
    /// Columns named in `label_columns` are label-encoded; the rest must
    /// have a numeric dtype.
    ///
    /// # Errors
    ///
    /// - [`LearningError::ColumnNotFound`] if a label column is absent
    /// - [`LearningError::InvalidData`] if there are no feature columns, a
    ///   non-label feature is not numeric, or a training value is missing
    pub fn fit(
        df: &DataFrame,
        target_column: &str,
        label_columns: &[String],
        train_rows: &[usize],
    ) -> Result<Self, LearningError> {
        if let Some(missing) = label_columns
            .iter()
            .find(|name| df.column(name.as_str()).is_err())
        {
            return Err(LearningError::ColumnNotFound(missing.clone()));
        }

        let mut features = Vec::new();
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == target_column {
                continue;
            }

            let encoding = if label_columns.iter().any(|label| label == name) {
                let values = string_values(df, name)?;
                let mut classes = train_rows
                    .iter()
                    .map(|&row| {
                        values[row].clone().ok_or_else(|| missing_value(name, row))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                classes.sort_unstable();
                classes.dedup();
                FeatureEncoding::Label { classes }
            } else {
                if !is_numeric_dtype(column.dtype()) {
                    return Err(LearningError::InvalidData(format!(
                        "feature column '{name}' has non-numeric type {}; list it as a label column",
                        column.dtype()
                    )));
                }
                let values = numeric_values(df, name)?;
                let mut min = f64::INFINITY;
                let mut max = f64::NEG_INFINITY;
                for &row in train_rows {
                    let value = values[row].ok_or_else(|| missing_value(name, row))?;
                    min = min.min(value);
                    max = max.max(value);
                }
                FeatureEncoding::MinMax { min, max }
            };

            debug!("Fitted feature '{}': {:?}", name, encoding);
            features.push(FeatureTransform {
                column: name.to_string(),
                encoding,
            });
        }

        if features.is_empty() {
            return Err(LearningError::InvalidData(
                "frame has no feature columns besides the target".to_string(),
            ));
        }

        Ok(Self { features })
    }

    pub fn features(&self) -> &[FeatureTransform] {
        &self.features
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.column.clone()).collect()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Encode `rows` of `df` (all rows when `None`) into a row-major matrix.
    ///
    /// # Errors
    ///
    /// - [`LearningError::ColumnNotFound`] if a fitted feature is absent
    /// - [`LearningError::InvalidData`] if a selected value is missing
    pub fn transform(
        &self,
        df: &DataFrame,
        rows: Option<&[usize]>,
    ) -> Result<Array2<f64>, LearningError> {
        let all_rows: Vec<usize>;
        let rows = match rows {
            Some(rows) => rows,
            None => {
                all_rows = (0..df.height()).collect();
                &all_rows
            }
        };

        let mut matrix = Array2::zeros((rows.len(), self.features.len()));
        for (j, feature) in self.features.iter().enumerate() {
            let name = feature.column.as_str();
            if df.column(name).is_err() {
                return Err(LearningError::ColumnNotFound(name.to_string()));
            }

            match &feature.encoding {
                FeatureEncoding::Label { classes } => {
                    let values = string_values(df, name)?;
                    for (i, &row) in rows.iter().enumerate() {
                        let value = values[row].as_deref().ok_or_else(|| missing_value(name, row))?;
                        matrix[[i, j]] = FeatureEncoding::encode_label(classes, value);
                    }
                }
                FeatureEncoding::MinMax { min, max } => {
                    let values = numeric_values(df, name)?;
                    for (i, &row) in rows.iter().enumerate() {
                        let value = values[row].ok_or_else(|| missing_value(name, row))?;
                        matrix[[i, j]] = FeatureEncoding::scale(*min, *max, value);
                    }
                }
            }
        }
        Ok(matrix)
    }
}

fn missing_value(column: &str, row: usize) -> LearningError {
    LearningError::InvalidData(format!(
        "feature column '{column}' has a missing value at row {row}; impute before training"
    ))
}
