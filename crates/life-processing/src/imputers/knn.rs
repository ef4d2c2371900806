//! K-nearest-neighbors imputation over the numeric working set.
//!
//! Distances use the nan-euclidean metric: only coordinates present in both
//! rows contribute, and the sum is scaled up by `n_features / n_present`.
//! Every call rebuilds the full pairwise picture from scratch, so cost grows
//! with `rows² × features`. There is no index.

use crate::config::{KnnConfig, KnnWeighting};
use crate::error::{ProcessingError, Result};
use crate::utils::{numeric_values, observed_mean, replace_numeric};
use polars::prelude::*;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Imputed frame plus bookkeeping for reports.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    pub data: DataFrame,
    /// Number of cells that were missing and now hold a value.
    pub imputed_cells: usize,
    /// Columns with no observed value, filled with 0.0.
    pub zero_filled: Vec<String>,
}

/// Fills missing numeric cells from the k most similar rows.
pub struct KnnImputer {
    df: DataFrame,
    config: KnnConfig,
}

impl KnnImputer {
    /// Take a private copy of `df`.
    pub fn new(df: &DataFrame, config: KnnConfig) -> Self {
        Self {
            df: df.clone(),
            config,
        }
    }

    /// Impute every missing numeric cell and return the new frame.
    ///
    /// # Errors
    ///
    /// - [`ProcessingError::InvalidParameter`] if `n_neighbors` is zero
    /// - [`ProcessingError::NoNumericColumns`] if no cleanable numeric column exists
    /// - [`ProcessingError::DegenerateData`] if the numeric columns hold no observed value
    pub fn impute(&self) -> Result<DataFrame> {
        self.impute_with_outcome().map(|outcome| outcome.data)
    }

    /// Like [`KnnImputer::impute`] but also returns what was filled.
    pub fn impute_with_outcome(&self) -> Result<ImputationOutcome> {
        let k = self.config.n_neighbors;
        if k == 0 {
            return Err(ProcessingError::invalid_parameter(
                "n_neighbors",
                "must be at least 1",
            ));
        }

        let columns = self.config.schema.numeric_columns(&self.df);
        if columns.is_empty() {
            return Err(ProcessingError::NoNumericColumns("KNN imputation".to_string()));
        }

        let matrix = self.build_matrix(&columns)?;
        let observed = matrix.iter().flatten().filter(|v| v.is_some()).count();
        if observed == 0 {
            return Err(ProcessingError::DegenerateData(format!(
                "numeric columns [{}] contain no observed values to impute from",
                columns.join(", ")
            )));
        }

        let mut outcome = ImputationOutcome {
            data: self.df.clone(),
            imputed_cells: 0,
            zero_filled: Vec::new(),
        };

        for (col_idx, name) in columns.iter().enumerate() {
            let column_values: Vec<Option<f64>> = matrix.iter().map(|row| row[col_idx]).collect();
            let missing_rows: Vec<usize> = column_values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_none())
                .map(|(row, _)| row)
                .collect();

            if missing_rows.is_empty() {
                continue;
            }

            let mut filled = column_values.clone();
            match observed_mean(&column_values) {
                None => {
                    warn!("Column '{}' has no observed values, filling with 0.0", name);
                    for &row in &missing_rows {
                        filled[row] = Some(0.0);
                    }
                    outcome.zero_filled.push(name.clone());
                }
                Some(fallback) => {
                    for &row in &missing_rows {
                        let value = self
                            .impute_cell(&matrix, row, col_idx, k)
                            .unwrap_or(fallback);
                        filled[row] = Some(value);
                    }
                }
            }

            debug!("KNN imputed {} cells in '{}'", missing_rows.len(), name);
            outcome.imputed_cells += missing_rows.len();
            replace_numeric(&mut outcome.data, name, filled)?;
        }

        info!(
            "KNN imputation filled {} cells across {} numeric columns (k = {})",
            outcome.imputed_cells,
            columns.len(),
            k
        );

        Ok(outcome)
    }

    /// Row-major `f64` view of the working set. NaN reads as missing.
    fn build_matrix(&self, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
        let n_rows = self.df.height();
        let mut matrix = vec![vec![None; columns.len()]; n_rows];

        for (col_idx, name) in columns.iter().enumerate() {
            for (row, value) in numeric_values(&self.df, name)?.into_iter().enumerate() {
                matrix[row][col_idx] = value;
            }
        }

        Ok(matrix)
    }

    /// Aggregate of the k nearest donors for one cell, `None` without donors.
    fn impute_cell(
        &self,
        matrix: &[Vec<Option<f64>>],
        target_row: usize,
        target_col: usize,
        k: usize,
    ) -> Option<f64> {
        let mut donors: Vec<(usize, f64)> = matrix
            .iter()
            .enumerate()
            .filter(|&(row, values)| row != target_row && values[target_col].is_some())
            .map(|(row, values)| (row, nan_euclidean(&matrix[target_row], values)))
            .filter(|(_, distance)| distance.is_finite())
            .collect();

        if donors.is_empty() {
            return None;
        }

        // Ties resolve by row position so results do not depend on sort stability.
        donors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        donors.truncate(k);

        let neighbors: Vec<(f64, f64)> = donors
            .iter()
            .filter_map(|&(row, distance)| matrix[row][target_col].map(|value| (value, distance)))
            .collect();

        aggregate(&neighbors, self.config.weighting)
    }
}

/// Distance between two rows over the coordinates both have.
///
/// `f64::INFINITY` when the rows share no present coordinate.
fn nan_euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let n_features = a.len();
    let (sum, present) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some((x.as_ref()?, y.as_ref()?)))
        .fold((0.0, 0usize), |(sum, present), (x, y)| {
            (sum + (x - y).powi(2), present + 1)
        });

    if present == 0 {
        return f64::INFINITY;
    }
    (n_features as f64 / present as f64 * sum).sqrt()
}

/// Combine `(value, distance)` donors.
fn aggregate(neighbors: &[(f64, f64)], weighting: KnnWeighting) -> Option<f64> {
    if neighbors.is_empty() {
        return None;
    }

    match weighting {
        KnnWeighting::Uniform => {
            Some(neighbors.iter().map(|(v, _)| v).sum::<f64>() / neighbors.len() as f64)
        }
        KnnWeighting::Distance => {
            // Exact matches take all the weight.
            let exact: Vec<f64> = neighbors
                .iter()
                .filter(|(_, d)| *d == 0.0)
                .map(|(v, _)| *v)
                .collect();
            if !exact.is_empty() {
                return Some(exact.iter().sum::<f64>() / exact.len() as f64);
            }

            let (weighted, weights) = neighbors
                .iter()
                .fold((0.0, 0.0), |(weighted, weights), (v, d)| {
                    (weighted + v / d, weights + 1.0 / d)
                });
            Some(weighted / weights)
        }
    }
}
