//! Shared helpers for moving column data between polars and plain vectors.
//!
//! The cleaning algorithms work on `Vec<Option<f64>>` per column. Both null
//! and NaN read as missing; values are written back as `Float64` with nulls.

use crate::error::Result;
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Column Extraction
// =============================================================================

/// Read a column as `f64`, treating nulls and NaN as missing.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let float_series = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Read a column as strings. Nulls stay `None`.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?;
    let str_series = column.as_materialized_series().cast(&DataType::String)?;
    let values = str_series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Row indices per group key, groups in order of first appearance.
///
/// Rows with a missing key belong to no group.
pub fn group_rows(keys: &[Option<String>]) -> Vec<(String, Vec<usize>)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for (row, key) in keys.iter().enumerate() {
        let Some(key) = key.as_deref() else {
            continue;
        };
        match positions.get(key) {
            Some(&idx) => groups[idx].1.push(row),
            None => {
                positions.insert(key, groups.len());
                groups.push((key.to_string(), vec![row]));
            }
        }
    }

    groups
}

/// Number of missing cells in a column (null, or NaN for float columns).
pub fn missing_count(column: &Column) -> Result<usize> {
    let series = column.as_materialized_series();
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let float_series = series.cast(&DataType::Float64)?;
            Ok(float_series
                .f64()?
                .into_iter()
                .filter(|v| v.is_none_or(f64::is_nan))
                .count())
        }
        _ => Ok(series.null_count()),
    }
}

/// Per-row missing flags for a column.
pub fn missing_mask(column: &Column) -> Result<Vec<bool>> {
    let series = column.as_materialized_series();
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let float_series = series.cast(&DataType::Float64)?;
            Ok(float_series
                .f64()?
                .into_iter()
                .map(|v| v.is_none_or(f64::is_nan))
                .collect())
        }
        _ => {
            let null_mask = series.is_null();
            Ok((0..series.len())
                .map(|idx| null_mask.get(idx).unwrap_or(true))
                .collect())
        }
    }
}

/// Replace `name` in `df` with a `Float64` column built from `values`.
pub fn replace_numeric(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    let series = Series::new(name.into(), values);
    df.replace(name, series)?;
    Ok(())
}

/// Count of observed (non-missing) values.
#[inline]
pub fn observed_count(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_some()).count()
}

/// Arithmetic mean of observed values.
pub fn observed_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean and sample standard deviation (ddof = 1) of a slice.
///
/// Returns `None` for fewer than two values.
pub fn mean_and_sample_std(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some((mean, var.sqrt()))
}
