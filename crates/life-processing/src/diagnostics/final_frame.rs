use crate::error::{ProcessingError, Result};
use crate::types::{ColumnStats, CorrelationPair, FinalFrameReport};
use crate::utils::{is_numeric_dtype, mean_and_sample_std, missing_count, numeric_values};
use polars::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

/// Default minimum absolute correlation reported.
const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.5;

/// Shape, remaining gaps, descriptive statistics and strong correlations of
/// a cleaned frame.
pub struct FinalFrameAnalyzer<'a> {
    df: &'a DataFrame,
    correlation_threshold: f64,
}

impl<'a> FinalFrameAnalyzer<'a> {
    pub fn new(df: &'a DataFrame) -> Self {
        Self {
            df,
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
        }
    }

    pub fn with_correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    pub fn summarize(&self) -> Result<FinalFrameReport> {
        let mut remaining_missing = 0;
        for col in self.df.get_columns() {
            remaining_missing += missing_count(col)?;
        }

        let numeric_summary = self
            .numeric_column_names()
            .iter()
            .map(|name| self.column_stats(name))
            .collect::<Result<Vec<_>>>()?;

        let report = FinalFrameReport {
            rows: self.df.height(),
            columns: self.df.width(),
            column_names: self
                .df
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            remaining_missing,
            numeric_summary,
            strong_correlations: self.strong_correlations(self.correlation_threshold)?,
        };

        debug!(
            "Final frame: {} rows x {} columns, {} missing cells",
            report.rows, report.columns, report.remaining_missing
        );
        Ok(report)
    }

    /// Pearson correlations with `|r| >= threshold`, strongest first.
    ///
    /// Each pair uses the rows where both columns are observed. Pairs with
    /// fewer than two such rows or a constant side are skipped.
    pub fn strong_correlations(&self, threshold: f64) -> Result<Vec<CorrelationPair>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ProcessingError::invalid_parameter(
                "threshold",
                format!("{threshold} is outside [0, 1]"),
            ));
        }

        let names = self.numeric_column_names();
        let columns = names
            .iter()
            .map(|name| numeric_values(self.df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut pairs = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                let Some(r) = pearson(&columns[i], &columns[j]) else {
                    continue;
                };
                if r.abs() >= threshold {
                    pairs.push(CorrelationPair {
                        left: names[i].clone(),
                        right: names[j].clone(),
                        coefficient: r,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.coefficient
                .abs()
                .partial_cmp(&a.coefficient.abs())
                .unwrap_or(Ordering::Equal)
        });
        Ok(pairs)
    }

    fn numeric_column_names(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }

    fn column_stats(&self, name: &str) -> Result<ColumnStats> {
        let values = numeric_values(self.df, name)?;
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let count = observed.len();

        let mean = (count > 0).then(|| observed.iter().sum::<f64>() / count as f64);
        let std = mean_and_sample_std(&observed).map(|(_, std)| std);
        let min = observed.iter().copied().reduce(f64::min);
        let max = observed.iter().copied().reduce(f64::max);

        Ok(ColumnStats {
            column: name.to_string(),
            count,
            missing: values.len() - count,
            mean,
            std,
            min,
            max,
        })
    }
}

/// Pearson correlation over pairwise-complete rows.
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df![
            "Country" => ["A", "A", "B", "B"],
            "x" => [1.0, 2.0, 3.0, 4.0],
            "up" => [2.0, 4.0, 6.0, 8.0],
            "down" => [4.0, 3.0, 1.0, 1.0],
            "noise" => [1.0, -1.0, -1.0, 1.0],
            "gaps" => [Some(5.0), None, None, None],
        ]
        .unwrap()
    }

    #[test]
    fn test_summarize_shape_and_stats() {
        let df = frame();
        let report = FinalFrameAnalyzer::new(&df).summarize().unwrap();

        assert_eq!(report.rows, 4);
        assert_eq!(report.columns, 6);
        assert_eq!(report.column_names[0], "Country");
        assert_eq!(report.remaining_missing, 3);
        assert_eq!(report.numeric_summary.len(), 5);

        let x = &report.numeric_summary[0];
        assert_eq!(x.column, "x");
        assert_eq!(x.count, 4);
        assert_eq!(x.mean, Some(2.5));
        assert_eq!(x.min, Some(1.0));
        assert_eq!(x.max, Some(4.0));

        let gaps = &report.numeric_summary[4];
        assert_eq!(gaps.count, 1);
        assert_eq!(gaps.missing, 3);
        assert_eq!(gaps.std, None);
    }

    #[test]
    fn test_strong_correlations_sorted_by_strength() {
        let df = frame();
        let pairs = FinalFrameAnalyzer::new(&df).strong_correlations(0.9).unwrap();

        let names: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.left.as_str(), p.right.as_str()))
            .collect();
        assert_eq!(names, vec![("x", "up"), ("x", "down"), ("up", "down")]);
        assert!((pairs[0].coefficient - 1.0).abs() < 1e-12);
        let expected = -5.5 / (5.0_f64 * 6.75).sqrt();
        assert!((pairs[1].coefficient - expected).abs() < 1e-12);
        assert_eq!(pairs[1].coefficient, pairs[2].coefficient);
    }

    #[test]
    fn test_uncorrelated_column_not_reported() {
        let df = frame();
        let pairs = FinalFrameAnalyzer::new(&df).strong_correlations(0.5).unwrap();
        assert!(pairs.iter().all(|p| p.left != "noise" && p.right != "noise"));
    }

    #[test]
    fn test_invalid_threshold() {
        let df = frame();
        assert!(FinalFrameAnalyzer::new(&df).strong_correlations(1.5).is_err());
    }

    #[test]
    fn test_empty_frame() {
        let df = DataFrame::empty();
        let report = FinalFrameAnalyzer::new(&df).summarize().unwrap();
        assert_eq!(report.rows, 0);
        assert_eq!(report.columns, 0);
        assert!(report.numeric_summary.is_empty());
        assert!(report.strong_correlations.is_empty());
    }

    #[test]
    fn test_pearson_edge_cases() {
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
        assert_eq!(pearson(&[Some(1.0), Some(1.0)], &[Some(1.0), Some(2.0)]), None);
        let r = pearson(&[Some(1.0), None, Some(3.0)], &[Some(2.0), Some(9.0), Some(6.0)]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }
}
