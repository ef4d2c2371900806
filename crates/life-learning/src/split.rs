//! Seeded train/validation/test split and K-fold partitioning.

use crate::error::LearningError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Row indices of the three partitions, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Shuffle `0..n_rows` with `seed` and cut it into train, validation
    /// and test partitions.
    ///
    /// The first `ceil(n_rows * holdout_fraction)` shuffled rows form the
    /// holdout; the first `ceil(holdout / 2)` of those are the test rows and
    /// the rest the validation rows. The same arguments always give the
    /// same partition.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] for a fraction outside
    /// `(0, 1)` and [`LearningError::InvalidData`] when any partition would
    /// be empty.
    pub fn new(n_rows: usize, holdout_fraction: f64, seed: u64) -> Result<Self, LearningError> {
        if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "holdout_fraction must be between 0.0 and 1.0 (exclusive), got {holdout_fraction}"
            )));
        }

        let holdout = (n_rows as f64 * holdout_fraction).ceil() as usize;
        let test = holdout.div_ceil(2);
        if holdout >= n_rows || holdout - test == 0 {
            return Err(LearningError::InvalidData(format!(
                "{n_rows} rows are too few to split into train, validation and test partitions"
            )));
        }

        let mut rows: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        rows.shuffle(&mut rng);

        let train = rows.split_off(holdout);
        let validation = rows.split_off(test);

        Ok(Self {
            train,
            validation,
            test: rows,
        })
    }
}

/// Contiguous K-fold partition of `0..n`: `(fit positions, held-out positions)`
/// per fold.
///
/// The first `n % k` folds hold one extra position. Positions index into
/// whatever the caller folds over (the shuffled training partition).
///
/// # Errors
///
/// Returns [`LearningError::InvalidConfig`] when `k < 2` and
/// [`LearningError::InvalidData`] when `n < k`.
pub fn k_fold(n: usize, k: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, LearningError> {
    if k < 2 {
        return Err(LearningError::InvalidConfig(
            "cv_folds must be at least 2".to_string(),
        ));
    }
    if n < k {
        return Err(LearningError::InvalidData(format!(
            "{n} training rows cannot be split into {k} folds"
        )));
    }

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        let fit = (0..start).chain(end..n).collect();
        let held_out = (start..end).collect();
        folds.push((fit, held_out));
        start = end;
    }
    Ok(folds)
}
