//! Imputation of missing numeric values.
//!
//! Only KNN imputation is provided. Categorical and identifier columns are
//! never imputed.

mod knn;

pub use knn::{ImputationOutcome, KnnImputer};
