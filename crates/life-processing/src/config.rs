//! Configuration types for the cleaning pipeline.
//!
//! Column lists, thresholds and neighbor counts are configuration with
//! life-expectancy defaults, built through [`CleaningConfig::builder()`].
//! Each stage gets its own small config derived from the pipeline config.

use crate::schema::{COUNTRY, DatasetSchema, YEAR};
use serde::{Deserialize, Serialize};

/// Columns dropped by the pruning stage by default.
///
/// Header spelling (including stray spaces) matches the WHO source CSV.
pub const DEFAULT_REDUNDANT_COLUMNS: [&str; 5] = [
    " thinness 5-9 years",
    "percentage expenditure",
    "under-five deaths ",
    "Diphtheria ",
    "Income composition of resources",
];

/// How the k nearest donors are combined into an imputed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnnWeighting {
    /// Arithmetic mean of the donors.
    #[default]
    Uniform,
    /// Inverse-distance weighted mean of the donors.
    Distance,
}

/// Settings for [`crate::OutlierTreater`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Schema providing the grouping column and cleanable columns.
    pub schema: DatasetSchema,
    /// Absolute Z-score above which a value is an outlier.
    pub z_threshold: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            schema: DatasetSchema::default(),
            z_threshold: 3.0,
        }
    }
}

/// Settings for [`crate::KnnImputer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Schema providing the cleanable columns.
    pub schema: DatasetSchema,
    /// Number of donors per imputed cell. Zero is rejected at call time.
    pub n_neighbors: usize,
    pub weighting: KnnWeighting,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            schema: DatasetSchema::default(),
            n_neighbors: 20,
            weighting: KnnWeighting::default(),
        }
    }
}

/// Settings for [`crate::RedundantColumnPruner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneConfig {
    pub columns: Vec<String>,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_REDUNDANT_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a configuration with a fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use life_processing::CleaningConfig;
///
/// let config = CleaningConfig::builder()
///     .z_threshold(2.5)
///     .knn_neighbors(10)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Typed schema of the input frame.
    /// Default: [`DatasetSchema::life_expectancy()`]
    pub schema: DatasetSchema,

    /// Absolute per-group Z-score above which a value is treated as an outlier.
    /// Default: 3.0
    pub z_threshold: f64,

    /// Number of neighbors for KNN imputation.
    /// Default: 20
    pub knn_neighbors: usize,

    /// Aggregation of KNN donors.
    /// Default: Uniform
    pub knn_weighting: KnnWeighting,

    /// Columns removed by the pruning stage.
    /// Default: [`DEFAULT_REDUNDANT_COLUMNS`]
    pub redundant_columns: Vec<String>,

    /// Columns that should jointly identify a row.
    /// Default: `["Country", "Year"]`
    pub duplicate_subset: Vec<String>,

    /// Minimum absolute Pearson correlation reported by the final-frame check.
    /// Default: 0.5
    pub correlation_threshold: f64,

    /// Whether the pipeline runs the pruning stage.
    /// Default: true
    pub prune_columns: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            schema: DatasetSchema::default(),
            z_threshold: 3.0,
            knn_neighbors: 20,
            knn_weighting: KnnWeighting::default(),
            redundant_columns: PruneConfig::default().columns,
            duplicate_subset: vec![COUNTRY.to_string(), YEAR.to_string()],
            correlation_threshold: 0.5,
            prune_columns: true,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(ConfigValidationError::InvalidZThreshold(self.z_threshold));
        }

        if self.knn_neighbors == 0 {
            return Err(ConfigValidationError::InvalidKnnNeighbors(self.knn_neighbors));
        }

        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "correlation_threshold".to_string(),
                value: self.correlation_threshold,
            });
        }

        if self.duplicate_subset.is_empty() {
            return Err(ConfigValidationError::EmptyDuplicateSubset);
        }

        Ok(())
    }

    /// Outlier stage settings.
    pub fn outlier_config(&self) -> OutlierConfig {
        OutlierConfig {
            schema: self.schema.clone(),
            z_threshold: self.z_threshold,
        }
    }

    /// Imputation stage settings.
    pub fn knn_config(&self) -> KnnConfig {
        KnnConfig {
            schema: self.schema.clone(),
            n_neighbors: self.knn_neighbors,
            weighting: self.knn_weighting,
        }
    }

    /// Pruning stage settings.
    pub fn prune_config(&self) -> PruneConfig {
        PruneConfig {
            columns: self.redundant_columns.clone(),
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid Z-score threshold: {0} (must be a positive finite number)")]
    InvalidZThreshold(f64),

    #[error("Invalid KNN neighbors: {0} (must be at least 1)")]
    InvalidKnnNeighbors(usize),

    #[error("Duplicate subset must name at least one column")]
    EmptyDuplicateSubset,
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    schema: Option<DatasetSchema>,
    z_threshold: Option<f64>,
    knn_neighbors: Option<usize>,
    knn_weighting: Option<KnnWeighting>,
    redundant_columns: Option<Vec<String>>,
    duplicate_subset: Option<Vec<String>>,
    correlation_threshold: Option<f64>,
    prune_columns: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Set the dataset schema.
    pub fn schema(mut self, schema: DatasetSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the Z-score threshold for outlier detection.
    pub fn z_threshold(mut self, threshold: f64) -> Self {
        self.z_threshold = Some(threshold);
        self
    }

    /// Set the number of neighbors for KNN imputation.
    pub fn knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = Some(k);
        self
    }

    /// Set how KNN donors are aggregated.
    pub fn knn_weighting(mut self, weighting: KnnWeighting) -> Self {
        self.knn_weighting = Some(weighting);
        self
    }

    /// Set the columns removed by the pruning stage.
    pub fn redundant_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redundant_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the columns used for duplicate detection.
    pub fn duplicate_subset<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.duplicate_subset = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the correlation threshold used by the final-frame check.
    pub fn correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = Some(threshold);
        self
    }

    /// Enable or disable the pruning stage.
    pub fn prune_columns(mut self, prune: bool) -> Self {
        self.prune_columns = Some(prune);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            schema: self.schema.unwrap_or(defaults.schema),
            z_threshold: self.z_threshold.unwrap_or(defaults.z_threshold),
            knn_neighbors: self.knn_neighbors.unwrap_or(defaults.knn_neighbors),
            knn_weighting: self.knn_weighting.unwrap_or(defaults.knn_weighting),
            redundant_columns: self.redundant_columns.unwrap_or(defaults.redundant_columns),
            duplicate_subset: self.duplicate_subset.unwrap_or(defaults.duplicate_subset),
            correlation_threshold: self
                .correlation_threshold
                .unwrap_or(defaults.correlation_threshold),
            prune_columns: self.prune_columns.unwrap_or(defaults.prune_columns),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnRole;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.z_threshold, 3.0);
        assert_eq!(config.knn_neighbors, 20);
        assert_eq!(config.knn_weighting, KnnWeighting::Uniform);
        assert_eq!(config.correlation_threshold, 0.5);
        assert_eq!(config.duplicate_subset, vec!["Country", "Year"]);
        assert_eq!(config.redundant_columns.len(), 5);
        assert!(config.prune_columns);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .z_threshold(2.5)
            .knn_neighbors(5)
            .knn_weighting(KnnWeighting::Distance)
            .redundant_columns(["GDP"])
            .prune_columns(false)
            .build()
            .unwrap();

        assert_eq!(config.z_threshold, 2.5);
        assert_eq!(config.knn_neighbors, 5);
        assert_eq!(config.knn_weighting, KnnWeighting::Distance);
        assert_eq!(config.redundant_columns, vec!["GDP".to_string()]);
        assert!(!config.prune_columns);
    }

    #[test]
    fn test_validation_invalid_knn_neighbors() {
        let result = CleaningConfig::builder().knn_neighbors(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidKnnNeighbors(0)
        ));
    }

    #[test]
    fn test_validation_invalid_z_threshold() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = CleaningConfig::builder().z_threshold(bad).build();
            assert!(matches!(
                result.unwrap_err(),
                ConfigValidationError::InvalidZThreshold(_)
            ));
        }
    }

    #[test]
    fn test_validation_invalid_correlation_threshold() {
        let result = CleaningConfig::builder().correlation_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_empty_duplicate_subset() {
        let result = CleaningConfig::builder()
            .duplicate_subset(Vec::<String>::new())
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyDuplicateSubset
        ));
    }

    #[test]
    fn test_stage_configs_share_schema() {
        let schema = DatasetSchema::life_expectancy().with_column("GDP", ColumnRole::Numeric);
        let config = CleaningConfig::builder()
            .schema(schema.clone())
            .knn_neighbors(3)
            .build()
            .unwrap();

        assert_eq!(config.outlier_config().schema, schema);
        assert_eq!(config.knn_config().schema, schema);
        assert_eq!(config.knn_config().n_neighbors, 3);
        assert_eq!(config.prune_config().columns, config.redundant_columns);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "schema": {
                "group_column": "Country",
                "columns": [
                    {"name": "Country", "role": "categorical"},
                    {"name": "Year", "role": "identifier"}
                ]
            },
            "z_threshold": 2.0,
            "knn_neighbors": 7,
            "knn_weighting": "distance",
            "redundant_columns": ["GDP"],
            "duplicate_subset": ["Country", "Year"],
            "correlation_threshold": 0.8,
            "prune_columns": false
        }"#;

        let config: CleaningConfig = serde_json::from_str(json).expect("valid JSON config");
        assert!(config.validate().is_ok());
        assert_eq!(config.knn_neighbors, 7);
        assert_eq!(config.knn_weighting, KnnWeighting::Distance);
        assert_eq!(config.schema.declared_role("Year"), Some(ColumnRole::Identifier));
    }
}
