//! Removal of redundant or collinear columns.

use crate::config::PruneConfig;
use crate::types::PruneReport;
use polars::prelude::*;
use tracing::{info, warn};

/// Frame after pruning plus the columns that were and were not removed.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub frame: DataFrame,
    pub removed: Vec<String>,
    pub skipped: Vec<String>,
}

impl PruneOutcome {
    /// Whether any column was dropped.
    pub fn pruned(&self) -> bool {
        !self.removed.is_empty()
    }

    pub fn report(&self) -> PruneReport {
        PruneReport {
            removed: self.removed.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Drops a configured list of columns when present.
pub struct RedundantColumnPruner {
    df: DataFrame,
    config: PruneConfig,
}

impl RedundantColumnPruner {
    pub fn new(df: &DataFrame, config: PruneConfig) -> Self {
        Self {
            df: df.clone(),
            config,
        }
    }

    /// Remove configured columns. Absent columns are skipped, never an error.
    pub fn prune(&self) -> PruneOutcome {
        let (present, skipped): (Vec<String>, Vec<String>) = self
            .config
            .columns
            .iter()
            .cloned()
            .partition(|name| self.df.get_column_index(name).is_some());

        if present.is_empty() {
            warn!("None of the {} redundant columns are present, nothing pruned", skipped.len());
            return PruneOutcome {
                frame: self.df.clone(),
                removed: Vec::new(),
                skipped,
            };
        }

        let names: Vec<PlSmallStr> = present.iter().map(|s| s.as_str().into()).collect();
        let frame = self.df.drop_many(names);
        info!("Pruned {} redundant columns: {}", present.len(), present.join(", "));

        PruneOutcome {
            frame,
            removed: present,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> DataFrame {
        df![
            "Country" => ["A", "B"],
            "Diphtheria " => [90.0, 80.0],
            "GDP" => [1.0, 2.0],
            "percentage expenditure" => [3.0, 4.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_prune_removes_present_and_skips_absent() {
        let outcome = RedundantColumnPruner::new(&frame(), PruneConfig::default()).prune();

        assert!(outcome.pruned());
        assert_eq!(
            outcome.removed,
            vec!["percentage expenditure".to_string(), "Diphtheria ".to_string()]
        );
        assert_eq!(outcome.skipped.len(), 3);
        assert_eq!(
            outcome
                .frame
                .get_column_names()
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>(),
            vec!["Country", "GDP"]
        );
        assert_eq!(outcome.frame.height(), 2);
    }

    #[test]
    fn test_prune_nothing_present_returns_frame_unchanged() {
        let df = df!["Country" => ["A"], "GDP" => [1.0]].unwrap();
        let outcome = RedundantColumnPruner::new(&df, PruneConfig::default()).prune();

        assert!(!outcome.pruned());
        assert!(outcome.removed.is_empty());
        assert!(outcome.frame.equals_missing(&df));
    }

    #[test]
    fn test_prune_is_idempotent() {
        let once = RedundantColumnPruner::new(&frame(), PruneConfig::default()).prune();
        let twice = RedundantColumnPruner::new(&once.frame, PruneConfig::default()).prune();

        assert!(!twice.pruned());
        assert!(twice.frame.equals_missing(&once.frame));
    }

    #[test]
    fn test_prune_custom_columns() {
        let config = PruneConfig {
            columns: vec!["GDP".to_string(), "Unknown".to_string()],
        };
        let outcome = RedundantColumnPruner::new(&frame(), config).prune();

        assert_eq!(outcome.removed, vec!["GDP".to_string()]);
        assert_eq!(outcome.skipped, vec!["Unknown".to_string()]);
        assert_eq!(outcome.report().removed, outcome.removed);
    }
}
