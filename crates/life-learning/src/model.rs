//! The life-expectancy regression model.
//!
//! [`RegressionModel`] owns the whole modeling flow: split, preprocessing,
//! network construction, training (optionally with K-fold cross-validation)
//! and evaluation. It moves through four states:
//!
//! ```text
//! Constructed ──compile()──► Compiled ──train()──► Trained ──evaluate()──► Evaluated
//! ```
//!
//! Calling an operation in the wrong state fails with
//! [`LearningError::InvalidState`].
//!
//! # Example
//!
//! ```rust,ignore
//! use life_learning::{CompileOptions, ModelConfig, ModelEvaluator, RegressionModel};
//!
//! let mut model = RegressionModel::new(&cleaned, ModelConfig::default())?;
//! model.compile(CompileOptions::default())?;
//! model.train()?;
//! let result = model.evaluate()?;
//!
//! let evaluator = ModelEvaluator::from_result(&result)?;
//! println!("R² = {:.4}", evaluator.r2_score());
//! ```

use crate::config::{CompileOptions, ModelConfig};
use crate::error::LearningError;
use crate::metrics::{Metrics, r2_score};
use crate::network::{Adam, Network, loss_value};
use crate::preprocessing::FittedPreprocessor;
use crate::progress::{ProgressCallback, TrainingProgress, TrainingStage};
use crate::split::{SplitIndices, k_fold};
use crate::types::{CrossValidationReport, EpochRecord, EvaluationResult, FoldMetrics, TrainingHistory};
use life_processing::CancellationToken;
use life_processing::utils::{is_numeric_dtype, numeric_values};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Share of overall progress covered by training epochs.
const TRAINING_SHARE: f64 = 0.9;

/// Lifecycle state of a [`RegressionModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// Split and preprocessing fit; no network yet.
    Constructed,
    /// Network built with a loss and optimizer bound.
    Compiled,
    /// Network trained on the training partition.
    Trained,
    /// Test metrics computed.
    Evaluated,
}

impl ModelState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Constructed => "constructed",
            ModelState::Compiled => "compiled",
            ModelState::Trained => "trained",
            ModelState::Evaluated => "evaluated",
        }
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encoded features and raw targets of one partition.
#[derive(Debug, Clone)]
struct Partition {
    features: Array2<f64>,
    target: Array1<f64>,
}

impl Partition {
    fn select(&self, positions: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), positions),
            target: self.target.select(Axis(0), positions),
        }
    }

    fn len(&self) -> usize {
        self.target.len()
    }
}

/// Counts finished epochs across folds and the final run.
struct EpochCounter {
    completed: usize,
    total: usize,
}

impl EpochCounter {
    fn advance(&mut self) -> f64 {
        self.completed += 1;
        TRAINING_SHARE * self.completed.min(self.total) as f64 / self.total.max(1) as f64
    }
}

/// Dense regression network with its fitted preprocessing and data split.
pub struct RegressionModel {
    config: ModelConfig,
    state: ModelState,
    split: SplitIndices,
    preprocessor: FittedPreprocessor,
    train: Partition,
    validation: Partition,
    test: Partition,
    options: Option<CompileOptions>,
    network: Option<Network>,
    history: Option<TrainingHistory>,
    cross_validation: Option<CrossValidationReport>,
    metrics: Option<Metrics>,
    progress_callback: Option<ProgressCallback>,
    cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for RegressionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegressionModel")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("train_rows", &self.train.len())
            .field("validation_rows", &self.validation.len())
            .field("test_rows", &self.test.len())
            .field("has_progress_callback", &self.progress_callback.is_some())
            .field("has_cancellation_token", &self.cancellation_token.is_some())
            .finish()
    }
}

impl RegressionModel {
    /// Split `df`, fit the preprocessing on the training rows and encode all
    /// three partitions.
    ///
    /// Features are every column except the target, in frame order.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidConfig`] if `config` is invalid
    /// - [`LearningError::TargetNotFound`] if the target column is absent
    /// - [`LearningError::ColumnNotFound`] if a label column is absent
    /// - [`LearningError::InvalidData`] if the frame is empty or too small to
    ///   split, the target is non-numeric or has missing values, or a feature
    ///   is non-numeric (outside the label columns) or has missing values
    pub fn new(df: &DataFrame, config: ModelConfig) -> Result<Self, LearningError> {
        config.validate()?;

        let target_name = config.target_column.as_str();
        let target_column = df
            .column(target_name)
            .map_err(|_| LearningError::TargetNotFound(config.target_column.clone()))?;
        if let Some(missing) = config
            .label_columns
            .iter()
            .find(|name| df.column(name.as_str()).is_err())
        {
            return Err(LearningError::ColumnNotFound(missing.clone()));
        }

        if df.height() == 0 {
            return Err(LearningError::InvalidData("frame is empty".to_string()));
        }

        if !is_numeric_dtype(target_column.dtype()) {
            return Err(LearningError::InvalidData(format!(
                "target column '{target_name}' has non-numeric type {}",
                target_column.dtype()
            )));
        }
        let target_values = numeric_values(df, target_name)?;
        let missing_targets = target_values.iter().filter(|v| v.is_none()).count();
        if missing_targets > 0 {
            return Err(LearningError::InvalidData(format!(
                "{missing_targets} rows have a missing '{target_name}' value"
            )));
        }
        let target: Vec<f64> = target_values.into_iter().flatten().collect();

        let split = SplitIndices::new(df.height(), config.holdout_fraction, config.random_seed)?;
        let preprocessor =
            FittedPreprocessor::fit(df, target_name, &config.label_columns, &split.train)?;

        let partition = |rows: &[usize]| -> Result<Partition, LearningError> {
            Ok(Partition {
                features: preprocessor.transform(df, Some(rows))?,
                target: rows.iter().map(|&row| target[row]).collect(),
            })
        };
        let train = partition(&split.train)?;
        let validation = partition(&split.validation)?;
        let test = partition(&split.test)?;

        info!(
            "Prepared {} features; split {} rows into {} train, {} validation, {} test",
            preprocessor.n_features(),
            df.height(),
            train.len(),
            validation.len(),
            test.len()
        );

        Ok(Self {
            config,
            state: ModelState::Constructed,
            split,
            preprocessor,
            train,
            validation,
            test,
            options: None,
            network: None,
            history: None,
            cross_validation: None,
            metrics: None,
            progress_callback: None,
            cancellation_token: None,
        })
    }

    /// Set a progress callback for training and evaluation.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TrainingProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Set a cancellation token, checked between epochs and folds.
    #[must_use]
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Row indices of the train, validation and test partitions.
    pub fn split(&self) -> &SplitIndices {
        &self.split
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    pub fn history(&self) -> Option<&TrainingHistory> {
        self.history.as_ref()
    }

    pub fn cross_validation(&self) -> Option<&CrossValidationReport> {
        self.cross_validation.as_ref()
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Build the network and bind the loss and optimizer settings.
    ///
    /// May be called again before training to replace the options; the
    /// network is rebuilt from the configured seed.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidState`] once the model is trained
    /// - [`LearningError::InvalidConfig`] for an invalid learning rate
    pub fn compile(&mut self, options: CompileOptions) -> Result<(), LearningError> {
        self.require_state("compile", &[ModelState::Constructed, ModelState::Compiled])?;
        options.validate()?;

        let network = self.build_network(0);
        info!(
            "Compiled network {:?} with {} parameters (loss: {}, learning rate: {})",
            network.layer_sizes(),
            network.n_parameters(),
            options.loss,
            options.learning_rate
        );

        self.network = Some(network);
        self.options = Some(options);
        self.state = ModelState::Compiled;
        Ok(())
    }

    /// Train the compiled network.
    ///
    /// With `cv_folds = Some(k)` the training partition is first split into
    /// `k` folds and a freshly initialized network is trained and scored on
    /// each. The compiled network is then trained on the full training
    /// partition, monitored against the validation partition.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidState`] unless the model is compiled
    /// - [`LearningError::Cancelled`] if the cancellation token fires
    /// - [`LearningError::TrainingFailed`] if the loss becomes non-finite
    /// - [`LearningError::InvalidData`] if the training partition has fewer
    ///   rows than folds
    pub fn train(&mut self) -> Result<&TrainingHistory, LearningError> {
        self.require_state("train", &[ModelState::Compiled])?;

        match self.train_internal() {
            Ok((network, history, cross_validation)) => {
                self.network = Some(network);
                self.cross_validation = cross_validation;
                self.state = ModelState::Trained;
                Ok(self.history.insert(history))
            }
            Err(e) => {
                if e.is_cancelled() {
                    warn!("Training cancelled");
                    self.report(TrainingProgress::new(
                        TrainingStage::Cancelled,
                        0.0,
                        "Training cancelled by user",
                    ));
                } else {
                    self.report(TrainingProgress::new(TrainingStage::Failed, 0.0, e.to_string()));
                }
                Err(e)
            }
        }
    }

    /// Score the trained network on the test partition.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidState`] unless the model is trained.
    pub fn evaluate(&mut self) -> Result<EvaluationResult, LearningError> {
        self.require_state("evaluate", &[ModelState::Trained, ModelState::Evaluated])?;
        self.report(TrainingProgress::new(
            TrainingStage::Evaluation,
            TRAINING_SHARE,
            "Evaluating on the test partition",
        ));

        let y_pred = self.trained_network("evaluate")?.predict(&self.test.features).to_vec();
        let y_true = self.test.target.to_vec();
        let metrics = Metrics::compute(&y_true, &y_pred)?;

        info!(
            "Test metrics: MAE {:.4}, MAPE {}, RMSE {:.4}, R² {:.4}",
            metrics.mae,
            metrics
                .mape
                .map_or_else(|| "n/a".to_string(), |m| format!("{m:.2}%")),
            metrics.rmse,
            metrics.r2
        );

        self.metrics = Some(metrics.clone());
        self.state = ModelState::Evaluated;
        self.report(TrainingProgress::new(
            TrainingStage::Complete,
            1.0,
            format!("Test MAE {:.4}, R² {:.4}", metrics.mae, metrics.r2),
        ));

        Ok(EvaluationResult {
            metrics,
            y_true,
            y_pred,
            history: self.history.clone().unwrap_or_default(),
            cross_validation: self.cross_validation.clone(),
        })
    }

    /// Predict the target for every row of `df` with the fitted
    /// preprocessing and the trained network.
    ///
    /// `df` needs every feature column; the target column is ignored.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidState`] unless the model is trained
    /// - [`LearningError::ColumnNotFound`] if a feature column is absent
    /// - [`LearningError::InvalidData`] if a feature value is missing
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>, LearningError> {
        let network = self.trained_network("predict")?;
        let features = self.preprocessor.transform(df, None)?;
        Ok(network.predict(&features).to_vec())
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn train_internal(
        &self,
    ) -> Result<(Network, TrainingHistory, Option<CrossValidationReport>), LearningError> {
        let (Some(options), Some(network)) = (self.options, self.network.as_ref()) else {
            return Err(self.invalid_state("train"));
        };

        let runs = self.config.cv_folds.map_or(1, |k| k + 1);
        let mut counter = EpochCounter {
            completed: 0,
            total: self.config.epochs * runs,
        };

        let cross_validation = match self.config.cv_folds {
            Some(k) => Some(self.cross_validate(
                k,
                options,
                |fold| self.build_network(fold as u64),
                &mut counter,
            )?),
            None => None,
        };

        info!(
            "Training on {} rows for up to {} epochs",
            self.train.len(),
            self.config.epochs
        );
        let mut network = network.clone();
        let history = self.fit_network(
            &mut network,
            &self.train,
            &self.validation,
            options,
            None,
            &mut counter,
        )?;

        if let Some(last) = history.last() {
            info!(
                "Training finished after {} epochs: loss {:.4}, val_loss {:.4}",
                history.len(),
                last.loss,
                last.val_loss
            );
        }
        Ok((network, history, cross_validation))
    }

    /// K-fold cross-validation over the training partition. `factory` builds
    /// an independently initialized network for each 1-based fold.
    fn cross_validate<F>(
        &self,
        k: usize,
        options: CompileOptions,
        mut factory: F,
        counter: &mut EpochCounter,
    ) -> Result<CrossValidationReport, LearningError>
    where
        F: FnMut(usize) -> Network,
    {
        let folds = k_fold(self.train.len(), k)?;
        info!("Cross-validating with {} folds", k);

        let mut results = Vec::with_capacity(k);
        for (index, (fit_positions, held_positions)) in folds.iter().enumerate() {
            let fold = index + 1;
            self.check_cancelled()?;

            let fit = self.train.select(fit_positions);
            let held_out = self.train.select(held_positions);
            let mut network = factory(fold);
            self.fit_network(&mut network, &fit, &held_out, options, Some((fold, k)), counter)?;

            let predictions = network.predict(&held_out.features);
            let metrics = FoldMetrics {
                fold,
                train_rows: fit.len(),
                held_out_rows: held_out.len(),
                mae: mean_absolute_error(&predictions, &held_out.target),
                r2: r2_score(&held_out.target.to_vec(), &predictions.to_vec()),
            };
            info!(
                "Fold {}/{}: MAE {:.4}, R² {:.4}",
                fold, k, metrics.mae, metrics.r2
            );
            results.push(metrics);
        }

        let report = CrossValidationReport::from_folds(results);
        info!(
            "Cross-validation mean MAE {:.4}, mean R² {:.4}",
            report.mean_mae, report.mean_r2
        );
        Ok(report)
    }

    /// Train `network` for the configured epochs, monitoring `monitor`.
    ///
    /// With early stopping the weights of the best monitored epoch are
    /// restored before returning.
    fn fit_network(
        &self,
        network: &mut Network,
        train: &Partition,
        monitor: &Partition,
        options: CompileOptions,
        fold: Option<(usize, usize)>,
        counter: &mut EpochCounter,
    ) -> Result<TrainingHistory, LearningError> {
        let epochs = self.config.epochs;
        let seed_offset = fold.map_or(0, |(current, _)| current as u64);
        let mut rng = StdRng::seed_from_u64(self.config.random_seed.wrapping_add(seed_offset));
        let mut optimizer = Adam::new(options.learning_rate, network);

        let mut history = TrainingHistory::default();
        let mut best: Option<(f64, usize, Network)> = None;
        let mut epochs_without_improvement = 0;

        for epoch in 1..=epochs {
            self.check_cancelled()?;

            let loss = network.fit_epoch(
                &train.features,
                &train.target,
                self.config.batch_size,
                options.loss,
                &mut optimizer,
                &mut rng,
            );
            let train_predictions = network.predict(&train.features);
            let monitor_predictions = network.predict(&monitor.features);
            let record = EpochRecord {
                epoch,
                loss,
                val_loss: loss_value(options.loss, &monitor_predictions, &monitor.target),
                mae: mean_absolute_error(&train_predictions, &train.target),
                val_mae: mean_absolute_error(&monitor_predictions, &monitor.target),
            };

            if !(record.loss.is_finite() && record.val_loss.is_finite()) {
                return Err(LearningError::TrainingFailed(format!(
                    "loss became non-finite at epoch {epoch}; try a lower learning rate"
                )));
            }

            debug!(
                "Epoch {}/{}: loss {:.4}, val_loss {:.4}, mae {:.4}, val_mae {:.4}",
                epoch, epochs, record.loss, record.val_loss, record.mae, record.val_mae
            );

            let progress = counter.advance();
            let update = match fold {
                Some((current, total)) => TrainingProgress::new(
                    TrainingStage::CrossValidation,
                    progress,
                    format!(
                        "Fold {current}/{total}, epoch {epoch}/{epochs}: val_loss {:.4}",
                        record.val_loss
                    ),
                )
                .with_fold(current, total),
                None => TrainingProgress::new(
                    TrainingStage::Training,
                    progress,
                    format!("Epoch {epoch}/{epochs}: val_loss {:.4}", record.val_loss),
                ),
            };
            self.report(update.with_epoch(epoch, epochs));

            let val_loss = record.val_loss;
            history.epochs.push(record);

            if let Some(patience) = self.config.early_stopping_patience {
                let improved = best
                    .as_ref()
                    .is_none_or(|(best_loss, _, _)| val_loss < *best_loss);
                if improved {
                    best = Some((val_loss, epoch, network.clone()));
                    epochs_without_improvement = 0;
                } else {
                    epochs_without_improvement += 1;
                }
                if epochs_without_improvement >= patience {
                    history.stopped_early = epoch < epochs;
                    if history.stopped_early {
                        info!("Early stopping at epoch {}", epoch);
                    }
                    break;
                }
            }
        }

        if let Some((_, best_epoch, best_network)) = best {
            debug!("Restoring weights from epoch {}", best_epoch);
            *network = best_network;
            history.best_epoch = Some(best_epoch);
        }
        Ok(history)
    }

    fn build_network(&self, seed_offset: u64) -> Network {
        Network::new(
            self.preprocessor.n_features(),
            &self.config.hidden_layers,
            self.config.random_seed.wrapping_add(seed_offset),
        )
    }

    fn trained_network(&self, operation: &'static str) -> Result<&Network, LearningError> {
        self.require_state(operation, &[ModelState::Trained, ModelState::Evaluated])?;
        self.network
            .as_ref()
            .ok_or_else(|| self.invalid_state(operation))
    }

    fn require_state(
        &self,
        operation: &'static str,
        allowed: &[ModelState],
    ) -> Result<(), LearningError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> LearningError {
        LearningError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }

    fn check_cancelled(&self) -> Result<(), LearningError> {
        if self
            .cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(LearningError::Cancelled);
        }
        Ok(())
    }

    fn report(&self, update: TrainingProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(update);
        }
    }
}

fn mean_absolute_error(predictions: &Array1<f64>, targets: &Array1<f64>) -> f64 {
    (predictions - targets).mapv(f64::abs).mean().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LossKind;
    use std::sync::Mutex;

    fn synthetic(n: usize) -> DataFrame {
        let countries = ["Albania", "Chad", "Norway", "Peru"];
        let country: Vec<&str> = (0..n).map(|i| countries[i % 4]).collect();
        let status: Vec<&str> = (0..n)
            .map(|i| if i % 4 == 2 { "Developed" } else { "Developing" })
            .collect();
        let gdp: Vec<f64> = (0..n).map(|i| ((i * 37) % 100) as f64 * 10.0).collect();
        let schooling: Vec<f64> = (0..n).map(|i| 5.0 + ((i * 13) % 11) as f64).collect();
        let life: Vec<f64> = gdp
            .iter()
            .zip(&schooling)
            .map(|(g, s)| 50.0 + 0.02 * g + 1.5 * s)
            .collect();
        df![
            "Country" => country,
            "Status" => status,
            "GDP" => gdp,
            "Schooling" => schooling,
            "Life expectancy " => life,
        ]
        .unwrap()
    }

    fn small_config() -> ModelConfig {
        ModelConfig::builder()
            .hidden_layers(vec![16, 8])
            .epochs(20)
            .batch_size(16)
            .learning_rate(0.01)
            .build()
            .unwrap()
    }

    #[test]
    fn test_state_machine() {
        let df = synthetic(50);
        let mut model = RegressionModel::new(&df, small_config()).unwrap();
        assert_eq!(model.state(), ModelState::Constructed);

        assert!(matches!(
            model.train(),
            Err(LearningError::InvalidState { operation: "train", state: "constructed" })
        ));
        assert!(matches!(model.evaluate(), Err(LearningError::InvalidState { .. })));
        assert!(matches!(model.predict(&df), Err(LearningError::InvalidState { .. })));

        model.compile(CompileOptions::default()).unwrap();
        assert_eq!(model.state(), ModelState::Compiled);
        // Recompiling before training is allowed.
        model.compile(CompileOptions::default()).unwrap();

        model.train().unwrap();
        assert_eq!(model.state(), ModelState::Trained);
        assert!(matches!(
            model.compile(CompileOptions::default()),
            Err(LearningError::InvalidState { .. })
        ));
        assert!(matches!(model.train(), Err(LearningError::InvalidState { .. })));

        model.evaluate().unwrap();
        assert_eq!(model.state(), ModelState::Evaluated);
        assert!(model.metrics().is_some());
    }

    #[test]
    fn test_features_exclude_target() {
        let df = synthetic(20);
        let model = RegressionModel::new(&df, small_config()).unwrap();
        assert_eq!(
            model.feature_names(),
            vec!["Country", "Status", "GDP", "Schooling"]
        );
    }

    #[test]
    fn test_training_history_and_loss_decrease() {
        let df = synthetic(80);
        let mut model = RegressionModel::new(&df, small_config()).unwrap();
        model.compile(CompileOptions::default()).unwrap();
        let history = model.train().unwrap().clone();

        assert_eq!(history.len(), 20);
        assert_eq!(history.epochs[0].epoch, 1);
        assert!(history.epochs.iter().all(|e| e.loss.is_finite() && e.val_mae.is_finite()));
        assert!(history.epochs[19].loss < history.epochs[0].loss);
        assert!(!history.stopped_early);
        assert_eq!(history.best_epoch, None);
    }

    #[test]
    fn test_training_is_reproducible() {
        let df = synthetic(60);
        let run = || {
            let mut model = RegressionModel::new(&df, small_config()).unwrap();
            model.compile(CompileOptions::default()).unwrap();
            model.train().unwrap();
            model.evaluate().unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_evaluate_result_shapes() {
        let df = synthetic(50);
        let mut model = RegressionModel::new(&df, small_config()).unwrap();
        model.compile(CompileOptions::default()).unwrap();
        model.train().unwrap();
        let result = model.evaluate().unwrap();

        assert_eq!(result.y_true.len(), model.split().test.len());
        assert_eq!(result.y_pred.len(), result.y_true.len());
        assert_eq!(result.metrics.n_samples, result.y_true.len());
        assert_eq!(result.history.len(), 20);
        assert!(result.cross_validation.is_none());
    }

    #[test]
    fn test_cross_validation_runs_every_fold() {
        let df = synthetic(60);
        let config = ModelConfig::builder()
            .hidden_layers(vec![8])
            .epochs(5)
            .cv_folds(3)
            .build()
            .unwrap();

        let folds_seen = Arc::new(Mutex::new(Vec::new()));
        let folds_clone = folds_seen.clone();
        let mut model = RegressionModel::new(&df, config)
            .unwrap()
            .on_progress(move |update| {
                if let Some((fold, _)) = update.fold {
                    folds_clone.lock().unwrap().push(fold);
                }
            });
        model.compile(CompileOptions::default()).unwrap();
        model.train().unwrap();

        let report = model.cross_validation().unwrap();
        assert_eq!(report.folds.len(), 3);
        assert_eq!(
            report.folds.iter().map(|f| f.held_out_rows).sum::<usize>(),
            model.split().train.len()
        );
        let mean_mae = report.folds.iter().map(|f| f.mae).sum::<f64>() / 3.0;
        assert!((report.mean_mae - mean_mae).abs() < 1e-12);

        let seen = folds_seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 15);
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen.last(), Some(&3));
    }

    #[test]
    fn test_early_stopping_keeps_best_epoch() {
        let df = synthetic(60);
        let config = ModelConfig::builder()
            .hidden_layers(vec![8])
            .epochs(40)
            .learning_rate(0.05)
            .early_stopping_patience(2)
            .loss(LossKind::MeanSquaredError)
            .build()
            .unwrap();
        let mut model = RegressionModel::new(&df, config).unwrap();
        model.compile(CompileOptions::from(model.config())).unwrap();
        let history = model.train().unwrap().clone();

        assert!(history.len() <= 40);
        assert_eq!(history.best_epoch, history.best_val_loss().map(|(epoch, _)| epoch));
        if history.stopped_early {
            let best = history.best_epoch.unwrap();
            assert_eq!(history.len(), best + 2);
        }
    }

    #[test]
    fn test_cancellation_before_training() {
        let df = synthetic(40);
        let token = CancellationToken::new();
        token.cancel();

        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();
        let mut model = RegressionModel::new(&df, small_config())
            .unwrap()
            .cancellation_token(token)
            .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage));
        model.compile(CompileOptions::default()).unwrap();

        let err = model.train().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(model.state(), ModelState::Compiled);
        assert_eq!(*stages.lock().unwrap(), vec![TrainingStage::Cancelled]);
    }

    #[test]
    fn test_predict_new_rows() {
        let df = synthetic(40);
        let mut model = RegressionModel::new(&df, small_config()).unwrap();
        model.compile(CompileOptions::default()).unwrap();
        model.train().unwrap();

        let new_rows = df.drop("Life expectancy ").unwrap().head(Some(5));
        let predictions = model.predict(&new_rows).unwrap();
        assert_eq!(predictions.len(), 5);
        assert!(predictions.iter().all(|p| p.is_finite()));

        let missing_feature = new_rows.drop("GDP").unwrap();
        assert!(matches!(
            model.predict(&missing_feature),
            Err(LearningError::ColumnNotFound(ref c)) if c == "GDP"
        ));
    }

    #[test]
    fn test_constructor_errors() {
        let df = synthetic(20);

        let err = RegressionModel::new(&df.drop("Life expectancy ").unwrap(), small_config()).unwrap_err();
        assert!(matches!(err, LearningError::TargetNotFound(_)));

        let err = RegressionModel::new(&df.drop("Status").unwrap(), small_config()).unwrap_err();
        assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "Status"));

        let err = RegressionModel::new(&df.head(Some(0)), small_config()).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));

        let err = RegressionModel::new(&df.head(Some(2)), small_config()).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));

        let unlabeled = ModelConfig::builder().label_columns(["Country"]).build().unwrap();
        let err = RegressionModel::new(&df, unlabeled).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(ref m) if m.contains("Status")));
    }

    #[test]
    fn test_missing_target_rejected() {
        let df = df![
            "GDP" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "Life expectancy " => [Some(60.0), None, Some(62.0), Some(63.0), Some(64.0)],
        ]
        .unwrap();
        let config = ModelConfig::builder().label_columns(Vec::<String>::new()).build().unwrap();
        let err = RegressionModel::new(&df, config).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(ref m) if m.contains("1 rows")));
    }
}
