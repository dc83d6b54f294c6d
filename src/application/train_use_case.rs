// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Fetch the feature group        (Layer 6 - infra)
//   Step 2: Split train/test (70/30)        (Layer 4 - data)
//   Step 3: Fill NaN with 0, fit the GBT    (Layer 5 - ml)
//   Step 4: Score the held-out set          (Layer 6 - infra)
//   Step 5: Save artifact + config          (Layer 6 - infra)
//   Step 6: Register a new model version    (Layer 6 - infra)
//
// Each step reports its own Stage on failure, so "the registry
// rejected the model" is distinguishable from "the data could
// not be fetched".

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::application::stage::{PipelineError, Stage, StageContext};
use crate::data::splitter::{split_train_test, SPLIT_SEED, TEST_FRACTION};
use crate::domain::outcome::{EvaluationMetrics, RegisteredModel};
use crate::domain::traits::{FeatureStore, ModelRegistry};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{evaluate, MetricsLogger},
};
use crate::ml::{model::GbtConfig, trainer::GbtTrainer};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub gbt:           GbtConfig,
    pub test_fraction: f64,
    pub seed:          u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            gbt:           GbtConfig::default(),
            test_fraction: TEST_FRACTION,
            seed:          SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub metrics:    EvaluationMetrics,
    pub model_path: PathBuf,
    pub registered: RegisteredModel,
}

pub struct TrainUseCase<S: FeatureStore, R: ModelRegistry> {
    store:       S,
    registry:    R,
    checkpoints: CheckpointManager,
    config:      TrainConfig,
}

impl<S: FeatureStore, R: ModelRegistry> TrainUseCase<S, R> {
    pub fn new(store: S, registry: R, checkpoints: CheckpointManager, config: TrainConfig) -> Self {
        Self { store, registry, checkpoints, config }
    }

    pub fn execute(&self) -> Result<TrainReport, PipelineError> {
        let cfg = &self.config;

        // ── Step 1: fetch ────────────────────────────────────────────────────
        let mut dataset = self.store.fetch().stage(Stage::Fetch)?;
        tracing::info!(
            "Fetched {} rows x {} features from the feature store",
            dataset.len(),
            dataset.n_features()
        );

        // ── Step 2: split ────────────────────────────────────────────────────
        let filled = dataset.fill_missing(0.0);
        if filled > 0 {
            tracing::info!("Filled {} missing readings with 0", filled);
        }
        let indices: Vec<usize> = (0..dataset.len()).collect();
        let (train_idx, test_idx) = split_train_test(indices, cfg.test_fraction, cfg.seed);
        if train_idx.is_empty() || test_idx.is_empty() {
            return Err(PipelineError::new(
                Stage::Split,
                format!(
                    "{} rows cannot be split into non-empty train and test sets",
                    dataset.len()
                ),
            ));
        }
        let train = dataset.subset(&train_idx);
        let test  = dataset.subset(&test_idx);
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 3: fit ──────────────────────────────────────────────────────
        let model = GbtTrainer::new(cfg.gbt.clone())
            .fit(train.feature_names.clone(), &train.features, &train.targets())
            .stage(Stage::Train)?;

        // ── Step 4: evaluate ─────────────────────────────────────────────────
        let predicted = model.predict(&test.features);
        let metrics   = evaluate(&test.labels, &predicted, train.len());
        tracing::info!(
            "Accuracy of the model: {}% (F1 {:.4})",
            metrics.accuracy_percent(),
            metrics.f1
        );
        MetricsLogger::new(self.checkpoints.dir())
            .and_then(|logger| logger.log(&metrics))
            .stage(Stage::Evaluate)?;

        // ── Step 5: persist ──────────────────────────────────────────────────
        let model_path = self.checkpoints.save_model(&model).stage(Stage::Persist)?;
        self.checkpoints.save_config(&cfg.gbt).stage(Stage::Persist)?;
        tracing::info!("Model saved to '{}'", model_path.display());

        // ── Step 6: register ─────────────────────────────────────────────────
        let registered = self
            .registry
            .register(&model_path, &metrics)
            .stage(Stage::Register)?;
        tracing::info!("Registered model '{}' version {}", registered.name, registered.version);

        Ok(TrainReport { metrics, model_path, registered })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{Label, LabeledDataset};
    use crate::domain::traits::Persistable;
    use crate::infra::model_registry::LocalModelRegistry;
    use crate::ml::model::GbtClassifier;
    use anyhow::Result;
    use std::path::Path;

    struct FixedStore(LabeledDataset);

    impl FeatureStore for FixedStore {
        fn push(&self, _dataset: &LabeledDataset) -> Result<()> {
            Ok(())
        }

        fn fetch(&self) -> Result<LabeledDataset> {
            Ok(self.0.clone())
        }
    }

    struct FailingStore;

    impl FeatureStore for FailingStore {
        fn push(&self, _dataset: &LabeledDataset) -> Result<()> {
            anyhow::bail!("offline")
        }

        fn fetch(&self) -> Result<LabeledDataset> {
            anyhow::bail!("offline")
        }
    }

    struct RejectingRegistry;

    impl ModelRegistry for RejectingRegistry {
        fn register(&self, _model_path: &Path, _metrics: &EvaluationMetrics) -> Result<RegisteredModel> {
            anyhow::bail!("registry refused the upload")
        }
    }

    /// Sensor 1 separates the classes; sensor 2 is noise with gaps.
    fn separable(n: usize) -> LabeledDataset {
        let mut ds = LabeledDataset::new(vec!["sensor_1".into(), "sensor_2".into()]);
        for i in 0..n {
            let good = i % 2 == 0;
            let s1 = if good { 10.0 + i as f64 } else { -10.0 - i as f64 };
            let s2 = if i % 5 == 0 { f64::NAN } else { (i % 3) as f64 };
            ds.push_row(format!("Wafer-{i}"), vec![s1, s2], if good { Label::Good } else { Label::Bad });
        }
        ds
    }

    fn small_config() -> TrainConfig {
        TrainConfig {
            gbt: GbtConfig { n_estimators: 10, ..GbtConfig::default() },
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_full_pipeline_saves_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("model")).unwrap();
        let registry = LocalModelRegistry::open(&dir.path().join("registry")).unwrap();
        let uc = TrainUseCase::new(FixedStore(separable(40)), registry, ckpt, small_config());

        let report = uc.execute().unwrap();

        assert_eq!(report.metrics.train_rows, 28);
        assert_eq!(report.metrics.test_rows, 12);
        assert_eq!(report.metrics.accuracy, 1.0);
        assert_eq!(report.metrics.accuracy_percent(), "100.00");
        assert_eq!(report.registered.version, 1);
        assert!(report.model_path.exists());
        assert!(dir.path().join("model").join("metrics.csv").exists());

        let model = GbtClassifier::load(&report.model_path).unwrap();
        assert_eq!(model.feature_names, vec!["sensor_1", "sensor_2"]);
    }

    #[test]
    fn test_retraining_bumps_registry_version() {
        let dir = tempfile::tempdir().unwrap();
        let make = || {
            TrainUseCase::new(
                FixedStore(separable(20)),
                LocalModelRegistry::open(&dir.path().join("registry")).unwrap(),
                CheckpointManager::new(dir.path().join("model")).unwrap(),
                small_config(),
            )
        };
        assert_eq!(make().execute().unwrap().registered.version, 1);
        assert_eq!(make().execute().unwrap().registered.version, 2);
    }

    #[test]
    fn test_fetch_failure_reports_fetch_stage() {
        let dir = tempfile::tempdir().unwrap();
        let uc = TrainUseCase::new(
            FailingStore,
            LocalModelRegistry::open(dir.path()).unwrap(),
            CheckpointManager::new(dir.path().join("model")).unwrap(),
            small_config(),
        );
        assert_eq!(uc.execute().unwrap_err().stage, Stage::Fetch);
    }

    #[test]
    fn test_single_row_cannot_be_split() {
        let dir = tempfile::tempdir().unwrap();
        let uc = TrainUseCase::new(
            FixedStore(separable(1)),
            LocalModelRegistry::open(dir.path()).unwrap(),
            CheckpointManager::new(dir.path().join("model")).unwrap(),
            small_config(),
        );
        assert_eq!(uc.execute().unwrap_err().stage, Stage::Split);
    }

    #[test]
    fn test_registry_failure_keeps_local_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("model")).unwrap();
        let artifact = ckpt.model_path();
        let uc = TrainUseCase::new(FixedStore(separable(20)), RejectingRegistry, ckpt, small_config());

        let err = uc.execute().unwrap_err();
        assert_eq!(err.stage, Stage::Register);
        assert!(err.reason.contains("refused"));
        assert!(artifact.exists());
    }
}
