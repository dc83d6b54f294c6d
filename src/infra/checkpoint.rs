// ============================================================
// Layer 6 - Model Checkpoint Manager
// ============================================================
// Owns the local model directory (`saved_model` in config.yml):
//
//   <saved_model>/
//     gbt_model.json     <- trained classifier (replaced on retrain)
//     train_config.json  <- hyperparameters of the last run
//     metrics.csv        <- one row per training run (MetricsLogger)
//
// The artifact is replaced atomically (temp file + rename), so a
// concurrent reader sees either the old model or the new one.
// Older versions are kept by the model registry, not here.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::traits::Persistable;
use crate::ml::model::{GbtClassifier, GbtConfig};

pub const MODEL_FILE: &str  = "gbt_model.json";
pub const CONFIG_FILE: &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    /// Save (or replace) the model artifact, returning its path.
    pub fn save_model(&self, model: &GbtClassifier) -> Result<PathBuf> {
        let path = self.model_path();
        model.save(&path)?;
        Ok(path)
    }

    #[cfg(test)]
    pub fn load_model(&self) -> Result<GbtClassifier> {
        GbtClassifier::load(&self.model_path())
    }

    pub fn save_config(&self, cfg: &GbtConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    #[cfg(test)]
    pub fn load_config(&self) -> Result<GbtConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_model_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("model")).unwrap();

        let cfg = GbtConfig { n_estimators: 5, ..GbtConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);

        let model = GbtClassifier::new(cfg, vec!["s".into()], vec![]);
        let path = ckpt.save_model(&model).unwrap();
        assert_eq!(path, dir.path().join("model").join(MODEL_FILE));
        assert_eq!(ckpt.load_model().unwrap(), model);
    }

    #[test]
    fn test_load_before_training_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.load_model().is_err());
        assert!(ckpt.load_config().is_err());
    }
}
