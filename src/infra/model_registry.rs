// ============================================================
// Layer 6 - Local Model Registry
// ============================================================
// File-backed implementation of the ModelRegistry trait. Every
// registration creates a new immutable version:
//
//   <model_registry_dir>/sensor/
//     v1/gbt_model.json
//     v1/model.json        <- metrics + metadata
//     v2/...
//
// Versions start at 1 and always increase, even if an older
// version directory has been deleted by hand.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::outcome::{EvaluationMetrics, RegisteredModel};
use crate::domain::traits::ModelRegistry;

pub const MODEL_NAME: &str = "sensor";
const DESCRIPTION: &str = "detection of sensor's wafer condition whether it is good or bad";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub name:          String,
    pub version:       u32,
    pub description:   String,
    /// Accuracy in percent with two decimals, e.g. "93.75"
    pub accuracy:      String,
    pub f1:            f64,
    pub train_rows:    usize,
    pub test_rows:     usize,
    pub artifact:      String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

pub struct LocalModelRegistry {
    root: PathBuf,
}

impl LocalModelRegistry {
    pub fn open(dir: &Path) -> Result<Self> {
        let root = dir.join(MODEL_NAME);
        fs::create_dir_all(&root)
            .with_context(|| format!("Cannot create model registry '{}'", root.display()))?;
        Ok(Self { root })
    }

    /// Registered versions in ascending order.
    pub fn versions(&self) -> Result<Vec<u32>> {
        let mut versions: Vec<u32> = fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix('v'))
                    .and_then(|n| n.parse().ok())
            })
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    #[cfg(test)]
    pub fn card(&self, version: u32) -> Result<ModelCard> {
        let path = self.root.join(format!("v{version}")).join("model.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl ModelRegistry for LocalModelRegistry {
    fn register(&self, model_path: &Path, metrics: &EvaluationMetrics) -> Result<RegisteredModel> {
        let version = self.versions()?.last().map_or(1, |v| v + 1);
        let dir = self.root.join(format!("v{version}"));
        fs::create_dir_all(&dir)?;

        let file_name = model_path
            .file_name()
            .context("model path has no file name")?;
        fs::copy(model_path, dir.join(file_name)).with_context(|| {
            format!("Cannot copy '{}' into the registry", model_path.display())
        })?;

        let card = ModelCard {
            name:          MODEL_NAME.to_string(),
            version,
            description:   DESCRIPTION.to_string(),
            accuracy:      metrics.accuracy_percent(),
            f1:            metrics.f1,
            train_rows:    metrics.train_rows,
            test_rows:     metrics.test_rows,
            artifact:      file_name.to_string_lossy().into_owned(),
            registered_at: chrono::Utc::now(),
        };
        fs::write(dir.join("model.json"), serde_json::to_string_pretty(&card)?)?;

        tracing::info!("Model registered as {} v{}", MODEL_NAME, version);
        Ok(RegisteredModel { name: MODEL_NAME.to_string(), version })
    }
}
