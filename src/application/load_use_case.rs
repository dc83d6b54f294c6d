// ============================================================
// Layer 2 - LoadUseCase
// ============================================================
// Moves validated training batches into the feature store:
//
//   Step 1: Read the processed-file manifest   (good folder)
//   Step 2: Load unprocessed CSV files         (Layer 4 - data)
//   Step 3: Concatenate + coerce types         (Layer 4 - data)
//   Step 4: Upsert into the feature store      (Layer 6 - infra)
//   Step 5: Record the files as processed
//
// The manifest is only written after a successful push, so a
// failed push leaves every file eligible for the next run.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::stage::{PipelineError, Stage, StageContext};
use crate::data::{loader::CsvBatchLoader, preprocessor::Preprocessor};
use crate::domain::traits::FeatureStore;

pub const MANIFEST_FILE: &str = "processed.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub files: Vec<String>,
    pub rows:  usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    processed: BTreeSet<String>,
}

impl Manifest {
    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read manifest '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Corrupt manifest '{}'", path.display()))
    }

    fn write(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

pub struct LoadUseCase<S: FeatureStore> {
    good_dir: PathBuf,
    store:    S,
}

impl<S: FeatureStore> LoadUseCase<S> {
    pub fn new(good_dir: impl Into<PathBuf>, store: S) -> Self {
        Self { good_dir: good_dir.into(), store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn execute(&self) -> Result<LoadReport, PipelineError> {
        // ── Step 1: manifest ─────────────────────────────────────────────────
        let manifest_path = self.good_dir.join(MANIFEST_FILE);
        let mut manifest  = Manifest::read(&manifest_path).stage(Stage::Load)?;

        // ── Step 2: unprocessed batches ──────────────────────────────────────
        let tables: Vec<_> = CsvBatchLoader::new(&self.good_dir)
            .load_all()
            .stage(Stage::Load)?
            .into_iter()
            .filter(|(name, _)| !manifest.processed.contains(name))
            .collect();

        if tables.is_empty() {
            tracing::info!("No data files found in '{}'", self.good_dir.display());
            return Ok(LoadReport::default());
        }

        // ── Step 3: one combined dataset ─────────────────────────────────────
        let dataset = Preprocessor::new()
            .build_training_dataset(&tables)
            .stage(Stage::Load)?;
        tracing::info!(
            "Prepared {} rows x {} features from {} file(s)",
            dataset.len(),
            dataset.n_features(),
            tables.len()
        );

        // ── Step 4: upsert ───────────────────────────────────────────────────
        self.store.push(&dataset).stage(Stage::Push)?;

        // ── Step 5: manifest ─────────────────────────────────────────────────
        let files: Vec<String> = tables.into_iter().map(|(name, _)| name).collect();
        manifest.processed.extend(files.iter().cloned());
        manifest.write(&manifest_path).stage(Stage::Load)?;

        tracing::info!("Data pushed to the feature store successfully");
        Ok(LoadReport { files, rows: dataset.len() })
    }
}
