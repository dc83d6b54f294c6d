// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The external feature store and model registry are reached
// only through these traits, so the pipelines can be driven by
// the local adapters in the infra layer (or by test doubles).
//
//   FeatureStore  -> push / fetch labelled training data
//   ModelRegistry -> catalogue a trained artifact with metrics
//   Persistable   -> save / load a component to a path
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::dataset::LabeledDataset;
use crate::domain::outcome::{EvaluationMetrics, RegisteredModel};

// ─── FeatureStore ─────────────────────────────────────────────────────────────
pub trait FeatureStore {
    /// Insert the dataset. Rows sharing an id with stored rows replace them.
    fn push(&self, dataset: &LabeledDataset) -> Result<()>;

    /// Snapshot of everything stored so far.
    fn fetch(&self) -> Result<LabeledDataset>;
}

// ─── ModelRegistry ────────────────────────────────────────────────────────────
pub trait ModelRegistry {
    /// Register the artifact at `model_path` together with its scores.
    fn register(&self, model_path: &Path, metrics: &EvaluationMetrics) -> Result<RegisteredModel>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
pub trait Persistable: Sized {
    fn save(&self, path: &Path) -> Result<()>;

    fn load(path: &Path) -> Result<Self>;
}
