// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Scoring side of the classifier. Loading and predicting are kept
// apart so a caller can load the artifact once and score many frames:
//
//   1. from_artifact  -> read gbt_model.json through Persistable
//   2. predict        -> reject frames whose columns do not match the
//                        feature names the model was trained on, then
//                        return one Label per row in input order
//
// The model itself is immutable here; retraining writes a new artifact
// and the next request picks it up.
use std::path::Path;

use anyhow::Result;

use crate::domain::dataset::{FeatureFrame, Label};
use crate::domain::traits::Persistable;
use crate::ml::model::GbtClassifier;

/// Holds one loaded model and scores any number of frames with it.
pub struct Inferencer {
    model: GbtClassifier,
}

impl Inferencer {
    pub fn from_artifact(path: &Path) -> Result<Self> {
        let model = GbtClassifier::load(path)?;
        tracing::info!(
            "Model loaded from '{}' ({} trees, {} features)",
            path.display(),
            model.trees.len(),
            model.n_features()
        );
        Ok(Self { model })
    }

    #[cfg(test)]
    pub fn from_model(model: GbtClassifier) -> Self {
        Self { model }
    }

    /// One label per row, in row order.
    pub fn predict(&self, frame: &FeatureFrame) -> Result<Vec<Label>> {
        self.model.check_features(&frame.feature_names)?;
        Ok(self.model.predict(&frame.rows))
    }
}
