// ============================================================
// Layer 3 - Labels and Datasets
// ============================================================
// A LabeledDataset is the concatenation of every valid training
// batch: one identifier per row, one label per row, and a dense
// row-major matrix of f64 sensor readings. Missing or unparsable
// readings are stored as NaN until a fill policy is applied.
//
// A FeatureFrame is the same matrix without ids or labels, the
// shape handed to the classifier at prediction time.

use serde::{Deserialize, Serialize};

/// Name of the identifier column after normalisation
pub const ID_COLUMN: &str = "wafer_num";

/// Name of the label column after normalisation
pub const LABEL_COLUMN: &str = "good_bad";

/// Wafer quality: good = +1, bad = -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Label {
    Good,
    Bad,
}

impl Label {
    pub fn value(self) -> i64 {
        match self {
            Label::Good => 1,
            Label::Bad  => -1,
        }
    }

    /// Binary target used by the log-loss objective (good = 1, bad = 0)
    pub fn target(self) -> f64 {
        match self {
            Label::Good => 1.0,
            Label::Bad  => 0.0,
        }
    }

    /// Parse a label cell. Accepts "1", "+1", "-1" and float forms like "1.0".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Self::try_from(v).ok();
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 => Self::try_from(v as i64).ok(),
            _ => None,
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1  => Ok(Label::Good),
            -1 => Ok(Label::Bad),
            other => Err(format!("label must be +1 or -1, got {other}")),
        }
    }
}

impl From<Label> for i64 {
    fn from(label: Label) -> Self {
        label.value()
    }
}

/// Unlabelled matrix of sensor readings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    pub feature_names: Vec<String>,
    pub rows:          Vec<Vec<f64>>,
}

impl FeatureFrame {
    pub fn new(feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { feature_names, rows }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn missing_count(&self) -> usize {
        self.rows.iter().flatten().filter(|v| v.is_nan()).count()
    }

    /// Replace every NaN with `value`, returning how many cells changed.
    pub fn fill_missing(&mut self, value: f64) -> usize {
        fill_nan(&mut self.rows, value)
    }
}

/// Labelled training data as stored in the feature store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledDataset {
    pub ids:           Vec<String>,
    pub feature_names: Vec<String>,
    pub features:      Vec<Vec<f64>>,
    pub labels:        Vec<Label>,
}

impl LabeledDataset {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self { feature_names, ..Default::default() }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Append one row. The feature vector must match `feature_names`.
    pub fn push_row(&mut self, id: impl Into<String>, features: Vec<f64>, label: Label) {
        debug_assert_eq!(features.len(), self.feature_names.len());
        self.ids.push(id.into());
        self.features.push(features);
        self.labels.push(label);
    }

    /// Copy the rows at `indices` (in that order) into a new dataset.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            ids:           indices.iter().map(|&i| self.ids[i].clone()).collect(),
            feature_names: self.feature_names.clone(),
            features:      indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels:        indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    pub fn fill_missing(&mut self, value: f64) -> usize {
        fill_nan(&mut self.features, value)
    }

    /// Binary targets aligned with `features`.
    pub fn targets(&self) -> Vec<f64> {
        self.labels.iter().map(|l| l.target()).collect()
    }
}

fn fill_nan(rows: &mut [Vec<f64>], value: f64) -> usize {
    let mut filled = 0;
    for cell in rows.iter_mut().flatten() {
        if cell.is_nan() {
            *cell = value;
            filled += 1;
        }
    }
    filled
}
