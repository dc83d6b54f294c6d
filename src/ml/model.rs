// ============================================================
// Layer 5 - Boosted Tree Classifier
// ============================================================
// Trees are stored as flat node vectors with child indices, and
// the whole classifier (config, feature names, trees) is one
// JSON document:
//
//   { "config": {...}, "feature_names": [...], "trees": [{ "nodes": [...] }] }
//
// Reference: XGBoost model dump format

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::dataset::Label;
use crate::domain::traits::Persistable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbtConfig {
    pub n_estimators:     usize,
    pub learning_rate:    f64,
    pub max_depth:        usize,
    pub objective:        Objective,
    /// L2 penalty on leaf weights
    pub lambda:           f64,
    /// Minimum loss reduction required to split
    pub gamma:            f64,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    pub base_score:       f64,
}

impl Default for GbtConfig {
    fn default() -> Self {
        Self {
            n_estimators:     100,
            learning_rate:    0.1,
            max_depth:        3,
            objective:        Objective::BinaryLogistic,
            lambda:           1.0,
            gamma:            0.0,
            min_child_weight: 1.0,
            base_score:       0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `row[feature] < threshold` (or NaN) go left.
    Split {
        feature:   usize,
        threshold: f64,
        gain:      f64,
        left:      usize,
        right:     usize,
    },
    Leaf {
        weight: f64,
    },
}

/// A regression tree over raw margins. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { weight } => return *weight,
                TreeNode::Split { feature, threshold, left, right, .. } => {
                    let v = row[*feature];
                    idx = if v.is_nan() || v < *threshold { *left } else { *right };
                }
            }
        }
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Boosted-tree binary classifier for wafer quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbtClassifier {
    pub config:        GbtConfig,
    pub feature_names: Vec<String>,
    pub trees:         Vec<Tree>,
}

impl GbtClassifier {
    pub fn new(config: GbtConfig, feature_names: Vec<String>, trees: Vec<Tree>) -> Self {
        Self { config, feature_names, trees }
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn base_margin(&self) -> f64 {
        let p = self.config.base_score;
        (p / (1.0 - p)).ln()
    }

    pub fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin() + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    /// Probability that each row is a good wafer.
    pub fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| sigmoid(self.margin(r))).collect()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<Label> {
        self.predict_proba(rows)
            .into_iter()
            .map(|p| if p >= 0.5 { Label::Good } else { Label::Bad })
            .collect()
    }

    /// The frame must carry exactly the features the model was fitted on.
    pub fn check_features(&self, names: &[String]) -> Result<()> {
        if names.len() != self.feature_names.len() {
            bail!(
                "model expects {} features, input has {}",
                self.feature_names.len(),
                names.len()
            );
        }
        if let Some((expected, found)) = self
            .feature_names
            .iter()
            .zip(names)
            .find(|(expected, found)| expected != found)
        {
            bail!("feature mismatch: model expects '{expected}', input has '{found}'");
        }
        Ok(())
    }
}

impl GbtClassifier {
    /// Every split must point at an existing feature and at child nodes
    /// further down the vector, so prediction always terminates.
    pub fn check_structure(&self) -> Result<()> {
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                bail!("tree {t} has no nodes");
            }
            for (idx, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split { feature, left, right, .. } = node {
                    if *feature >= self.n_features() {
                        bail!("tree {t} node {idx} splits on unknown feature {feature}");
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= tree.nodes.len() {
                            bail!("tree {t} node {idx} has invalid child {child}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Persistable for GbtClassifier {
    /// Writes JSON to a sibling temp file, then renames over `path`.
    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(self)?;
        fs::write(&tmp, json).with_context(|| format!("Cannot write '{}'", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Cannot replace model at '{}'", path.display()))?;
        tracing::info!("Model saved at '{}'", path.display());
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| {
            format!("Cannot read model '{}'. Has the training pipeline run?", path.display())
        })?;
        let model: GbtClassifier = serde_json::from_slice(&bytes)
            .with_context(|| format!("'{}' is not a valid model artifact", path.display()))?;
        model
            .check_structure()
            .with_context(|| format!("'{}' is not a valid model artifact", path.display()))?;
        Ok(model)
    }
}
