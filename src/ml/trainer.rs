// ============================================================
// Layer 5 - Gradient Boosting Trainer
// ============================================================
// Binary log-loss boosting with exact greedy tree growth.
//
// Each round:
//   p_i = sigmoid(margin_i)
//   g_i = p_i - y_i           (gradient)
//   h_i = p_i * (1 - p_i)     (hessian)
//   grow one tree on (g, h), add lr * leaf weight to the margins
//
// Split gain for a candidate (left L, right R, parent P):
//   0.5 * [ G_L²/(H_L+λ) + G_R²/(H_R+λ) - G_P²/(H_P+λ) ] - γ
// Leaf weight:
//   -G/(H+λ) * learning_rate
//
// Reference: Chen & Guestrin (2016) XGBoost

use anyhow::{bail, Result};

use crate::ml::model::{sigmoid, GbtClassifier, GbtConfig, Tree, TreeNode};

const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone, Copy)]
struct SplitInfo {
    feature:   usize,
    threshold: f64,
    gain:      f64,
}

pub struct GbtTrainer {
    config: GbtConfig,
}

impl GbtTrainer {
    pub fn new(config: GbtConfig) -> Self {
        Self { config }
    }

    /// Fit on row-major `features` with binary `targets` (1 = good, 0 = bad).
    /// Features must not contain NaN; apply the fill policy first.
    pub fn fit(
        &self,
        feature_names: Vec<String>,
        features:      &[Vec<f64>],
        targets:       &[f64],
    ) -> Result<GbtClassifier> {
        let cfg = &self.config;
        if features.is_empty() {
            bail!("cannot fit a classifier on an empty training set");
        }
        if features.len() != targets.len() {
            bail!("{} feature rows but {} targets", features.len(), targets.len());
        }
        if features.iter().any(|r| r.len() != feature_names.len()) {
            bail!("every row must have {} features", feature_names.len());
        }
        if features.iter().flatten().any(|v| v.is_nan()) {
            bail!("training features contain NaN values");
        }
        if !(cfg.base_score > 0.0 && cfg.base_score < 1.0) {
            bail!("base_score must be in (0, 1), got {}", cfg.base_score);
        }

        let mut model = GbtClassifier::new(cfg.clone(), feature_names, Vec::new());
        let mut margins = vec![model.base_margin(); features.len()];
        let all_rows: Vec<usize> = (0..features.len()).collect();

        for round in 0..cfg.n_estimators {
            let mut grad = Vec::with_capacity(margins.len());
            let mut hess = Vec::with_capacity(margins.len());
            for (m, y) in margins.iter().zip(targets) {
                let p = sigmoid(*m);
                grad.push(p - y);
                hess.push((p * (1.0 - p)).max(MIN_HESSIAN));
            }

            let mut nodes = Vec::new();
            self.grow(features, &grad, &hess, &all_rows, 0, &mut nodes);
            let tree = Tree { nodes };

            for (m, row) in margins.iter_mut().zip(features) {
                *m += tree.predict_row(row);
            }
            model.trees.push(tree);

            if round % 10 == 0 || round + 1 == cfg.n_estimators {
                tracing::debug!(
                    "Boosting round {}/{}: train logloss={:.5}",
                    round + 1,
                    cfg.n_estimators,
                    log_loss(&margins, targets)
                );
            }
        }

        Ok(model)
    }

    /// Grow the subtree for `rows`, returning the index of its root node.
    fn grow(
        &self,
        x:     &[Vec<f64>],
        grad:  &[f64],
        hess:  &[f64],
        rows:  &[usize],
        depth: usize,
        nodes: &mut Vec<TreeNode>,
    ) -> usize {
        let cfg = &self.config;
        let g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| hess[i]).sum();

        let idx = nodes.len();
        nodes.push(TreeNode::Leaf {
            weight: -g / (h + cfg.lambda) * cfg.learning_rate,
        });

        if depth >= cfg.max_depth || h < 2.0 * cfg.min_child_weight {
            return idx;
        }
        let Some(split) = self.best_split(x, grad, hess, rows, g, h) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&i| x[i][split.feature] < split.threshold);

        let left  = self.grow(x, grad, hess, &left_rows, depth + 1, nodes);
        let right = self.grow(x, grad, hess, &right_rows, depth + 1, nodes);
        nodes[idx] = TreeNode::Split {
            feature:   split.feature,
            threshold: split.threshold,
            gain:      split.gain,
            left,
            right,
        };
        idx
    }

    fn best_split(
        &self,
        x:    &[Vec<f64>],
        grad: &[f64],
        hess: &[f64],
        rows: &[usize],
        g:    f64,
        h:    f64,
    ) -> Option<SplitInfo> {
        let cfg = &self.config;
        let score = |g: f64, h: f64| g * g / (h + cfg.lambda);
        let parent = score(g, h);
        let n_features = x.first().map_or(0, Vec::len);

        let mut best: Option<SplitInfo> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(rows.len());

        for feature in 0..n_features {
            column.clear();
            column.extend(rows.iter().map(|&i| (x[i][feature], i)));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (mut gl, mut hl) = (0.0, 0.0);
            for pos in 0..column.len().saturating_sub(1) {
                let (value, i) = column[pos];
                gl += grad[i];
                hl += hess[i];

                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < cfg.min_child_weight || hr < cfg.min_child_weight {
                    continue;
                }

                let gain = 0.5 * (score(gl, hl) + score(gr, hr) - parent) - cfg.gamma;
                if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitInfo {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// Mean binary log-loss of raw margins against 0/1 targets.
pub fn log_loss(margins: &[f64], targets: &[f64]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    let eps = 1e-15;
    let total: f64 = margins
        .iter()
        .zip(targets)
        .map(|(m, y)| {
            let p = sigmoid(*m).clamp(eps, 1.0 - eps);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / margins.len() as f64
}
