// ============================================================
// Layer 6 - Evaluation Metrics
// ============================================================
// Scores a trained classifier on the held-out split and keeps a
// history of training runs in a CSV file next to the model:
//
//   <saved_model>/metrics.csv
//   trained_at,train_rows,test_rows,accuracy,f1
//   2026-10-19T08:15:02+00:00,70,30,0.966667,0.975000
//
// F1 treats +1 (good wafer) as the positive class. When it is
// undefined (no positive predictions and no positive labels)
// it is reported as 0.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::dataset::Label;
use crate::domain::outcome::EvaluationMetrics;

/// Fraction of positions where `predicted` equals `actual`.
pub fn accuracy(actual: &[Label], predicted: &[Label]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    correct as f64 / actual.len() as f64
}

/// F1 score with `Label::Good` as the positive class.
pub fn f1_score(actual: &[Label], predicted: &[Label]) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (a, p) in actual.iter().zip(predicted) {
        match (a, p) {
            (Label::Good, Label::Good) => tp += 1,
            (Label::Bad, Label::Good)  => fp += 1,
            (Label::Good, Label::Bad)  => fn_ += 1,
            (Label::Bad, Label::Bad)   => {}
        }
    }
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        0.0
    } else {
        (2 * tp) as f64 / denom as f64
    }
}

pub fn evaluate(actual: &[Label], predicted: &[Label], train_rows: usize) -> EvaluationMetrics {
    EvaluationMetrics {
        accuracy:  accuracy(actual, predicted),
        f1:        f1_score(actual, predicted),
        train_rows,
        test_rows: actual.len(),
    }
}

/// Appends one row per training run to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "trained_at,train_rows,test_rows,accuracy,f1")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EvaluationMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{},{},{:.6},{:.6}",
            chrono::Utc::now().to_rfc3339(),
            m.train_rows,
            m.test_rows,
            m.accuracy,
            m.f1,
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
