// ============================================================
// Layer 3 - Pipeline Outcomes
// ============================================================
// Tagged result types returned by the pipelines. Inference has
// three distinct endings so a caller can tell "nothing to score"
// apart from "scoring failed":
//
//   Success      -> at least one file was scored
//   NoValidFiles -> the directory held no file that passed checks
//   Failure      -> reading, model loading or prediction failed

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::domain::dataset::Label;

// ─── LabelCounts ─────────────────────────────────────────────────────────────
/// Number of +1 (good) and -1 (bad) predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts {
    pub good: usize,
    pub bad:  usize,
}

impl LabelCounts {
    #[cfg(test)]
    pub fn total(&self) -> usize {
        self.good + self.bad
    }
}

impl Add for LabelCounts {
    type Output = LabelCounts;

    fn add(self, rhs: Self) -> Self::Output {
        LabelCounts {
            good: self.good + rhs.good,
            bad:  self.bad + rhs.bad,
        }
    }
}

impl<'a> FromIterator<&'a Label> for LabelCounts {
    fn from_iter<I: IntoIterator<Item = &'a Label>>(iter: I) -> Self {
        iter.into_iter().fold(LabelCounts::default(), |mut acc, label| {
            match label {
                Label::Good => acc.good += 1,
                Label::Bad  => acc.bad += 1,
            }
            acc
        })
    }
}

// ─── InferenceOutcome ────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InferenceOutcome {
    Success {
        good_count:    usize,
        bad_count:     usize,
        skipped_files: Vec<String>,
    },
    NoValidFiles {
        skipped_files: Vec<String>,
    },
    Failure {
        reason: String,
    },
}

impl InferenceOutcome {
    pub fn success(counts: LabelCounts, skipped_files: Vec<String>) -> Self {
        InferenceOutcome::Success {
            good_count: counts.good,
            bad_count:  counts.bad,
            skipped_files,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        InferenceOutcome::Failure { reason: reason.into() }
    }

    #[cfg(test)]
    pub fn counts(&self) -> Option<LabelCounts> {
        match self {
            InferenceOutcome::Success { good_count, bad_count, .. } => Some(LabelCounts {
                good: *good_count,
                bad:  *bad_count,
            }),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        matches!(self, InferenceOutcome::Success { .. })
    }
}

impl fmt::Display for InferenceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceOutcome::Success { good_count, bad_count, skipped_files } => {
                write!(f, "{good_count} good wafer(s), {bad_count} bad wafer(s)")?;
                if !skipped_files.is_empty() {
                    write!(f, " ({} file(s) skipped)", skipped_files.len())?;
                }
                Ok(())
            }
            InferenceOutcome::NoValidFiles { skipped_files } => write!(
                f,
                "no valid prediction files found ({} file(s) rejected)",
                skipped_files.len()
            ),
            InferenceOutcome::Failure { reason } => write!(f, "inference failed: {reason}"),
        }
    }
}

// ─── Validation ──────────────────────────────────────────────────────────────
/// Why a training batch was routed to the bad folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    FileName,
    ColumnCount { expected: usize, found: usize },
    Unreadable(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::FileName => write!(f, "file name validation failure"),
            RejectReason::ColumnCount { expected, found } => write!(
                f,
                "column validation failure (expected {expected} columns, found {found})"
            ),
            RejectReason::Unreadable(e) => write!(f, "unreadable file: {e}"),
        }
    }
}

/// Summary of one validate-and-route pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub good:      Vec<String>,
    pub bad:       Vec<(String, RejectReason)>,
    /// Files left in place because the destination already held the name
    /// or the copy could not be verified.
    pub conflicts: Vec<(String, String)>,
}

impl ValidationReport {
    pub fn processed(&self) -> usize {
        self.good.len() + self.bad.len() + self.conflicts.len()
    }
}

// ─── Training ────────────────────────────────────────────────────────────────
/// Hold-out scores of a trained classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Fraction of hold-out rows predicted correctly, in [0, 1]
    pub accuracy:   f64,
    /// F1 score with +1 (good) as the positive class
    pub f1:         f64,
    pub train_rows: usize,
    pub test_rows:  usize,
}

impl EvaluationMetrics {
    /// Accuracy as a percentage string with two decimals, e.g. "93.75"
    pub fn accuracy_percent(&self) -> String {
        format!("{:.2}", self.accuracy * 100.0)
    }
}

/// Entry created by a model registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name:    String,
    pub version: u32,
}
