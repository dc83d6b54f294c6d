// ============================================================
// Layer 4 - Preprocessor
// ============================================================
// Turns raw string tables into typed datasets.
//
// Column names are normalised the same way for training and
// prediction so the classifier sees identical feature names:
//
//   "Sensor-1"  -> "sensor_1"
//   "Good/Bad"  -> "good_bad"
//
// The transform only lowercases and maps '-' and '/' to '_',
// so applying it twice gives the same result as applying it once.
//
// Cell coercion:
//   identifier -> String (as written)
//   label      -> Label (+1 / -1), anything else is an error
//   reading    -> f64, empty or unparsable -> NaN
//
// Reference: Rust Book §8 (Strings), §13 (Iterators)

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};

use crate::data::loader::RawTable;
use crate::domain::dataset::{FeatureFrame, Label, LabeledDataset, ID_COLUMN, LABEL_COLUMN};

/// Normalise a single column name.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '/' => '_',
            c => c,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Parse a sensor reading; missing or unparsable cells become NaN.
pub fn parse_reading(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize_columns(&self, names: &[String]) -> Vec<String> {
        names.iter().map(|n| normalize_column_name(n)).collect()
    }

    /// Concatenate labelled training tables into one dataset.
    ///
    /// Columns are aligned by header name (union, first-seen order) and
    /// cells a file does not have are missing (NaN). The first column of
    /// the combined table is the wafer identifier whatever its header says.
    pub fn build_training_dataset(&self, tables: &[(String, RawTable)]) -> Result<LabeledDataset> {
        // ── Step 1: union of raw headers ─────────────────────────────────────
        let mut union: Vec<String> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();
        for (_, table) in tables {
            for header in &table.headers {
                if !position.contains_key(header) {
                    position.insert(header.clone(), union.len());
                    union.push(header.clone());
                }
            }
        }
        if union.len() < 2 {
            bail!("training data needs an identifier column and a label column");
        }

        // ── Step 2: normalised names ─────────────────────────────────────────
        let mut names = vec![ID_COLUMN.to_string()];
        names.extend(union[1..].iter().map(|h| normalize_column_name(h)));
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                bail!("column '{name}' appears twice after normalisation");
            }
        }
        let label_idx = match names.iter().position(|n| n == LABEL_COLUMN) {
            Some(i) => i,
            None => bail!("no '{LABEL_COLUMN}' label column in training data"),
        };

        let feature_idx: Vec<usize> = (1..names.len()).filter(|&i| i != label_idx).collect();
        let feature_names = feature_idx.iter().map(|&i| names[i].clone()).collect();
        let mut dataset = LabeledDataset::new(feature_names);

        // ── Step 3: coerce every row ─────────────────────────────────────────
        for (file, table) in tables {
            let slots: Vec<usize> = table.headers.iter().map(|h| position[h]).collect();
            for (row_no, row) in table.rows.iter().enumerate() {
                let mut cells: Vec<Option<&str>> = vec![None; union.len()];
                for (slot, cell) in slots.iter().zip(row) {
                    cells[*slot] = Some(cell.as_str());
                }

                let label = match cells[label_idx].and_then(Label::parse) {
                    Some(label) => label,
                    None => bail!(
                        "{file} row {}: label {:?} is not +1 or -1",
                        row_no + 1,
                        cells[label_idx].unwrap_or("")
                    ),
                };
                let features = feature_idx
                    .iter()
                    .map(|&i| cells[i].map_or(f64::NAN, parse_reading))
                    .collect();
                dataset.push_row(cells[0].unwrap_or_default(), features, label);
            }
        }

        Ok(dataset)
    }

    /// Build the prediction frame: drop the identifier column, normalise
    /// names and parse readings. Missing values stay NaN for the caller
    /// to fill.
    pub fn build_feature_frame(&self, table: &RawTable) -> FeatureFrame {
        let names = self.normalize_columns(table.headers.get(1..).unwrap_or_default());
        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().skip(1).map(|c| parse_reading(c)).collect())
            .collect();
        FeatureFrame::new(names, rows)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
