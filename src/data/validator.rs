// ============================================================
// Layer 4 - Batch File Validation
// ============================================================
// Two independent checks decide whether a batch file is usable:
//
//   1. Name check   : wafer_<D digits>_<T digits>.csv
//                     "wafer" is matched case-insensitively,
//                     D and T come from the schema, and the
//                     pattern is anchored at both ends so
//                     "wafer_..._.csv.bak" or "xwafer_..." fail.
//   2. Column check : the parsed CSV has exactly the expected
//                     number of columns.
//
// Reference: regex crate documentation

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::data::loader::count_columns;
use crate::domain::outcome::RejectReason;
use crate::domain::schema::Schema;

pub struct BatchValidator {
    name_pattern: Regex,
    schema:       Schema,
}

impl BatchValidator {
    pub fn new(schema: &Schema) -> Result<Self> {
        let pattern = format!(
            r"^(?i:wafer)_[0-9]{{{}}}_[0-9]{{{}}}\.csv$",
            schema.date_stamp_len, schema.time_stamp_len
        );
        let name_pattern = Regex::new(&pattern)
            .with_context(|| format!("Invalid file-name pattern '{pattern}'"))?;
        tracing::debug!("File-name pattern: {}", pattern);
        Ok(Self { name_pattern, schema: schema.clone() })
    }

    pub fn is_valid_name(&self, file_name: &str) -> bool {
        self.name_pattern.is_match(file_name)
    }

    /// Column check against an explicit count.
    pub fn check_columns(&self, path: &Path, expected: usize) -> Result<(), RejectReason> {
        match count_columns(path) {
            Ok(found) if found == expected => Ok(()),
            Ok(found) => Err(RejectReason::ColumnCount { expected, found }),
            Err(e) => Err(RejectReason::Unreadable(format!("{e:#}"))),
        }
    }

    /// Both checks for a labelled training batch.
    pub fn validate_training_file(&self, path: &Path) -> Result<(), RejectReason> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !self.is_valid_name(name) {
            return Err(RejectReason::FileName);
        }
        self.check_columns(path, self.schema.training_columns())
    }

    /// Column check for an unlabelled prediction batch.
    pub fn validate_prediction_file(&self, path: &Path) -> Result<(), RejectReason> {
        self.check_columns(path, self.schema.prediction_columns())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn validator() -> BatchValidator {
        BatchValidator::new(&Schema::new(8, 6, 4)).unwrap()
    }

    #[test]
    fn test_accepts_matching_names() {
        let v = validator();
        assert!(v.is_valid_name("wafer_13012020_090817.csv"));
        assert!(v.is_valid_name("Wafer_13012020_090817.csv"));
        assert!(v.is_valid_name("WAFER_13012020_090817.csv"));
    }

    #[test]
    fn test_rejects_wrong_digit_counts() {
        let v = validator();
        assert!(!v.is_valid_name("wafer_1301202_090817.csv"));
        assert!(!v.is_valid_name("wafer_130120201_090817.csv"));
        assert!(!v.is_valid_name("wafer_13012020_09081.csv"));
        assert!(!v.is_valid_name("wafer_13012020_0908170.csv"));
        assert!(!v.is_valid_name("wafer_1301202a_090817.csv"));
    }

    #[test]
    fn test_rejects_partial_matches() {
        let v = validator();
        // extra suffix
        assert!(!v.is_valid_name("wafer_13012020_090817.csv.bak"));
        assert!(!v.is_valid_name("wafer_13012020_090817.csvx"));
        assert!(!v.is_valid_name("wafer_13012020_090817_1.csv"));
        // missing extension
        assert!(!v.is_valid_name("wafer_13012020_090817"));
        assert!(!v.is_valid_name("wafer_13012020_090817csv"));
        // extra prefix
        assert!(!v.is_valid_name("xwafer_13012020_090817.csv"));
        assert!(!v.is_valid_name(" wafer_13012020_090817.csv"));
        assert!(!v.is_valid_name("wafers_13012020_090817.csv"));
    }

    #[test]
    fn test_schema_controls_digit_counts() {
        let v = BatchValidator::new(&Schema::new(2, 3, 4)).unwrap();
        assert!(v.is_valid_name("wafer_12_345.csv"));
        assert!(!v.is_valid_name("wafer_13012020_090817.csv"));
    }

    #[test]
    fn test_column_count_exact() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let exact = dir.path().join("wafer_13012020_090817.csv");
        let fewer = dir.path().join("wafer_13012020_090818.csv");
        let more  = dir.path().join("wafer_13012020_090819.csv");
        fs::write(&exact, "id,a,b,good_bad\nw1,1,2,1\n").unwrap();
        fs::write(&fewer, "id,a,good_bad\nw1,1,1\n").unwrap();
        fs::write(&more, "id,a,b,c,good_bad\nw1,1,2,3,1\n").unwrap();

        assert_eq!(v.validate_training_file(&exact), Ok(()));
        assert_eq!(
            v.validate_training_file(&fewer),
            Err(RejectReason::ColumnCount { expected: 4, found: 3 })
        );
        assert_eq!(
            v.validate_training_file(&more),
            Err(RejectReason::ColumnCount { expected: 4, found: 5 })
        );
    }

    #[test]
    fn test_prediction_expects_one_fewer_column() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        fs::write(&path, "id,a,b\nw1,1,2\n").unwrap();
        assert_eq!(v.validate_prediction_file(&path), Ok(()));
        assert!(v.validate_training_file(&path).is_err());
    }

    #[test]
    fn test_corrupt_file_is_unreadable() {
        let v = validator();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wafer_13012020_090817.csv");
        fs::write(&path, "id,a,b,good_bad\nw1,1\n").unwrap();
        assert!(matches!(
            v.validate_training_file(&path),
            Err(RejectReason::Unreadable(_))
        ));
    }
}
