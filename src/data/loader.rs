// ============================================================
// Layer 4 - CSV Batch Loader
// ============================================================
// Reads wafer batch files with the csv crate. A batch file is a
// header row followed by one row per wafer:
//
//   ,Sensor-1,Sensor-2,...,Sensor-590,Good/Bad
//   Wafer-801,2968.33,2476.58,...,-1
//
// The reader is strict about shape: a row whose field count
// differs from the header is a parse error, so ragged or
// truncated files surface as unreadable instead of being
// silently padded.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::ReaderBuilder;

/// A CSV file held as strings, before any type coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows:    Vec<Vec<String>>,
}

impl RawTable {
    pub fn n_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Parse a whole CSV file into a RawTable.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Cannot read header of '{}'", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("Malformed record {} in '{}'", line + 1, path.display())
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Number of columns in a CSV file. The whole file is parsed so that
/// a corrupt body is reported even when the header looks fine.
pub fn count_columns(path: &Path) -> Result<usize> {
    let table = read_table(path)?;
    if table.headers.iter().all(|h| h.trim().is_empty()) && table.rows.is_empty() {
        anyhow::bail!("'{}' is empty", path.display());
    }
    Ok(table.n_columns())
}

/// Regular files directly inside `dir`, sorted by file name.
/// In-flight copies (`.<name>.partial`) are skipped; any other file,
/// dot-files included, is listed so the caller can accept or reject it.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let entry = entry?;
        let path  = entry.path();
        if entry.file_type()?.is_file() && !is_partial_copy(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_partial_copy(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(".partial"))
}

/// The final component of a path as an owned String.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ─── CsvBatchLoader ───────────────────────────────────────────────────────────
/// Loads every `.csv` file in a directory, skipping the ones that
/// cannot be parsed (they are logged, not fatal).
pub struct CsvBatchLoader {
    dir: PathBuf,
}

impl CsvBatchLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns (file name, table) pairs in file-name order.
    pub fn load_all(&self) -> Result<Vec<(String, RawTable)>> {
        if !self.dir.exists() {
            tracing::warn!(
                "Batch directory '{}' does not exist, nothing to load",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut tables = Vec::new();
        for path in list_files(&self.dir)? {
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let name = file_name_of(&path);
            match read_table(&path) {
                Ok(table) => {
                    tracing::info!(
                        "Loaded {} for preprocessing ({} rows, {} columns)",
                        name,
                        table.n_rows(),
                        table.n_columns()
                    );
                    tables.push((name, table));
                }
                Err(e) => tracing::error!("Error loading {}: {:#}", name, e),
            }
        }
        Ok(tables)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_headers_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, ",Sensor-1,Good/Bad\nWafer-1,1.5,-1\nWafer-2,,1\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["", "Sensor-1", "Good/Bad"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.rows[1], vec!["Wafer-2", "", "1"]);
    }

    #[test]
    fn test_ragged_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b,c\n1,2,3\n4,5\n").unwrap();
        assert!(read_table(&path).is_err());
        assert!(count_columns(&path).is_err());
    }

    #[test]
    fn test_empty_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(count_columns(&path).is_err());
    }

    #[test]
    fn test_list_files_sorted_and_skips_partial_copies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "x\n").unwrap();
        fs::write(dir.path().join("a.csv"), "x\n").unwrap();
        fs::write(dir.path().join(".a.csv.partial"), "x\n").unwrap();
        fs::write(dir.path().join(".wafer_13012020_090817.csv"), "x\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let names: Vec<String> = list_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name_of(p))
            .collect();
        assert_eq!(names, vec![".wafer_13012020_090817.csv", "a.csv", "b.csv"]);
    }

    #[test]
    fn test_loader_skips_unreadable_and_non_csv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.csv"), "a,b\n1,2\n").unwrap();
        fs::write(dir.path().join("broken.csv"), "a,b\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let loaded = CsvBatchLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "good.csv");
    }

    #[test]
    fn test_loader_missing_dir_is_empty() {
        let loaded = CsvBatchLoader::new("/no/such/dir").load_all().unwrap();
        assert!(loaded.is_empty());
    }
}
