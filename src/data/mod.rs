// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between raw batch files on disk and typed datasets:
//
//   batch CSV files
//       │
//       ▼
//   BatchValidator   -> file-name + column-count checks
//       │
//       ▼
//   FileRouter       -> verified move into good / bad folders
//       │
//       ▼
//   CsvBatchLoader   -> parse every good file into RawTables
//       │
//       ▼
//   Preprocessor     -> concatenate, normalise names, coerce types
//       │
//       ▼
//   split_train_test -> seeded 70/30 hold-out split
//
// Reference: csv / regex / rand crate documentation

/// Reads CSV batch files into string tables
pub mod loader;

/// File-name and column-count validation
pub mod validator;

/// Copy-verify-rename moves into good / bad folders
pub mod router;

/// Column normalisation and type coercion
pub mod preprocessor;

/// Seeded train/test split
pub mod splitter;
