// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates the other layers into the pipelines
// the CLI and the web server run.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination and stage reporting
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Stage-tagged pipeline failures
pub mod stage;

// Download + unzip raw batches
pub mod ingest_use_case;

// Name/column checks, routing to good/bad folders
pub mod validate_use_case;

// Good folder -> feature store
pub mod load_use_case;

// Feature store -> model artifact + registry version
pub mod train_use_case;

// Prediction folder -> labels, output CSV and counts
pub mod predict_use_case;
