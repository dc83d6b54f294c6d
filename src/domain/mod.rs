// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types and traits describing wafer batches,
// labelled datasets, validation outcomes and the narrow
// interfaces to the external feature store / model registry.
//
// Rules for this layer:
//   - NO file system access
//   - NO model-fitting code
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Expected file-name and column layout of a batch file
pub mod schema;

// Labels, labelled datasets and feature frames
pub mod dataset;

// Result types reported by the pipelines
pub mod outcome;

// Core abstractions (traits) that other layers implement
pub mod traits;
