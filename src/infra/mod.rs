// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns and the adapters behind the domain traits:
//
//   config.rs         - config.yml, schema JSON, .env credentials
//   logging.rs        - tracing subscriber (daily file + console)
//   checkpoint.rs     - local model artifact directory
//   metrics.rs        - accuracy / F1 and the training-run CSV log
//   feature_store.rs  - FeatureStore backed by a CSV feature group
//   model_registry.rs - ModelRegistry with versioned directories
//
// Reference: Rust Book §7 (Modules), §9 (Error Handling)

pub mod config;

pub mod logging;

/// Model artifact saving and loading
pub mod checkpoint;

/// Evaluation metrics and their CSV history
pub mod metrics;

pub mod feature_store;

pub mod model_registry;
