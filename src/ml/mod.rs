// ============================================================
// Layer 5 - ML / Model Layer
// ============================================================
// The wafer classifier: a boosted ensemble of shallow regression
// trees over binary log-loss.
//
//   model.rs      - GbtConfig, trees, GbtClassifier and its
//                   JSON artifact format
//   trainer.rs    - exact greedy boosting loop
//   inferencer.rs - loads the artifact once and scores frames
//
// Reference: Chen & Guestrin (2016) XGBoost

/// Classifier, trees and artifact persistence
pub mod model;

/// Boosting loop
pub mod trainer;

/// Batch prediction with a loaded model
pub mod inferencer;
