// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Scores every file in the prediction directory with the saved
// model and aggregates the labels:
//
//   Step 1: Column check per file, sorted by name   (Layer 4)
//   Step 2: Load the model once                     (Layer 5)
//   Step 3: Normalise, fill NaN with 0, predict     (Layer 4/5)
//   Step 4: Write all predictions to the output CSV
//   Step 5: Count +1 and -1
//
// Files failing the column check are logged and reported as
// skipped. Any read, model or predict error turns the whole run
// into a Failure and leaves the previous output file untouched.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::data::{
    loader::{file_name_of, list_files, read_table},
    preprocessor::Preprocessor,
    validator::BatchValidator,
};
use crate::domain::dataset::{Label, LABEL_COLUMN};
use crate::domain::outcome::{InferenceOutcome, LabelCounts};
use crate::domain::schema::Schema;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    prediction_dir: PathBuf,
    output_file:    PathBuf,
    model_path:     PathBuf,
    validator:      BatchValidator,
}

impl PredictUseCase {
    pub fn new(
        schema:         &Schema,
        prediction_dir: impl Into<PathBuf>,
        output_file:    impl Into<PathBuf>,
        model_path:     impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            prediction_dir: prediction_dir.into(),
            output_file:    output_file.into(),
            model_path:     model_path.into(),
            validator:      BatchValidator::new(schema)?,
        })
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Never panics and never returns an ambiguous value.
    pub fn run_inference(&self) -> InferenceOutcome {
        match self.try_run() {
            Ok(outcome) => {
                tracing::info!("Inference finished: {}", outcome);
                outcome
            }
            Err(e) => {
                tracing::error!("Error during inference: {:#}", e);
                InferenceOutcome::failure(format!("{e:#}"))
            }
        }
    }

    fn try_run(&self) -> Result<InferenceOutcome> {
        // ── Step 1: column check ─────────────────────────────────────────────
        let mut valid   = Vec::new();
        let mut skipped = Vec::new();
        for path in list_files(&self.prediction_dir)? {
            let name = file_name_of(&path);
            match self.validator.validate_prediction_file(&path) {
                Ok(()) => valid.push(path),
                Err(reason) => {
                    tracing::warn!("Skipping {} for prediction: {}", name, reason);
                    skipped.push(name);
                }
            }
        }
        if valid.is_empty() {
            tracing::warn!(
                "No valid prediction files in '{}'",
                self.prediction_dir.display()
            );
            return Ok(InferenceOutcome::NoValidFiles { skipped_files: skipped });
        }

        // ── Step 2: model ────────────────────────────────────────────────────
        let inferencer = Inferencer::from_artifact(&self.model_path)
            .with_context(|| format!("Cannot load model '{}'", self.model_path.display()))?;

        // ── Step 3: predict per file, in file order ──────────────────────────
        let preprocessor = Preprocessor::new();
        let mut labels: Vec<Label> = Vec::new();
        for path in &valid {
            let name  = file_name_of(path);
            let table = read_table(path)?;
            let mut frame = preprocessor.build_feature_frame(&table);
            let filled = frame.fill_missing(0.0);
            let predicted = inferencer
                .predict(&frame)
                .with_context(|| format!("Prediction failed for {name}"))?;
            tracing::info!(
                "Predicted {} row(s) from {} ({} missing value(s) filled)",
                predicted.len(),
                name,
                filled
            );
            labels.extend(predicted);
        }

        // ── Step 4: output ───────────────────────────────────────────────────
        write_predictions(&self.output_file, &labels)?;
        tracing::info!("Predictions written to '{}'", self.output_file.display());

        // ── Step 5: aggregate ────────────────────────────────────────────────
        let counts: LabelCounts = labels.iter().collect();
        Ok(InferenceOutcome::success(counts, skipped))
    }

    /// Delete the batch files at the top of the prediction directory.
    /// Subdirectories (live request workspaces of the UI) are left alone.
    pub fn clear_inputs(&self) -> Result<usize> {
        if !self.prediction_dir.exists() {
            return Ok(0);
        }
        let files = list_files(&self.prediction_dir)?;
        for path in &files {
            fs::remove_file(path)
                .with_context(|| format!("Cannot remove '{}'", path.display()))?;
        }
        tracing::info!(
            "Removed {} prediction input(s) from '{}'",
            files.len(),
            self.prediction_dir.display()
        );
        Ok(files.len())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Persistable;
    use crate::ml::model::{GbtClassifier, GbtConfig, Tree, TreeNode};

    const SENSORS: usize = 591;

    /// Good when sensor_1 >= 0.5, bad otherwise.
    fn save_model(dir: &Path) -> PathBuf {
        let names = (1..=SENSORS).map(|i| format!("sensor_{i}")).collect();
        let tree = Tree {
            nodes: vec![
                TreeNode::Split { feature: 0, threshold: 0.5, gain: 1.0, left: 1, right: 2 },
                TreeNode::Leaf { weight: -2.0 },
                TreeNode::Leaf { weight: 2.0 },
            ],
        };
        let model = GbtClassifier::new(GbtConfig::default(), names, vec![tree]);
        let path = dir.join("gbt_model.json");
        model.save(&path).unwrap();
        path
    }

    /// A prediction batch: id column + 591 sensors, one row per first-sensor value.
    fn write_batch(dir: &Path, name: &str, first_sensor: &[&str]) {
        let mut text = String::new();
        let header: Vec<String> = (1..=SENSORS).map(|i| format!("Sensor-{i}")).collect();
        text.push_str(&format!(",{}\n", header.join(",")));
        for (row, v) in first_sensor.iter().enumerate() {
            let rest = vec!["0.5"; SENSORS - 1].join(",");
            text.push_str(&format!("Wafer-{row},{v},{rest}\n"));
        }
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }

    fn use_case(root: &Path, model: &Path) -> PredictUseCase {
        PredictUseCase::new(
            &Schema::new(8, 6, SENSORS + 2),
            root.join("prediction"),
            root.join("output").join("inference_results.csv"),
            model,
        )
        .unwrap()
    }

    fn read_output(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_end_to_end_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = save_model(dir.path());
        write_batch(
            &dir.path().join("prediction"),
            "wafer_13012020_090817.csv",
            &["1.0", "-3.0", "", "7.5", "NA"],
        );

        let uc = use_case(dir.path(), &model);
        let outcome = uc.run_inference();

        // Blank and "NA" readings become 0, which goes left (bad).
        assert_eq!(outcome, InferenceOutcome::success(LabelCounts { good: 2, bad: 3 }, vec![]));
        let lines = read_output(uc.output_file());
        assert_eq!(lines, vec!["good_bad", "1", "-1", "-1", "1", "-1"]);
    }

    #[test]
    fn test_counts_add_across_files_and_skip_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let model = save_model(dir.path());
        let pred = dir.path().join("prediction");
        write_batch(&pred, "a.csv", &["1", "1", "-1"]);
        write_batch(&pred, "b.csv", &["-1", "2"]);
        fs::write(pred.join("c.csv"), "id,Sensor-1\nWafer-1,1\n").unwrap();

        let outcome = use_case(dir.path(), &model).run_inference();

        assert_eq!(
            outcome,
            InferenceOutcome::success(LabelCounts { good: 3, bad: 2 }, vec!["c.csv".to_string()])
        );
        assert_eq!(outcome.counts().unwrap().total(), 5);
    }

    #[test]
    fn test_empty_directory_is_no_valid_files() {
        let dir = tempfile::tempdir().unwrap();
        let model = save_model(dir.path());
        fs::create_dir_all(dir.path().join("prediction")).unwrap();

        let uc = use_case(dir.path(), &model);
        let outcome = uc.run_inference();

        assert_eq!(outcome, InferenceOutcome::NoValidFiles { skipped_files: vec![] });
        assert!(!uc.output_file().exists());
    }

    #[test]
    fn test_missing_model_is_failure_not_zero_counts() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(&dir.path().join("prediction"), "a.csv", &["1"]);

        let outcome = use_case(dir.path(), &dir.path().join("nope.json")).run_inference();

        assert!(matches!(outcome, InferenceOutcome::Failure { .. }));
        assert_eq!(outcome.counts(), None);
    }

    #[test]
    fn test_missing_prediction_dir_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let model = save_model(dir.path());
        let outcome = use_case(dir.path(), &model).run_inference();
        assert!(matches!(outcome, InferenceOutcome::Failure { .. }));
    }

    #[test]
    fn test_output_is_replaced_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let model = save_model(dir.path());
        let pred = dir.path().join("prediction");
        write_batch(&pred, "a.csv", &["1", "1", "1"]);
        let uc = use_case(dir.path(), &model);
        assert!(uc.run_inference().is_success());

        fs::remove_file(pred.join("a.csv")).unwrap();
        write_batch(&pred, "b.csv", &["-1"]);
        assert!(uc.run_inference().is_success());

        assert_eq!(read_output(uc.output_file()), vec!["good_bad", "-1"]);
    }

    #[test]
    fn test_clear_inputs_keeps_request_workspaces() {
        let dir = tempfile::tempdir().unwrap();
        let model = save_model(dir.path());
        let pred_dir = dir.path().join("prediction");
        write_batch(&pred_dir, "a.csv", &["1"]);
        write_batch(&pred_dir.join("req-1").join("input"), "upload.csv", &["1"]);

        let uc = use_case(dir.path(), &model);
        assert_eq!(uc.clear_inputs().unwrap(), 1);

        assert!(!pred_dir.join("a.csv").exists());
        assert!(pred_dir.join("req-1").join("input").join("upload.csv").exists());
    }
}
