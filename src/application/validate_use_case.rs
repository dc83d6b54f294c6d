// ============================================================
// Layer 2 - ValidateUseCase
// ============================================================
// One validate-and-route pass over the training batch folder:
//
//   for each file (sorted by name):
//     name check   ─┐
//     column check ─┴─> good folder | bad folder (+ reason)
//
// A file that cannot be parsed counts as invalid and goes to
// the bad folder; it never aborts the pass. A file that cannot
// be moved (name collision, failed copy verification) stays
// where it is and is listed under `conflicts`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::stage::{PipelineError, Stage, StageContext};
use crate::data::{
    loader::{file_name_of, list_files},
    router::FileRouter,
    validator::BatchValidator,
};
use crate::domain::outcome::ValidationReport;
use crate::domain::schema::Schema;

pub struct ValidateUseCase {
    source_dir: PathBuf,
    validator:  BatchValidator,
    router:     FileRouter,
}

impl ValidateUseCase {
    pub fn new(
        schema:     &Schema,
        source_dir: impl Into<PathBuf>,
        good_dir:   impl Into<PathBuf>,
        bad_dir:    impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            source_dir: source_dir.into(),
            validator:  BatchValidator::new(schema)?,
            router:     FileRouter::new(good_dir, bad_dir)
                .context("Cannot create good/bad data folders")?,
        })
    }

    pub fn execute(&self) -> Result<ValidationReport, PipelineError> {
        let files = list_files(&self.source_dir).stage(Stage::Validate)?;
        tracing::info!(
            "Validating {} file(s) in '{}'",
            files.len(),
            self.source_dir.display()
        );

        let mut report = ValidationReport::default();
        for path in files {
            let name = file_name_of(&path);
            match self.validator.validate_training_file(&path) {
                Ok(()) => match self.router.to_good(&path) {
                    Ok(_) => {
                        tracing::info!("File {} moved to good data folder.", name);
                        report.good.push(name);
                    }
                    Err(e) => {
                        tracing::error!("Error moving file {} to good data folder: {}", name, e);
                        report.conflicts.push((name, e.to_string()));
                    }
                },
                Err(reason) => match self.router.to_bad(&path) {
                    Ok(_) => {
                        tracing::info!("File {} moved to bad data folder due to {}.", name, reason);
                        report.bad.push((name, reason));
                    }
                    Err(e) => {
                        tracing::error!(
                            "Error moving file {} to bad data folder ({}): {}",
                            name,
                            reason,
                            e
                        );
                        report.conflicts.push((name, e.to_string()));
                    }
                },
            }
        }

        tracing::info!(
            "Validation finished: {} good, {} bad, {} not moved",
            report.good.len(),
            report.bad.len(),
            report.conflicts.len()
        );
        Ok(report)
    }
}
