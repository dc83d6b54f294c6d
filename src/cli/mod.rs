// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands each subcommand to its Layer 2 use case.
//
//   ingest | validate | load | train | predict | serve | run-all
//
// Results are printed here; the use cases only log.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::application::{
    ingest_use_case::IngestUseCase,
    load_use_case::LoadUseCase,
    predict_use_case::PredictUseCase,
    stage::{PipelineError, Stage, StageContext},
    train_use_case::{TrainConfig, TrainUseCase},
    validate_use_case::ValidateUseCase,
};
use crate::domain::outcome::InferenceOutcome;
use crate::domain::schema::Schema;
use crate::infra::{
    checkpoint::CheckpointManager,
    config::{load_schema, AppConfig, Credentials},
    feature_store::LocalFeatureStore,
    model_registry::LocalModelRegistry,
};
use commands::{Commands, CommonArgs, PredictArgs, ServeArgs, TrainArgs, ValidateArgs};

#[derive(Parser, Debug)]
#[command(
    name = "wafer-quality",
    version,
    about = "Validate, load and train on wafer sensor batches, then predict good/bad wafers."
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch the subcommand. The config is loaded once by main and
    /// stays immutable for the run.
    pub fn run(self, cfg: AppConfig) -> Result<()> {
        match &self.command {
            Commands::Ingest            => self.run_ingest(&cfg),
            Commands::Validate(args)    => self.run_validate(&cfg, args),
            Commands::Load              => self.run_load(&cfg),
            Commands::Train(args)       => self.run_train(&cfg, args),
            Commands::Predict(args)     => self.run_predict(&cfg, args),
            Commands::Serve(args)       => self.run_serve(cfg, args),
            Commands::RunAll(args)      => self.run_all(&cfg, args),
        }
    }

    fn schema(&self) -> Result<Schema> {
        load_schema(&self.common.schema).context("Cannot load batch schema")
    }

    fn credentials(&self) -> Result<Credentials, PipelineError> {
        Credentials::load(&self.common.env_file).stage(Stage::Connect)
    }

    fn run_ingest(&self, cfg: &AppConfig) -> Result<()> {
        let entries = IngestUseCase::new(&cfg.source_url, &cfg.root_directory).execute()?;
        println!("Ingestion complete: {} entries extracted to '{}'.", entries, cfg.root_directory.display());
        Ok(())
    }

    fn run_validate(&self, cfg: &AppConfig, args: &ValidateArgs) -> Result<()> {
        let source = args.source_dir.clone().unwrap_or_else(|| cfg.training_batch_dir());
        let use_case = ValidateUseCase::new(
            &self.schema()?,
            source,
            &cfg.good_data_folder,
            cfg.bad_data_folder(),
        )?;
        let report = use_case.execute()?;

        println!(
            "Validation complete for {} file(s): {} good, {} bad, {} not moved.",
            report.processed(),
            report.good.len(),
            report.bad.len(),
            report.conflicts.len()
        );
        for (name, reason) in &report.bad {
            println!("  bad      {name}: {reason}");
        }
        for (name, error) in &report.conflicts {
            println!("  conflict {name}: {error}");
        }
        Ok(())
    }

    fn run_load(&self, cfg: &AppConfig) -> Result<()> {
        let creds = self.credentials()?;
        let store = LocalFeatureStore::connect(&cfg.feature_store_dir(), &creds).stage(Stage::Connect)?;
        let report = LoadUseCase::new(&cfg.good_data_folder, store).execute()?;

        if report.files.is_empty() {
            println!("No new data files to load.");
        } else {
            println!("Loaded {} rows from {} file(s) into the feature store.", report.rows, report.files.len());
        }
        Ok(())
    }

    fn run_train(&self, cfg: &AppConfig, args: &TrainArgs) -> Result<()> {
        let creds = self.credentials()?;
        let store = LocalFeatureStore::connect(&cfg.feature_store_dir(), &creds).stage(Stage::Connect)?;
        let registry = LocalModelRegistry::open(&cfg.model_registry_dir()).stage(Stage::Connect)?;
        let checkpoints = CheckpointManager::new(&cfg.saved_model).stage(Stage::Persist)?;

        let train_cfg: TrainConfig = args.clone().into();
        let report = TrainUseCase::new(store, registry, checkpoints, train_cfg).execute()?;

        println!("Accuracy of the model: {}%", report.metrics.accuracy_percent());
        println!("F1 score: {:.4}", report.metrics.f1);
        println!(
            "Model saved to '{}' and registered as '{}' v{}.",
            report.model_path.display(),
            report.registered.name,
            report.registered.version
        );
        Ok(())
    }

    fn run_predict(&self, cfg: &AppConfig, args: &PredictArgs) -> Result<()> {
        let use_case = PredictUseCase::new(
            &self.schema()?,
            &cfg.prediction_dir,
            cfg.output_file(),
            &cfg.load_model,
        )?;

        match use_case.run_inference() {
            InferenceOutcome::Success { good_count, bad_count, skipped_files } => {
                println!("Good wafers: {good_count}");
                println!("Bad wafers:  {bad_count}");
                for name in &skipped_files {
                    println!("  skipped {name}");
                }
                println!("Results written to '{}'.", use_case.output_file().display());
                if args.cleanup {
                    let removed = use_case.clear_inputs()?;
                    println!("Removed {removed} input file(s).");
                }
                Ok(())
            }
            InferenceOutcome::NoValidFiles { skipped_files } => {
                println!("No valid prediction files ({} rejected).", skipped_files.len());
                Ok(())
            }
            InferenceOutcome::Failure { reason } => bail!("Inference failed: {reason}"),
        }
    }

    fn run_serve(&self, cfg: AppConfig, args: &ServeArgs) -> Result<()> {
        let state = crate::server::AppState::new(cfg, self.schema()?);
        let runtime = tokio::runtime::Runtime::new().context("Cannot start async runtime")?;
        println!("Serving on http://{}", args.addr);
        runtime.block_on(crate::server::serve(args.addr, state))
    }

    fn run_all(&self, cfg: &AppConfig, args: &TrainArgs) -> Result<()> {
        self.run_ingest(cfg)?;
        self.run_validate(cfg, &ValidateArgs { source_dir: None })?;
        self.run_load(cfg)?;
        self.run_train(cfg, args)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wafer-quality",
            "predict",
            "--cleanup",
            "--config",
            "other.yml",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.common.config, std::path::PathBuf::from("other.yml"));
        assert!(cli.common.verbose);
        assert!(matches!(cli.command, Commands::Predict(PredictArgs { cleanup: true })));
    }

    #[test]
    fn test_train_defaults_match_classifier_defaults() {
        let cli = Cli::try_parse_from(["wafer-quality", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_run_all_is_kebab_case() {
        let cli = Cli::try_parse_from(["wafer-quality", "run-all", "--n-estimators", "10"]).unwrap();
        let Commands::RunAll(args) = cli.command else { panic!("expected run-all") };
        assert_eq!(args.n_estimators, 10);
    }
}
