// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// One subcommand per pipeline, plus `serve` for the web UI and
// `run-all` for the full training flow.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string -> usize, f64, PathBuf, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::GbtConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and unzip the raw training batches
    Ingest,

    /// Check batch file names and columns, move them to good/bad folders
    Validate(ValidateArgs),

    /// Push new good batches to the feature store
    Load,

    /// Train the classifier on the feature store and register it
    Train(TrainArgs),

    /// Score every file in the prediction directory
    Predict(PredictArgs),

    /// Run the upload/predict web page
    Serve(ServeArgs),

    /// ingest -> validate -> load -> train, stopping at the first failure
    RunAll(TrainArgs),
}

/// Paths shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Application config (YAML)
    #[arg(long, global = true, default_value = "config/config.yml")]
    pub config: PathBuf,

    /// Batch file schema (JSON)
    #[arg(long, global = true, default_value = "config/schema_training.json")]
    pub schema: PathBuf,

    /// KEY=VALUE file with FS_API_KEY and FS_PROJECT_NAME
    #[arg(long, global = true, default_value = "config/.env")]
    pub env_file: PathBuf,

    /// Also print INFO logs to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Folder to validate instead of <unzip_dir>/Training_Batch_Files
    #[arg(long)]
    pub source_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Number of boosting rounds
    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    /// Shrinkage applied to every tree
    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 3)]
    pub max_depth: usize,

    /// Share of rows held out for evaluation
    #[arg(long, default_value_t = 0.3)]
    pub test_fraction: f64,

    /// Seed of the train/test shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            gbt: GbtConfig {
                n_estimators:  a.n_estimators,
                learning_rate: a.learning_rate,
                max_depth:     a.max_depth,
                ..GbtConfig::default()
            },
            test_fraction: a.test_fraction,
            seed:          a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Delete the scored batch files after a successful run
    #[arg(long)]
    pub cleanup: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub addr: SocketAddr,
}
