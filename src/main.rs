mod application;
mod cli;
mod data;
mod domain;
mod infra;
mod ml;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use infra::config::AppConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = AppConfig::load(&cli.common.config)
        .with_context(|| format!("Cannot start with config '{}'", cli.common.config.display()))?;

    let console_level = if cli.common.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::ERROR
    };
    // Flushes the file log on exit; keep it alive for the whole run.
    let _guard = infra::logging::init(&cfg.log_dir, console_level)?;

    cli.run(cfg)
}
