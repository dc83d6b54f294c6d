// ============================================================
// Layer 2 - Stage Failures
// ============================================================
// Every pipeline step either completes or reports which stage
// failed and why. Callers (CLI, HTTP handlers) decide whether a
// failure stops the process; the pipelines never panic or
// swallow errors silently.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Extract,
    Validate,
    Connect,
    Load,
    Push,
    Fetch,
    Split,
    Train,
    Evaluate,
    Persist,
    Register,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Download => "download",
            Stage::Extract  => "extract",
            Stage::Validate => "validate",
            Stage::Connect  => "connect",
            Stage::Load     => "load",
            Stage::Push     => "push",
            Stage::Fetch    => "fetch",
            Stage::Split    => "split",
            Stage::Train    => "train",
            Stage::Evaluate => "evaluate",
            Stage::Persist  => "persist",
            Stage::Register => "register",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {reason}")]
pub struct PipelineError {
    pub stage:  Stage,
    pub reason: String,
}

impl PipelineError {
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self { stage, reason: reason.into() }
    }
}

/// Tag any error with the stage it happened in.
pub trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T, E> StageContext<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| {
            let err: anyhow::Error = e.into();
            let failure = PipelineError::new(stage, format!("{err:#}"));
            tracing::error!("{}", failure);
            failure
        })
    }
}
