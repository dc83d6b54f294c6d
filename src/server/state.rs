// ============================================================
// Layer 1 - Server State + Request Workspaces
// ============================================================
// AppState is cloned into every handler and only read. Per-request
// files live in a RequestWorkspace so concurrent uploads never see
// each other's inputs or outputs, and `predict --cleanup` (which only
// touches top-level files of prediction_dir) never removes them.
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::domain::schema::Schema;
use crate::infra::config::AppConfig;

/// Read-only settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub schema: Arc<Schema>,
}

impl AppState {
    pub fn new(config: AppConfig, schema: Schema) -> Self {
        Self {
            config: Arc::new(config),
            schema: Arc::new(schema),
        }
    }
}

/// `<prediction_dir>/<request_id>/`, removed with everything in it
/// when the value is dropped, whether the request succeeded or not.
///
///   <request_id>/
///     input/                   <- uploaded CSV files
///     inference_results.csv    <- this request's output
pub struct RequestWorkspace {
    dir: PathBuf,
}

impl RequestWorkspace {
    pub fn create(prediction_dir: &Path, request_id: &str) -> io::Result<Self> {
        let dir = prediction_dir.join(request_id);
        fs::create_dir_all(dir.join("input"))?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.join("input")
    }

    pub fn output_file(&self) -> PathBuf {
        self.dir.join("inference_results.csv")
    }
}

impl Drop for RequestWorkspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            tracing::warn!("Cannot remove workspace '{}': {}", self.dir.display(), e);
        }
    }
}
