// ============================================================
// Layer 1 - HTTP Server
// ============================================================
// Minimal web front end for inference:
//
//   GET  /         upload page
//   POST /predict  multipart CSV upload -> good/bad counts
//   GET  /sample   download the sample batch file
//   GET  /health   liveness
//
// Every upload is scored in its own workspace directory, so two
// users predicting at the same time never share input files or
// output paths. Handlers get config and schema through
// AppState; there is no global session state.

mod handlers;
mod state;

pub use handlers::*;
pub use state::*;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::outcome::InferenceOutcome;

/// Uploads larger than this are rejected before they reach a handler.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

// ─── Response types ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success:    bool,
    pub data:       Option<T>,
    pub error:      Option<String>,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: &str) -> Self {
        Self {
            success:    true,
            data:       Some(data),
            error:      None,
            request_id: request_id.to_string(),
        }
    }

    pub fn error(message: &str, request_id: &str) -> Self {
        Self {
            success:    false,
            data:       None,
            error:      Some(message.to_string()),
            request_id: request_id.to_string(),
        }
    }

    /// A failed request that still carries a payload for the caller.
    pub fn rejected(data: T, message: &str, request_id: &str) -> Self {
        Self {
            success:    false,
            data:       Some(data),
            error:      Some(message.to_string()),
            request_id: request_id.to_string(),
        }
    }
}

/// Inference outcome plus the banner text the page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionSummary {
    #[serde(flatten)]
    pub outcome: InferenceOutcome,
    pub message: String,
}

impl From<InferenceOutcome> for PredictionSummary {
    fn from(outcome: InferenceOutcome) -> Self {
        let message = match &outcome {
            InferenceOutcome::Success { good_count, bad_count, .. } => {
                format!("Good wafers: {good_count}, Bad wafers: {bad_count}")
            }
            InferenceOutcome::NoValidFiles { .. } => {
                "The uploaded file does not have the expected number of columns".to_string()
            }
            InferenceOutcome::Failure { .. } => "Prediction failed, see server logs".to_string(),
        };
        Self { outcome, message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status:  String,
    pub version: String,
}

// ─── Router ──────────────────────────────────────────────────────────────────
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/sample", get(sample))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {addr}"))?;
    tracing::info!("Serving on http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .context("HTTP server stopped")?;
    Ok(())
}
