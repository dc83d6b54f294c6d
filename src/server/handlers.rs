// ============================================================
// Layer 1 - HTTP Handlers
// ============================================================
// Routes served by the UI:
//
//   GET  /         -> upload form (INDEX_HTML)
//   GET  /health   -> liveness + crate version
//   GET  /sample   -> the configured sample batch as a CSV download
//   POST /predict  -> multipart upload of one or more CSV batches
//
// A prediction request runs in its own workspace under prediction_dir:
//
//   1. read every multipart field into memory
//   2. on a blocking thread, store each file under its bare name
//      (names must be CSV, unique within the request)
//   3. run PredictUseCase over the workspace and map the outcome to
//      200 / 422 / 500; malformed requests are 400
//   4. the workspace is removed when the RequestWorkspace drops
use std::{collections::HashSet, path::Path};

use anyhow::{bail, Context, Result};
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::application::predict_use_case::PredictUseCase;
use crate::domain::outcome::InferenceOutcome;
use crate::server::{ApiResponse, AppState, HealthResponse, PredictionSummary, RequestWorkspace};

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Wafer Quality</title></head>
<body>
  <h1>Wafer Quality Prediction</h1>
  <form id="upload">
    <input type="file" name="file" accept=".csv" required>
    <button type="submit">Predict</button>
  </form>
  <p><a href="/sample">Download sample file</a></p>
  <p id="banner"></p>
  <script>
    document.getElementById("upload").addEventListener("submit", async (e) => {
      e.preventDefault();
      const banner = document.getElementById("banner");
      banner.textContent = "Running prediction...";
      const res = await fetch("/predict", { method: "POST", body: new FormData(e.target) });
      const body = await res.json();
      banner.textContent = body.data ? body.data.message : body.error;
    });
  </script>
</body>
</html>
"#;

/// One uploaded file, already read into memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes:     Vec<u8>,
}

fn request_id() -> String {
    format!("req-{:016x}", rand::random::<u64>())
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    let health = HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(health))
}

pub async fn sample(State(state): State<AppState>) -> Response {
    let Some(path) = state.config.sample_file.clone() else {
        return (StatusCode::NOT_FOUND, "no sample file configured").into_response();
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let name = crate::data::loader::file_name_of(&path);
            (
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\"")),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Sample file '{}' unavailable: {}", path.display(), e);
            (StatusCode::NOT_FOUND, "sample file not found").into_response()
        }
    }
}

pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<ApiResponse<PredictionSummary>>) {
    let req_id = request_id();

    let mut uploads = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => uploads.push(Upload { file_name, bytes: bytes.to_vec() }),
                    Err(e) => {
                        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(&e.to_string(), &req_id)))
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(&e.to_string(), &req_id)))
            }
        }
    }

    let job_id = req_id.clone();
    let result = tokio::task::spawn_blocking(move || predict_uploads(&state, &job_id, uploads)).await;

    match result {
        Ok(Ok(outcome)) => respond(outcome, &req_id),
        Ok(Err(e)) => {
            tracing::warn!("Rejected upload {}: {:#}", req_id, e);
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(&format!("{e:#}"), &req_id)))
        }
        Err(e) => {
            tracing::error!("Prediction task for {} panicked: {}", req_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("prediction task failed", &req_id)),
            )
        }
    }
}

fn respond(outcome: InferenceOutcome, req_id: &str) -> (StatusCode, Json<ApiResponse<PredictionSummary>>) {
    let summary = PredictionSummary::from(outcome);
    match summary.outcome {
        InferenceOutcome::Success { .. } => (StatusCode::OK, Json(ApiResponse::success(summary, req_id))),
        InferenceOutcome::NoValidFiles { .. } => {
            let message = summary.message.clone();
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiResponse::rejected(summary, &message, req_id)))
        }
        InferenceOutcome::Failure { ref reason } => {
            let reason = reason.clone();
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::rejected(summary, &reason, req_id)))
        }
    }
}

/// Score the uploads in a fresh workspace. Errors here are problems with
/// the request itself; scoring problems come back as an outcome.
pub fn predict_uploads(state: &AppState, req_id: &str, uploads: Vec<Upload>) -> Result<InferenceOutcome> {
    if uploads.is_empty() {
        bail!("no file uploaded");
    }

    let workspace = RequestWorkspace::create(&state.config.prediction_dir, req_id)
        .context("Cannot create request workspace")?;
    let mut seen = HashSet::new();
    for upload in uploads {
        let name = safe_csv_name(&upload.file_name)?;
        if !seen.insert(name.clone()) {
            bail!("'{name}' was uploaded more than once");
        }
        std::fs::write(workspace.input_dir().join(&name), &upload.bytes)
            .with_context(|| format!("Cannot store upload {name}"))?;
    }

    let use_case = PredictUseCase::new(
        &state.schema,
        workspace.input_dir(),
        workspace.output_file(),
        &state.config.load_model,
    )?;
    Ok(use_case.run_inference())
}

/// The final path component of an uploaded name, which must be a `.csv`.
fn safe_csv_name(raw: &str) -> Result<String> {
    let name = Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.starts_with('.') || !name.to_ascii_lowercase().ends_with(".csv") {
        bail!("'{raw}' is not a CSV file");
    }
    Ok(name.to_string())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::Schema;
    use crate::domain::traits::Persistable;
    use crate::infra::config::AppConfig;
    use crate::ml::model::{GbtClassifier, GbtConfig, Tree, TreeNode};
    use std::fs;

    fn state(root: &Path) -> AppState {
        let yaml = format!(
            "root_directory: {r}\nunzip_dir: {r}\ngood_data_folder: {r}/good\n\
             prediction_dir: {r}/prediction\noutput_dir: {r}/output\n\
             load_model: {r}/model/gbt_model.json\nsaved_model: {r}/model\n\
             sample_file: {r}/wafer_13012020_090817.csv\n",
            r = root.display()
        );
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();

        let tree = Tree {
            nodes: vec![
                TreeNode::Split { feature: 0, threshold: 0.5, gain: 1.0, left: 1, right: 2 },
                TreeNode::Leaf { weight: -2.0 },
                TreeNode::Leaf { weight: 2.0 },
            ],
        };
        GbtClassifier::new(GbtConfig::default(), vec!["sensor_1".into(), "sensor_2".into()], vec![tree])
            .save(&config.load_model)
            .unwrap();

        AppState::new(config, Schema::new(8, 6, 4))
    }

    fn upload(name: &str, body: &str) -> Upload {
        Upload { file_name: name.to_string(), bytes: body.as_bytes().to_vec() }
    }

    #[test]
    fn test_predict_uploads_counts_and_cleans_workspace() {
        let root = tempfile::tempdir().unwrap();
        let state = state(root.path());
        let body = ",Sensor-1,Sensor-2\nWafer-1,1,0\nWafer-2,0,0\nWafer-3,2,\n";

        let outcome = predict_uploads(&state, "req-1", vec![upload("batch.csv", body)]).unwrap();

        assert_eq!(outcome.counts().map(|c| (c.good, c.bad)), Some((2, 1)));
        assert!(!root.path().join("prediction").join("req-1").exists());
    }

    #[test]
    fn test_wrong_shape_upload_is_no_valid_files() {
        let root = tempfile::tempdir().unwrap();
        let state = state(root.path());
        let outcome =
            predict_uploads(&state, "req-2", vec![upload("batch.csv", "a,b\n1,2\n")]).unwrap();
        assert_eq!(
            outcome,
            InferenceOutcome::NoValidFiles { skipped_files: vec!["batch.csv".to_string()] }
        );
    }

    #[test]
    fn test_rejects_non_csv_and_path_tricks() {
        let root = tempfile::tempdir().unwrap();
        let state = state(root.path());
        assert!(predict_uploads(&state, "req-3", vec![upload("notes.txt", "x")]).is_err());
        assert!(predict_uploads(&state, "req-4", vec![]).is_err());
        assert_eq!(safe_csv_name("../../etc/a.csv").unwrap(), "a.csv");
        assert!(!root.path().join("prediction").join("req-3").exists());
    }

    #[test]
    fn test_duplicate_upload_names_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let state = state(root.path());
        let first = ",Sensor-1,Sensor-2\nWafer-1,1,0\nWafer-2,0,0\nWafer-3,2,1\n";
        let second = ",Sensor-1,Sensor-2\nWafer-4,0,0\n";

        let err = predict_uploads(
            &state,
            "req-5",
            vec![upload("batch.csv", first), upload("nested/batch.csv", second)],
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("more than once"));
        assert!(!root.path().join("prediction").join("req-5").exists());
    }

    #[test]
    fn test_distinct_upload_names_are_all_scored() {
        let root = tempfile::tempdir().unwrap();
        let state = state(root.path());
        let first = ",Sensor-1,Sensor-2\nWafer-1,1,0\nWafer-2,0,0\nWafer-3,2,1\n";
        let second = ",Sensor-1,Sensor-2\nWafer-4,0,0\n";

        let outcome = predict_uploads(
            &state,
            "req-6",
            vec![upload("batch.csv", first), upload("batch_2.csv", second)],
        )
        .unwrap();

        assert_eq!(outcome.counts().map(|c| c.total()), Some(4));
    }

    #[test]
    fn test_summary_messages() {
        let ok = PredictionSummary::from(InferenceOutcome::Success {
            good_count:    3,
            bad_count:     2,
            skipped_files: vec![],
        });
        assert_eq!(ok.message, "Good wafers: 3, Bad wafers: 2");

        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["good_count"], 3);

        let (status, _) = respond(InferenceOutcome::failure("model missing"), "req-5");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (status, _) = respond(InferenceOutcome::NoValidFiles { skipped_files: vec![] }, "req-6");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_health_and_sample() {
        let root = tempfile::tempdir().unwrap();
        let state = state(root.path());

        let (status, Json(health)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "healthy");

        let missing = sample(State(state.clone())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        fs::write(root.path().join("wafer_13012020_090817.csv"), ",Sensor-1\n").unwrap();
        let found = sample(State(state)).await;
        assert_eq!(found.status(), StatusCode::OK);
    }
}
