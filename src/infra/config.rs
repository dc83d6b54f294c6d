// ============================================================
// Layer 6 - Configuration
// ============================================================
// Three inputs, loaded once per run and never mutated:
//
//   config/config.yml          -> AppConfig (folders, URLs, model paths)
//   config/schema_training.json -> Schema (file-name + column layout)
//   config/.env                 -> Credentials (feature store access)
//
// Any failure here is fatal: the pipelines cannot run without them.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::schema::Schema;

pub const API_KEY_VAR: &str      = "FS_API_KEY";
pub const PROJECT_NAME_VAR: &str = "FS_PROJECT_NAME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML in '{path}': {source}")]
    Yaml {
        path:   PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path:   PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid env file '{path}': {source}")]
    EnvFile {
        path:   PathBuf,
        source: dotenvy::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing credential '{0}' (set it in the environment or the .env file)")]
    MissingCredential(&'static str),
}

// ─── AppConfig ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub root_directory:   PathBuf,
    #[serde(default)]
    pub source_url:       String,
    pub unzip_dir:        PathBuf,
    pub good_data_folder: PathBuf,
    #[serde(default)]
    pub bad_data_folder:  Option<PathBuf>,
    pub prediction_dir:   PathBuf,
    pub output_dir:       PathBuf,
    /// Model artifact read by inference
    pub load_model:       PathBuf,
    /// Directory training writes the artifact into
    pub saved_model:      PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir:            PathBuf,
    #[serde(default)]
    pub feature_store_dir:  Option<PathBuf>,
    #[serde(default)]
    pub model_registry_dir: Option<PathBuf>,
    #[serde(default)]
    pub sample_file:        Option<PathBuf>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let cfg: AppConfig = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        tracing::debug!("Loaded configuration from '{}'", path.display());
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("root_directory", &self.root_directory),
            ("unzip_dir", &self.unzip_dir),
            ("good_data_folder", &self.good_data_folder),
            ("prediction_dir", &self.prediction_dir),
            ("output_dir", &self.output_dir),
            ("load_model", &self.load_model),
            ("saved_model", &self.saved_model),
        ];
        for (key, value) in required {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("'{key}' must not be empty")));
            }
        }
        Ok(())
    }

    pub fn bad_data_folder(&self) -> PathBuf {
        self.bad_data_folder
            .clone()
            .unwrap_or_else(|| self.root_directory.join("training_data").join("bad"))
    }

    /// Directory holding the raw training batches after ingestion
    pub fn training_batch_dir(&self) -> PathBuf {
        self.unzip_dir.join("Training_Batch_Files")
    }

    pub fn feature_store_dir(&self) -> PathBuf {
        self.feature_store_dir
            .clone()
            .unwrap_or_else(|| self.root_directory.join("feature_store"))
    }

    pub fn model_registry_dir(&self) -> PathBuf {
        self.model_registry_dir
            .clone()
            .unwrap_or_else(|| self.root_directory.join("model_registry"))
    }

    /// Fixed path of the inference results file
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join("inference_results.csv")
    }
}

// ─── Schema ──────────────────────────────────────────────────────────────────
pub fn load_schema(path: &Path) -> Result<Schema, ConfigError> {
    let text = read(path)?;
    let schema: Schema = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if schema.number_of_columns < 2 {
        return Err(ConfigError::Invalid(format!(
            "NumberofColumns must be at least 2, got {}",
            schema.number_of_columns
        )));
    }
    Ok(schema)
}

// ─── Credentials ─────────────────────────────────────────────────────────────
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key:      String,
    pub project_name: String,
}

// Keep the key out of log lines.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("project_name", &self.project_name)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from `env_file` (if it exists), letting process
    /// environment variables take precedence.
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        let mut vars = if env_file.exists() {
            parse_env_file(&read(env_file)?).map_err(|source| ConfigError::EnvFile {
                path: env_file.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!("No env file at '{}'", env_file.display());
            HashMap::new()
        };
        for key in [API_KEY_VAR, PROJECT_NAME_VAR] {
            if let Ok(v) = std::env::var(key) {
                vars.insert(key.to_string(), v);
            }
        }
        Self::from_vars(&vars)
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| {
            vars.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or(ConfigError::MissingCredential(key))
        };
        Ok(Self {
            api_key:      get(API_KEY_VAR)?,
            project_name: get(PROJECT_NAME_VAR)?,
        })
    }
}

/// Parse `.env` text with python-dotenv rules: `#` comments (inline ones
/// too), optional `export ` prefix, single/double quotes and escapes.
/// A malformed line fails the whole file.
pub fn parse_env_file(text: &str) -> Result<HashMap<String, String>, dotenvy::Error> {
    dotenvy::from_read_iter(text.as_bytes()).collect()
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "\
root_directory: artifacts
source_url: https://example.com/data.zip
unzip_dir: artifacts/data
good_data_folder: artifacts/training_data/good
prediction_dir: artifacts/prediction_data
output_dir: artifacts/output
load_model: artifacts/model/gbt_model.json
saved_model: artifacts/model
";

    #[test]
    fn test_loads_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, YAML).unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.log_dir, PathBuf::from("logs"));
        assert_eq!(cfg.bad_data_folder(), PathBuf::from("artifacts/training_data/bad"));
        assert_eq!(
            cfg.training_batch_dir(),
            PathBuf::from("artifacts/data/Training_Batch_Files")
        );
        assert_eq!(
            cfg.output_file(),
            PathBuf::from("artifacts/output/inference_results.csv")
        );
    }

    #[test]
    fn test_missing_key_is_yaml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "root_directory: artifacts\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = AppConfig::load(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_schema_rejects_tiny_column_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(
            &path,
            r#"{"SampleFileName":"wafer_00_00.csv","LengthOfDateStampInFile":2,
                "LengthOfTimeStampInFile":2,"NumberofColumns":1}"#,
        )
        .unwrap();
        assert!(matches!(load_schema(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_env_file() {
        let vars = parse_env_file(
            "# feature store\nFS_API_KEY=\"abc123\"\nexport FS_PROJECT_NAME='wafer'\n\n",
        )
        .unwrap();
        assert_eq!(vars.get("FS_API_KEY").map(String::as_str), Some("abc123"));
        assert_eq!(vars.get("FS_PROJECT_NAME").map(String::as_str), Some("wafer"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_parse_env_file_inline_comments_and_escapes() {
        let vars = parse_env_file(
            "FS_API_KEY=abc123 # rotated monthly\nFS_PROJECT_NAME=\"wafer \\\"line 2\\\"\"\n",
        )
        .unwrap();
        assert_eq!(vars.get("FS_API_KEY").map(String::as_str), Some("abc123"));
        assert_eq!(vars.get("FS_PROJECT_NAME").map(String::as_str), Some("wafer \"line 2\""));
    }

    #[test]
    fn test_malformed_env_file_is_error() {
        assert!(parse_env_file("FS_API_KEY=abc\nBROKEN\n").is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "BROKEN\n").unwrap();
        assert!(matches!(Credentials::load(&path), Err(ConfigError::EnvFile { .. })));
    }

    #[test]
    fn test_credentials_require_both_values() {
        let mut vars = HashMap::new();
        vars.insert(API_KEY_VAR.to_string(), "k".to_string());
        assert!(matches!(
            Credentials::from_vars(&vars),
            Err(ConfigError::MissingCredential(PROJECT_NAME_VAR))
        ));

        vars.insert(PROJECT_NAME_VAR.to_string(), "p".to_string());
        let creds = Credentials::from_vars(&vars).unwrap();
        assert_eq!(creds.project_name, "p");
        let shown = format!("{creds:?}");
        assert!(shown.contains("***"));
        assert!(!shown.contains("\"k\""));
    }

    #[test]
    fn test_shipped_config_files_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let cfg = AppConfig::load(&root.join("config.yml")).unwrap();
        assert_eq!(cfg.output_file(), PathBuf::from("artifacts/inference_output/inference_results.csv"));
        let schema = load_schema(&root.join("schema_training.json")).unwrap();
        assert_eq!(schema.prediction_columns(), 592);
    }
}
