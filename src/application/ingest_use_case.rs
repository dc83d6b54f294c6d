// ============================================================
// Layer 2 - IngestUseCase
// ============================================================
// Fetches the raw training batches:
//
//   Step 1: download <source_url> to <root_directory>/data.zip
//   Step 2: extract the archive into <root_directory>
//   Step 3: delete the archive
//
// The archive is expected to contain Training_Batch_Files/,
// which the validation step reads next.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};

use crate::application::stage::{PipelineError, Stage, StageContext};

const ARCHIVE_NAME: &str = "data.zip";

pub struct IngestUseCase {
    source_url: String,
    root_dir:   PathBuf,
}

impl IngestUseCase {
    pub fn new(source_url: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            root_dir:   root_dir.into(),
        }
    }

    /// Run the whole ingestion, returning the number of extracted entries.
    pub fn execute(&self) -> Result<usize, PipelineError> {
        fs::create_dir_all(&self.root_dir).stage(Stage::Download)?;
        let archive = self.root_dir.join(ARCHIVE_NAME);

        tracing::info!("Downloading data from {}...", self.source_url);
        download(&self.source_url, &archive).stage(Stage::Download)?;
        tracing::info!("Data download complete.");

        tracing::info!("Unzipping the data...");
        let entries = extract(&archive, &self.root_dir).stage(Stage::Extract)?;
        fs::remove_file(&archive).stage(Stage::Extract)?;
        tracing::info!("Data unzipping complete ({} entries).", entries);

        Ok(entries)
    }
}

fn download(url: &str, dest: &Path) -> Result<()> {
    if url.trim().is_empty() {
        bail!("source_url is not configured");
    }
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request to {url} failed"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Failed to download data. Status code: {}", status.as_u16());
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(dest)
        .with_context(|| format!("Cannot create '{}'", dest.display()))?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Extract every entry of `archive` under `dest`.
pub fn extract(archive: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::open(archive)
        .with_context(|| format!("Zip file does not exist: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a zip archive", archive.display()))?;
    let entries = zip.len();
    zip.extract(dest)
        .with_context(|| format!("Cannot extract into '{}'", dest.display()))?;
    Ok(entries)
}
