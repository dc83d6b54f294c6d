// ============================================================
// Layer 6 - Local Feature Store
// ============================================================
// File-backed implementation of the FeatureStore trait. One
// feature group per project, stored as CSV:
//
//   <feature_store_dir>/<project>/wafer_project_v1.csv
//   wafer_num,sensor_1,...,sensor_590,good_bad
//
// `push` is an upsert keyed on wafer_num (the primary key):
// rows with a known id replace the stored row in place, new ids
// are appended. Missing readings are written as empty cells and
// read back as NaN.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

use crate::data::preprocessor::parse_reading;
use crate::domain::dataset::{Label, LabeledDataset, ID_COLUMN, LABEL_COLUMN};
use crate::domain::traits::FeatureStore;
use crate::infra::config::Credentials;

pub const FEATURE_GROUP: &str = "wafer_project";
pub const FEATURE_GROUP_VERSION: u32 = 1;

pub struct LocalFeatureStore {
    path: PathBuf,
}

impl LocalFeatureStore {
    pub fn connect(root: &Path, credentials: &Credentials) -> Result<Self> {
        let dir = root.join(&credentials.project_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create feature store '{}'", dir.display()))?;
        let path = dir.join(format!("{FEATURE_GROUP}_v{FEATURE_GROUP_VERSION}.csv"));
        tracing::info!(
            "Connected to feature store for project '{}' at '{}'",
            credentials.project_name,
            dir.display()
        );
        Ok(Self { path })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, dataset: &LabeledDataset) -> Result<()> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = WriterBuilder::new().from_path(&tmp)?;
            let mut header = vec![ID_COLUMN.to_string()];
            header.extend(dataset.feature_names.iter().cloned());
            header.push(LABEL_COLUMN.to_string());
            writer.write_record(&header)?;

            for ((id, row), label) in dataset.ids.iter().zip(&dataset.features).zip(&dataset.labels) {
                let mut record = Vec::with_capacity(row.len() + 2);
                record.push(id.clone());
                record.extend(row.iter().map(|v| if v.is_nan() { String::new() } else { v.to_string() }));
                record.push(label.value().to_string());
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read(&self) -> Result<LabeledDataset> {
        let mut reader = ReaderBuilder::new()
            .from_path(&self.path)
            .with_context(|| format!("Feature group '{}' does not exist", self.path.display()))?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if headers.first().map(String::as_str) != Some(ID_COLUMN)
            || headers.last().map(String::as_str) != Some(LABEL_COLUMN)
            || headers.len() < 2
        {
            bail!("'{}' is not a {FEATURE_GROUP} feature group", self.path.display());
        }
        let n = headers.len();
        let mut dataset = LabeledDataset::new(headers[1..n - 1].to_vec());

        for record in reader.records() {
            let record = record?;
            let label = match Label::parse(&record[n - 1]) {
                Some(label) => label,
                None => bail!("stored label {:?} is not +1 or -1", &record[n - 1]),
            };
            let features = (1..n - 1).map(|i| parse_reading(&record[i])).collect();
            dataset.push_row(&record[0], features, label);
        }
        Ok(dataset)
    }
}

impl FeatureStore for LocalFeatureStore {
    fn push(&self, dataset: &LabeledDataset) -> Result<()> {
        let mut stored = if self.path.exists() {
            self.read()?
        } else {
            LabeledDataset::new(dataset.feature_names.clone())
        };
        if !stored.is_empty() && stored.feature_names != dataset.feature_names {
            bail!(
                "feature group schema mismatch: stored {} features, incoming {}",
                stored.n_features(),
                dataset.n_features()
            );
        }
        stored.feature_names = dataset.feature_names.clone();

        let mut index: HashMap<String, usize> = stored
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let (mut inserted, mut updated) = (0usize, 0usize);
        for i in 0..dataset.len() {
            let id = &dataset.ids[i];
            match index.get(id) {
                Some(&pos) => {
                    stored.features[pos] = dataset.features[i].clone();
                    stored.labels[pos] = dataset.labels[i];
                    updated += 1;
                }
                None => {
                    index.insert(id.clone(), stored.len());
                    stored.push_row(id.clone(), dataset.features[i].clone(), dataset.labels[i]);
                    inserted += 1;
                }
            }
        }

        self.write(&stored)?;
        tracing::info!(
            "Feature group {}: {} row(s) inserted, {} updated, {} total",
            FEATURE_GROUP,
            inserted,
            updated,
            stored.len()
        );
        Ok(())
    }

    fn fetch(&self) -> Result<LabeledDataset> {
        let dataset = self.read()?;
        tracing::info!(
            "Fetched {} rows x {} features from feature group {}",
            dataset.len(),
            dataset.n_features(),
            FEATURE_GROUP
        );
        Ok(dataset)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials { api_key: "key".into(), project_name: "wafer".into() }
    }

    fn dataset(rows: &[(&str, f64, Label)]) -> LabeledDataset {
        let mut ds = LabeledDataset::new(vec!["sensor_1".into()]);
        for (id, v, label) in rows {
            ds.push_row(*id, vec![*v], *label);
        }
        ds
    }

    #[test]
    fn test_fetch_before_push_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::connect(dir.path(), &creds()).unwrap();
        assert!(store.fetch().is_err());
    }

    #[test]
    fn test_push_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::connect(dir.path(), &creds()).unwrap();
        let ds = dataset(&[("w1", 1.5, Label::Good), ("w2", f64::NAN, Label::Bad)]);
        store.push(&ds).unwrap();

        let fetched = store.fetch().unwrap();
        assert_eq!(fetched.ids, vec!["w1", "w2"]);
        assert_eq!(fetched.feature_names, vec!["sensor_1"]);
        assert_eq!(fetched.features[0], vec![1.5]);
        assert!(fetched.features[1][0].is_nan());
        assert_eq!(fetched.labels, vec![Label::Good, Label::Bad]);
        assert!(store.path().ends_with("wafer/wafer_project_v1.csv"));
    }

    #[test]
    fn test_push_upserts_on_wafer_num() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::connect(dir.path(), &creds()).unwrap();
        store.push(&dataset(&[("w1", 1.0, Label::Good), ("w2", 2.0, Label::Good)])).unwrap();
        store.push(&dataset(&[("w2", 9.0, Label::Bad), ("w3", 3.0, Label::Good)])).unwrap();

        let fetched = store.fetch().unwrap();
        assert_eq!(fetched.ids, vec!["w1", "w2", "w3"]);
        assert_eq!(fetched.features[1], vec![9.0]);
        assert_eq!(fetched.labels[1], Label::Bad);
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFeatureStore::connect(dir.path(), &creds()).unwrap();
        store.push(&dataset(&[("w1", 1.0, Label::Good)])).unwrap();

        let mut other = LabeledDataset::new(vec!["sensor_1".into(), "sensor_2".into()]);
        other.push_row("w9", vec![1.0, 2.0], Label::Bad);
        assert!(store.push(&other).is_err());
        assert_eq!(store.fetch().unwrap().len(), 1);
    }
}
