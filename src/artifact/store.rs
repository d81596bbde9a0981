//! Filesystem-backed artifact store

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::envelope::SerializedObject;
use crate::error::{PipelineError, Result};

/// How a save treats an already existing target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace the file (idempotent re-runs)
    #[default]
    Overwrite,
    /// Refuse to replace an existing file
    NoClobber,
}

/// Saves and loads typed artifacts.
///
/// All failures are reported as [`PipelineError::Persistence`] carrying the
/// offending path.
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    mode: WriteMode,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Write a table as CSV with a header row.
    pub fn save_table(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = self.create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PipelineError::persistence(path, e))?;
        debug!(path = %path.display(), rows = df.height(), "saved table");
        Ok(())
    }

    /// Read a CSV table with a header row.
    pub fn load_table(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(PipelineError::persistence(path, "file does not exist"));
        }
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| PipelineError::persistence(path, e))
    }

    /// Write a numeric matrix.
    pub fn save_array(&self, array: &Array2<f64>, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(array).map_err(|e| PipelineError::persistence(path, e))?;
        self.write_bytes(&bytes, path)?;
        debug!(path = %path.display(), shape = ?array.dim(), "saved array");
        Ok(())
    }

    pub fn load_array(&self, path: &Path) -> Result<Array2<f64>> {
        let bytes = self.read_bytes(path)?;
        bincode::deserialize(&bytes).map_err(|e| PipelineError::persistence(path, e))
    }

    /// Serialize an object into a checksummed envelope.
    pub fn save_object<T: Serialize>(&self, object: &T, path: &Path) -> Result<()> {
        let payload = bincode::serialize(object).map_err(|e| PipelineError::persistence(path, e))?;
        let envelope = SerializedObject::new(std::any::type_name::<T>(), payload);
        let bytes =
            bincode::serialize(&envelope).map_err(|e| PipelineError::persistence(path, e))?;
        self.write_bytes(&bytes, path)?;
        debug!(path = %path.display(), type_name = %envelope.type_name, "saved object");
        Ok(())
    }

    pub fn load_object<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = self.read_bytes(path)?;
        let envelope: SerializedObject =
            bincode::deserialize(&bytes).map_err(|e| PipelineError::persistence(path, e))?;
        envelope
            .verify()
            .map_err(|e| PipelineError::persistence(path, e))?;
        bincode::deserialize(&envelope.payload).map_err(|e| PipelineError::persistence(path, e))
    }

    /// Write a structured report as YAML.
    pub fn save_report<T: Serialize>(&self, report: &T, path: &Path) -> Result<()> {
        let file = self.create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), report)
            .map_err(|e| PipelineError::persistence(path, e))?;
        debug!(path = %path.display(), "saved report");
        Ok(())
    }

    pub fn load_report<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        let file = File::open(path).map_err(|e| PipelineError::persistence(path, e))?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| PipelineError::persistence(path, e))
    }

    /// Copy a persisted artifact to another location, honouring the write mode.
    pub fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let bytes = self.read_bytes(from)?;
        self.write_bytes(&bytes, to)
    }

    fn write_bytes(&self, bytes: &[u8], path: &Path) -> Result<()> {
        let file = self.create(path)?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| PipelineError::persistence(path, e))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path).map_err(|e| PipelineError::persistence(path, e))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| PipelineError::persistence(path, e))?;
        Ok(bytes)
    }

    fn create(&self, path: &Path) -> Result<File> {
        if self.mode == WriteMode::NoClobber && path.exists() {
            return Err(PipelineError::persistence(
                path,
                "refusing to overwrite existing file",
            ));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::persistence(parent, e))?;
            }
        }
        File::create(path).map_err(|e| PipelineError::persistence(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        name: String,
        weights: Vec<f64>,
    }

    #[test]
    fn test_table_roundtrip_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/train.csv");
        let store = ArtifactStore::new();

        let mut df = df! {
            "x" => [1i64, 2, 3],
            "Result" => [-1i64, 1, 1],
        }
        .unwrap();
        store.save_table(&mut df, &path).unwrap();

        let loaded = store.load_table(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
        assert_eq!(loaded.get_column_names(), df.get_column_names());
    }

    #[test]
    fn test_array_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("train.npy");
        let store = ArtifactStore::new();

        let a = array![[1.0, 2.0], [3.0, 4.0]];
        store.save_array(&a, &path).unwrap();
        assert_eq!(store.load_array(&path).unwrap(), a);
    }

    #[test]
    fn test_object_roundtrip_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("obj.bin");
        let store = ArtifactStore::new();

        let obj = Dummy {
            name: "imputer".to_string(),
            weights: vec![0.1, f64::MIN_POSITIVE, 3.5],
        };
        store.save_object(&obj, &path).unwrap();
        let loaded: Dummy = store.load_object(&path).unwrap();

        assert_eq!(loaded, obj);
        assert_eq!(
            bincode::serialize(&loaded).unwrap(),
            bincode::serialize(&obj).unwrap()
        );
    }

    #[test]
    fn test_corrupt_object_is_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("obj.bin");
        fs::write(&path, b"garbage").unwrap();

        let err = ArtifactStore::new().load_object::<Dummy>(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { .. }));
        assert!(err.to_string().contains("obj.bin"));
    }

    #[test]
    fn test_report_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.yaml");
        let store = ArtifactStore::new();

        let mut report = BTreeMap::new();
        report.insert("having_IP_Address".to_string(), 0.42);
        store.save_report(&report, &path).unwrap();

        let loaded: BTreeMap<String, f64> = store.load_report(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_no_clobber_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.yaml");
        fs::write(&path, "old").unwrap();

        let store = ArtifactStore::new().with_mode(WriteMode::NoClobber);
        let err = store.save_report(&1u32, &path).unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_overwrite_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.yaml");
        fs::write(&path, "old").unwrap();

        ArtifactStore::new().save_report(&7u32, &path).unwrap();
        let loaded: u32 = ArtifactStore::new().load_report(&path).unwrap();
        assert_eq!(loaded, 7);
    }

    #[test]
    fn test_missing_table_names_path() {
        let err = ArtifactStore::new()
            .load_table(Path::new("/nonexistent/dir/train.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/train.csv"));
    }
}
