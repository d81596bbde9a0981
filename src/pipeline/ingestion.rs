//! Data ingestion stage
//!
//! Pulls records from a [`DataSource`] and lands a train and a test split as
//! CSV. A source that already provides both splits is written through
//! unchanged; a single raw table is shuffled with a seeded generator and cut
//! at `train_ratio`.

use std::path::PathBuf;

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use super::artifacts::IngestionArtifact;
use crate::artifact::ArtifactStore;
use crate::config::DataIngestionConfig;
use crate::error::{PipelineError, Result};

/// What a source hands to the ingestion stage
#[derive(Debug, Clone)]
pub enum SourceData {
    /// Train and test splits decided upstream
    Split { train: DataFrame, test: DataFrame },
    /// One table, split during ingestion
    Raw(DataFrame),
}

/// Where raw records come from
pub trait DataSource {
    /// Short description for logs
    fn describe(&self) -> String;

    fn fetch(&self) -> Result<SourceData>;
}

/// CSV files on local disk
#[derive(Debug, Clone)]
pub enum CsvSource {
    Split { train: PathBuf, test: PathBuf },
    Raw(PathBuf),
}

impl CsvSource {
    pub fn split(train: impl Into<PathBuf>, test: impl Into<PathBuf>) -> Self {
        CsvSource::Split {
            train: train.into(),
            test: test.into(),
        }
    }

    pub fn raw(path: impl Into<PathBuf>) -> Self {
        CsvSource::Raw(path.into())
    }
}

impl DataSource for CsvSource {
    fn describe(&self) -> String {
        match self {
            CsvSource::Split { train, test } => {
                format!("csv train={} test={}", train.display(), test.display())
            }
            CsvSource::Raw(path) => format!("csv raw={}", path.display()),
        }
    }

    fn fetch(&self) -> Result<SourceData> {
        let store = ArtifactStore::new();
        match self {
            CsvSource::Split { train, test } => Ok(SourceData::Split {
                train: store.load_table(train)?,
                test: store.load_table(test)?,
            }),
            CsvSource::Raw(path) => Ok(SourceData::Raw(store.load_table(path)?)),
        }
    }
}

/// Frames already in memory
#[derive(Debug, Clone)]
pub struct FrameSource(SourceData);

impl FrameSource {
    pub fn split(train: DataFrame, test: DataFrame) -> Self {
        Self(SourceData::Split { train, test })
    }

    pub fn raw(df: DataFrame) -> Self {
        Self(SourceData::Raw(df))
    }
}

impl DataSource for FrameSource {
    fn describe(&self) -> String {
        "in-memory frames".to_string()
    }

    fn fetch(&self) -> Result<SourceData> {
        Ok(self.0.clone())
    }
}

/// Shuffle rows with a seeded generator and cut at `train_ratio`.
///
/// The test side gets `ceil((1 - train_ratio) * n)` rows. Both sides must
/// end up non-empty.
pub fn train_test_split(
    df: &DataFrame,
    train_ratio: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    let n_test = ((1.0 - train_ratio) * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::Data(format!(
            "cannot split {} rows at train ratio {}",
            n, train_ratio
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let (test_idx, train_idx) = indices.split_at(n_test);

    let take = |idx: &[IdxSize]| -> Result<DataFrame> {
        let idx = IdxCa::from_vec("idx".into(), idx.to_vec());
        Ok(df.take(&idx)?)
    };
    Ok((take(train_idx)?, take(test_idx)?))
}

/// Writes the ingested splits under the run directory.
pub struct DataIngestion<'a> {
    config: &'a DataIngestionConfig,
    store: &'a ArtifactStore,
}

impl<'a> DataIngestion<'a> {
    pub fn new(config: &'a DataIngestionConfig, store: &'a ArtifactStore) -> Self {
        Self { config, store }
    }

    pub fn initiate(&self, source: &dyn DataSource) -> Result<IngestionArtifact> {
        info!(source = %source.describe(), "Starting data ingestion");

        let (mut train, mut test) = match source.fetch()? {
            SourceData::Split { train, test } => (train, test),
            SourceData::Raw(mut raw) => {
                if raw.height() == 0 {
                    return Err(PipelineError::Data("raw source has no rows".to_string()));
                }
                self.store.save_table(&mut raw, &self.config.feature_store_path)?;
                train_test_split(&raw, self.config.train_ratio, self.config.random_state)?
            }
        };
        if train.height() == 0 || test.height() == 0 {
            return Err(PipelineError::Data(format!(
                "empty split (train {} rows, test {} rows)",
                train.height(),
                test.height()
            )));
        }

        self.store.save_table(&mut train, &self.config.train_path)?;
        self.store.save_table(&mut test, &self.config.test_path)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            "Data ingestion completed"
        );

        Ok(IngestionArtifact {
            train_path: self.config.train_path.clone(),
            test_path: self.config.test_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn frame(n: usize) -> DataFrame {
        let values: Vec<i64> = (0..n as i64).collect();
        df! { "v" => values }.unwrap()
    }

    #[test]
    fn test_split_sizes_and_coverage() {
        let (train, test) = train_test_split(&frame(10), 0.8, 42).unwrap();
        assert_eq!(train.height(), 8);
        assert_eq!(test.height(), 2);

        let mut all: Vec<i64> = train
            .column("v")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .chain(test.column("v").unwrap().i64().unwrap().into_no_null_iter())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let (a, _) = train_test_split(&frame(50), 0.8, 7).unwrap();
        let (b, _) = train_test_split(&frame(50), 0.8, 7).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_split_too_small() {
        assert!(train_test_split(&frame(1), 0.8, 42).is_err());
    }

    #[test]
    fn test_ingest_raw_source() {
        let dir = tempdir().unwrap();
        let config = DataIngestionConfig {
            ingestion_dir: dir.path().to_path_buf(),
            feature_store_path: dir.path().join("feature_store/raw.csv"),
            train_path: dir.path().join("ingested/train.csv"),
            test_path: dir.path().join("ingested/test.csv"),
            train_ratio: 0.8,
            random_state: 42,
        };
        let store = ArtifactStore::new();

        let artifact = DataIngestion::new(&config, &store)
            .initiate(&FrameSource::raw(frame(20)))
            .unwrap();
        artifact.verify().unwrap();
        assert!(config.feature_store_path.exists());
        assert_eq!(store.load_table(&artifact.test_path).unwrap().height(), 4);
    }
}
