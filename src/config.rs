//! Pipeline configuration
//!
//! [`PipelineSettings`] holds the tunable knobs and can be read from YAML.
//! [`TrainingPipelineConfig`] derives the per-run directory layout from the
//! settings and a run timestamp.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::artifact::WriteMode;
use crate::drift::{KsMethod, DEFAULT_DRIFT_THRESHOLD};
use crate::error::{PipelineError, Result};
use crate::training::{default_catalog, ModelCandidate};

pub const TARGET_COLUMN: &str = "Result";
pub const SCHEMA_FILE_PATH: &str = "data_schema/schema.yaml";
pub const ARTIFACT_DIR: &str = "artifacts";
pub const FINAL_MODEL_DIR: &str = "final_model";

pub const RAW_FILE_NAME: &str = "phishing_data.csv";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const TRANSFORMED_TRAIN_FILE_NAME: &str = "train.bin";
pub const TRANSFORMED_TEST_FILE_NAME: &str = "test.bin";
pub const PREPROCESSOR_FILE_NAME: &str = "preprocessor.bin";
pub const MODEL_FILE_NAME: &str = "model.bin";
pub const DRIFT_REPORT_FILE_NAME: &str = "report.yaml";
pub const SEARCH_REPORT_FILE_NAME: &str = "search_report.yaml";

/// Run directory name format, e.g. `10_19_2026_14_03_59`
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Tunable pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub target_column: String,
    pub schema_path: PathBuf,
    pub artifact_root: PathBuf,
    pub final_model_dir: PathBuf,
    pub drift_threshold: f64,
    pub ks_method: KsMethod,
    pub imputer_neighbors: usize,
    pub cv_folds: usize,
    pub random_state: u64,
    /// Share of rows kept for training when a single raw file is split
    pub train_ratio: f64,
    pub write_mode: WriteMode,
    /// Directory for the local experiment tracker; tracking is off when unset
    pub tracking_dir: Option<PathBuf>,
    pub catalog: Vec<ModelCandidate>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            schema_path: PathBuf::from(SCHEMA_FILE_PATH),
            artifact_root: PathBuf::from(ARTIFACT_DIR),
            final_model_dir: PathBuf::from(FINAL_MODEL_DIR),
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            ks_method: KsMethod::Auto,
            imputer_neighbors: 3,
            cv_folds: 3,
            random_state: 42,
            train_ratio: 0.8,
            write_mode: WriteMode::Overwrite,
            tracking_dir: None,
            catalog: default_catalog(),
        }
    }
}

impl PipelineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from a YAML file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::persistence(path, e))?;
        Self::from_yaml_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let settings: Self =
            serde_yaml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.drift_threshold > 0.0 && self.drift_threshold < 1.0) {
            return Err(PipelineError::Config(format!(
                "drift_threshold must lie in (0, 1), got {}",
                self.drift_threshold
            )));
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(PipelineError::Config(format!(
                "train_ratio must lie in (0, 1), got {}",
                self.train_ratio
            )));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::Config("cv_folds must be at least 2".to_string()));
        }
        if self.imputer_neighbors == 0 {
            return Err(PipelineError::Config(
                "imputer_neighbors must be at least 1".to_string(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(PipelineError::Config("catalog must list at least one family".to_string()));
        }
        if self.target_column.is_empty() {
            return Err(PipelineError::Config("target_column is empty".to_string()));
        }
        Ok(())
    }

    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = path.into();
        self
    }

    pub fn with_artifact_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_root = path.into();
        self
    }

    pub fn with_final_model_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.final_model_dir = path.into();
        self
    }

    pub fn with_drift_threshold(mut self, threshold: f64) -> Self {
        self.drift_threshold = threshold;
        self
    }

    pub fn with_ks_method(mut self, method: KsMethod) -> Self {
        self.ks_method = method;
        self
    }

    pub fn with_imputer_neighbors(mut self, k: usize) -> Self {
        self.imputer_neighbors = k;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_train_ratio(mut self, ratio: f64) -> Self {
        self.train_ratio = ratio;
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn with_tracking_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tracking_dir = Some(path.into());
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<ModelCandidate>) -> Self {
        self.catalog = catalog;
        self
    }
}

#[derive(Debug, Clone)]
pub struct DataIngestionConfig {
    pub ingestion_dir: PathBuf,
    /// Copy of a raw single-file source before it is split
    pub feature_store_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_ratio: f64,
    pub random_state: u64,
}

#[derive(Debug, Clone)]
pub struct DataValidationConfig {
    pub validation_dir: PathBuf,
    pub valid_train_path: PathBuf,
    pub valid_test_path: PathBuf,
    pub drift_report_path: PathBuf,
    pub schema_path: PathBuf,
    pub drift_threshold: f64,
    pub ks_method: KsMethod,
}

#[derive(Debug, Clone)]
pub struct DataTransformationConfig {
    pub transformation_dir: PathBuf,
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub transform_obj_path: PathBuf,
    pub target_column: String,
    pub imputer_neighbors: usize,
}

#[derive(Debug, Clone)]
pub struct ModelTrainerConfig {
    pub trainer_dir: PathBuf,
    pub trained_model_path: PathBuf,
    pub search_report_path: PathBuf,
    pub cv_folds: usize,
    pub random_state: u64,
    pub catalog: Vec<ModelCandidate>,
}

/// Directory layout and stage settings for one pipeline run
#[derive(Debug, Clone)]
pub struct TrainingPipelineConfig {
    pub settings: PipelineSettings,
    pub timestamp: String,
    pub run_dir: PathBuf,
}

impl TrainingPipelineConfig {
    /// Layout rooted at `<artifact_root>/<timestamp>`.
    pub fn new(settings: PipelineSettings, timestamp: DateTime<Local>) -> Self {
        let timestamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
        let run_dir = settings.artifact_root.join(&timestamp);
        Self {
            settings,
            timestamp,
            run_dir,
        }
    }

    pub fn now(settings: PipelineSettings) -> Self {
        Self::new(settings, Local::now())
    }

    pub fn ingestion(&self) -> DataIngestionConfig {
        let dir = self.run_dir.join("data_ingestion");
        let ingested = dir.join("ingested");
        DataIngestionConfig {
            feature_store_path: dir.join("feature_store").join(RAW_FILE_NAME),
            train_path: ingested.join(TRAIN_FILE_NAME),
            test_path: ingested.join(TEST_FILE_NAME),
            ingestion_dir: dir,
            train_ratio: self.settings.train_ratio,
            random_state: self.settings.random_state,
        }
    }

    pub fn validation(&self) -> DataValidationConfig {
        let dir = self.run_dir.join("data_validation");
        let validated = dir.join("validated");
        DataValidationConfig {
            valid_train_path: validated.join(TRAIN_FILE_NAME),
            valid_test_path: validated.join(TEST_FILE_NAME),
            drift_report_path: dir.join("drift_report").join(DRIFT_REPORT_FILE_NAME),
            validation_dir: dir,
            schema_path: self.settings.schema_path.clone(),
            drift_threshold: self.settings.drift_threshold,
            ks_method: self.settings.ks_method,
        }
    }

    pub fn transformation(&self) -> DataTransformationConfig {
        let dir = self.run_dir.join("data_transformation");
        let transformed = dir.join("transformed");
        DataTransformationConfig {
            transformed_train_path: transformed.join(TRANSFORMED_TRAIN_FILE_NAME),
            transformed_test_path: transformed.join(TRANSFORMED_TEST_FILE_NAME),
            transform_obj_path: dir.join("transformed_object").join(PREPROCESSOR_FILE_NAME),
            transformation_dir: dir,
            target_column: self.settings.target_column.clone(),
            imputer_neighbors: self.settings.imputer_neighbors,
        }
    }

    pub fn trainer(&self) -> ModelTrainerConfig {
        let dir = self.run_dir.join("model_trainer");
        ModelTrainerConfig {
            trained_model_path: dir.join("trained_model").join(MODEL_FILE_NAME),
            search_report_path: dir.join(SEARCH_REPORT_FILE_NAME),
            trainer_dir: dir,
            cv_folds: self.settings.cv_folds,
            random_state: self.settings.random_state,
            catalog: self.settings.catalog.clone(),
        }
    }

    pub fn final_model_dir(&self) -> &Path {
        &self.settings.final_model_dir
    }
}
