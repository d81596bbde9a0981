//! Records handed from one stage to the next
//!
//! Each record names files a stage has already written. A stage accepts its
//! predecessor's record only after [`verify`](IngestionArtifact::verify)
//! confirms those files are on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::metrics::ClassificationMetrics;
use crate::training::ModelFamily;

fn require(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::persistence(path, format!("{} is missing", what)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

impl IngestionArtifact {
    pub fn verify(&self) -> Result<()> {
        require(&self.train_path, "ingested train split")?;
        require(&self.test_path, "ingested test split")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    /// Both splits passed the schema checks
    pub status: bool,
    pub valid_train_path: PathBuf,
    pub valid_test_path: PathBuf,
    pub drift_report_path: PathBuf,
    /// Any column drifted between train and test
    pub drift_detected: bool,
}

impl ValidationArtifact {
    pub fn verify(&self) -> Result<()> {
        if !self.status {
            return Err(PipelineError::Structural(
                "validation did not pass, refusing to continue".to_string(),
            ));
        }
        require(&self.valid_train_path, "validated train split")?;
        require(&self.valid_test_path, "validated test split")?;
        require(&self.drift_report_path, "drift report")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub transform_obj_path: PathBuf,
}

impl TransformationArtifact {
    pub fn verify(&self) -> Result<()> {
        require(&self.transformed_train_path, "transformed train matrix")?;
        require(&self.transformed_test_path, "transformed test matrix")?;
        require(&self.transform_obj_path, "fitted preprocessor")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub model_path: PathBuf,
    pub search_report_path: PathBuf,
    pub best_family: ModelFamily,
    pub train_metric_artifact: ClassificationMetrics,
    pub test_metric_artifact: ClassificationMetrics,
}

impl TrainerArtifact {
    pub fn verify(&self) -> Result<()> {
        require(&self.model_path, "trained model bundle")?;
        require(&self.search_report_path, "search report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_verify_requires_files() {
        let dir = tempdir().unwrap();
        let train = dir.path().join("train.csv");
        let test = dir.path().join("test.csv");
        let artifact = IngestionArtifact {
            train_path: train.clone(),
            test_path: test.clone(),
        };

        std::fs::write(&train, "a\n1\n").unwrap();
        match artifact.verify() {
            Err(PipelineError::Persistence { path, .. }) => assert_eq!(path, test),
            other => panic!("unexpected {:?}", other),
        }

        std::fs::write(&test, "a\n1\n").unwrap();
        artifact.verify().unwrap();
    }

    #[test]
    fn test_failed_validation_blocks() {
        let artifact = ValidationArtifact {
            status: false,
            valid_train_path: PathBuf::from("x"),
            valid_test_path: PathBuf::from("y"),
            drift_report_path: PathBuf::from("z"),
            drift_detected: false,
        };
        assert!(matches!(artifact.verify(), Err(PipelineError::Structural(_))));
    }
}
