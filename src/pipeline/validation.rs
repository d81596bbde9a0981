//! Data validation stage
//!
//! Both ingested splits are checked against the schema; a failure aborts the
//! run. Drift between train and test is measured and written as a YAML
//! report, but it only warns.

use polars::prelude::*;
use tracing::{info, warn};

use super::artifacts::{IngestionArtifact, ValidationArtifact};
use crate::artifact::ArtifactStore;
use crate::config::DataValidationConfig;
use crate::drift::{DatasetDriftDetector, DriftReport, KolmogorovSmirnovTest};
use crate::error::Result;
use crate::schema::{Schema, SchemaValidator};

pub struct DataValidation<'a> {
    config: &'a DataValidationConfig,
    store: &'a ArtifactStore,
}

impl<'a> DataValidation<'a> {
    pub fn new(config: &'a DataValidationConfig, store: &'a ArtifactStore) -> Self {
        Self { config, store }
    }

    /// Schema-check both splits, detect drift, write the report and the
    /// validated copies.
    pub fn initiate(&self, ingested: &IngestionArtifact) -> Result<ValidationArtifact> {
        info!(schema = %self.config.schema_path.display(), "Starting data validation");

        let mut train = self.store.load_table(&ingested.train_path)?;
        let mut test = self.store.load_table(&ingested.test_path)?;

        let validator = SchemaValidator::new(Schema::load(&self.config.schema_path)?);
        check_splits(&validator, &train, &test)?;

        let report = self.detect_drift(&train, &test)?;
        self.store.save_report(&report, &self.config.drift_report_path)?;
        let drift_detected = report.drift_detected();
        if drift_detected {
            warn!(
                columns = ?report.drifted_columns(),
                report = %self.config.drift_report_path.display(),
                "Drift detected between train and test"
            );
        }

        self.store.save_table(&mut train, &self.config.valid_train_path)?;
        self.store.save_table(&mut test, &self.config.valid_test_path)?;
        info!(drift_detected, "Data validation completed");

        Ok(ValidationArtifact {
            status: true,
            valid_train_path: self.config.valid_train_path.clone(),
            valid_test_path: self.config.valid_test_path.clone(),
            drift_report_path: self.config.drift_report_path.clone(),
            drift_detected,
        })
    }

    fn detect_drift(&self, train: &DataFrame, test: &DataFrame) -> Result<DriftReport> {
        DatasetDriftDetector::with_test(
            KolmogorovSmirnovTest::new(self.config.ks_method),
            self.config.drift_threshold,
        )
        .detect(train, test)
    }
}

/// Train is checked before test; the first failing split is reported.
pub fn check_splits(validator: &SchemaValidator, train: &DataFrame, test: &DataFrame) -> Result<()> {
    validator.inspect(train).into_result("train")?;
    validator.inspect(test).into_result("test")
}
