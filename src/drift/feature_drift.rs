//! Column-by-column drift between two datasets

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DriftTest, KolmogorovSmirnovTest, DEFAULT_DRIFT_THRESHOLD};
use crate::error::{PipelineError, Result};
use crate::utils::column_values;

/// Drift verdict for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: f64,
    pub drift_detected: bool,
}

/// Per-column drift verdicts, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport {
    columns: BTreeMap<String, ColumnDrift>,
}

impl DriftReport {
    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnDrift)> {
        self.columns.iter()
    }

    /// `true` if any column drifted.
    pub fn drift_detected(&self) -> bool {
        self.columns.values().any(|c| c.drift_detected)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, c)| c.drift_detected)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Runs a two-sample test on every reference column.
#[derive(Debug, Clone)]
pub struct DatasetDriftDetector<T: DriftTest = KolmogorovSmirnovTest> {
    test: T,
    threshold: f64,
}

impl DatasetDriftDetector<KolmogorovSmirnovTest> {
    pub fn new(threshold: f64) -> Self {
        Self::with_test(KolmogorovSmirnovTest::default(), threshold)
    }
}

impl Default for DatasetDriftDetector<KolmogorovSmirnovTest> {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_THRESHOLD)
    }
}

impl<T: DriftTest> DatasetDriftDetector<T> {
    pub fn with_test(test: T, threshold: f64) -> Self {
        Self { test, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare every column of `reference` against `current`.
    ///
    /// Nulls are dropped from both samples before testing. A reference
    /// column absent from `current` is an error.
    pub fn detect(&self, reference: &DataFrame, current: &DataFrame) -> Result<DriftReport> {
        let mut report = DriftReport::default();

        for name in reference.get_column_names() {
            let name = name.as_str();
            if current.column(name).is_err() {
                return Err(PipelineError::DriftComputation(format!(
                    "reference column '{}' is missing from the current dataset",
                    name
                )));
            }

            let base = observed(reference, name)?;
            let curr = observed(current, name)?;
            let result = self
                .test
                .test(&base, &curr)
                .map_err(|e| PipelineError::DriftComputation(format!("column '{}': {}", name, e)))?;

            let drift_detected = result.p_value <= self.threshold;
            debug!(
                column = name,
                statistic = result.statistic,
                p_value = result.p_value,
                drift_detected,
                "drift test"
            );
            report.columns.insert(
                name.to_string(),
                ColumnDrift {
                    p_value: result.p_value,
                    drift_detected,
                },
            );
        }

        if report.drift_detected() {
            warn!(columns = ?report.drifted_columns(), "distribution drift detected");
        }
        Ok(report)
    }
}

fn observed(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = column_values(df, name)
        .map_err(|e| PipelineError::DriftComputation(e.to_string()))?;
    Ok(values.into_iter().filter(|v| !v.is_nan()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_columns_no_drift() {
        let a = df! { "A" => [1i64, 1, 1, 1, 1] }.unwrap();
        let report = DatasetDriftDetector::new(DEFAULT_DRIFT_THRESHOLD).detect(&a, &a).unwrap();

        let col = report.get("A").unwrap();
        assert_eq!(col.p_value, 1.0);
        assert!(!col.drift_detected);
        assert!(!report.drift_detected());
    }

    #[test]
    fn test_p_value_equal_to_threshold_is_drift() {
        let reference = df! { "A" => [1.0f64, 2.0, 3.0, 4.0, 5.0] }.unwrap();
        let current = df! { "A" => [3.0f64, 4.0, 5.0, 6.0, 7.0] }.unwrap();

        let p = DatasetDriftDetector::new(DEFAULT_DRIFT_THRESHOLD)
            .detect(&reference, &current)
            .unwrap()
            .get("A")
            .unwrap()
            .p_value;
        assert!(p > 0.0 && p < 1.0);

        let at_boundary = DatasetDriftDetector::new(p)
            .detect(&reference, &current)
            .unwrap();
        assert!(at_boundary.get("A").unwrap().drift_detected);
    }

    #[test]
    fn test_missing_column_is_error() {
        let reference = df! { "A" => [1i64, 2], "B" => [3i64, 4] }.unwrap();
        let current = df! { "A" => [1i64, 2] }.unwrap();

        let err = DatasetDriftDetector::new(DEFAULT_DRIFT_THRESHOLD)
            .detect(&reference, &current)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DriftComputation(_)));
        assert!(err.to_string().contains("'B'"));
    }

    #[test]
    fn test_disjoint_columns_drift() {
        let reference = df! { "A" => [1i64, 2, 3, 4, 5, 6, 7, 8] }.unwrap();
        let current = df! { "A" => [20i64, 21, 22, 23, 24, 25, 26, 27] }.unwrap();

        let report = DatasetDriftDetector::new(DEFAULT_DRIFT_THRESHOLD)
            .detect(&reference, &current)
            .unwrap();
        assert!(report.drift_detected());
        assert_eq!(report.drifted_columns(), vec!["A"]);
    }

    #[test]
    fn test_report_serializes_as_column_map() {
        let a = df! { "x" => [1i64, 2, 3] }.unwrap();
        let report = DatasetDriftDetector::new(DEFAULT_DRIFT_THRESHOLD).detect(&a, &a).unwrap();

        let yaml = serde_yaml::to_string(&report).unwrap();
        assert!(yaml.starts_with("x:"));
        assert!(yaml.contains("p_value"));
        assert!(yaml.contains("drift_detected: false"));
    }
}
