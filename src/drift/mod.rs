//! Drift detection between a reference and a current dataset
//!
//! Every reference column is compared against the same column of the current
//! dataset with a two-sample test. A column drifts when the test's p-value is
//! at or below the significance threshold.
//!
//! The two-sample test is not symmetric in its p-value for unequal sample
//! sizes once the asymptotic approximation kicks in, so `detect(a, b)` and
//! `detect(b, a)` may report slightly different numbers.

mod data_drift;
mod feature_drift;

pub use data_drift::{kolmogorov_sf, KolmogorovSmirnovTest, KsMethod};
pub use feature_drift::{ColumnDrift, DatasetDriftDetector, DriftReport};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default significance level
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// Outcome of one two-sample test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test statistic
    pub statistic: f64,
    /// P-value in `[0, 1]`
    pub p_value: f64,
}

/// Trait for two-sample distribution tests
pub trait DriftTest: Send + Sync {
    /// Compare two samples. Both must be non-empty and free of NaN.
    fn test(&self, reference: &[f64], current: &[f64]) -> Result<TestResult>;
}
