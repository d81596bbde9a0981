//! Experiment tracking
//!
//! The pipeline reports each finished run to an optional [`MetricsSink`].
//! Sink failures never fail the run; the orchestrator logs them and moves on.

mod storage;

pub use storage::LocalTracker;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::ClassificationMetrics;
use crate::training::{ModelFamily, SearchResult};

/// Everything recorded about one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run directory name (the run timestamp)
    pub run_id: String,
    pub best_family: ModelFamily,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
    pub model_path: String,
    pub drift_detected: bool,
    pub search: SearchResult,
}

/// Destination for run records
pub trait MetricsSink: Send + Sync {
    fn record(&self, run: &RunRecord) -> Result<()>;
}
