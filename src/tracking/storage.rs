//! Local file tracker
//!
//! Keeps every run in a single `runs.json` array under the base directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{MetricsSink, RunRecord};
use crate::error::{PipelineError, Result};

/// JSON-file experiment tracker
#[derive(Debug, Clone)]
pub struct LocalTracker {
    base_dir: PathBuf,
}

impl LocalTracker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn runs_file(&self) -> PathBuf {
        self.base_dir.join("runs.json")
    }

    /// All recorded runs, oldest first.
    pub fn load_runs(&self) -> Result<Vec<RunRecord>> {
        let path = self.runs_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|e| PipelineError::persistence(&path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| PipelineError::persistence(&path, e))
    }

    pub fn latest(&self) -> Result<Option<RunRecord>> {
        Ok(self.load_runs()?.pop())
    }
}

impl MetricsSink for LocalTracker {
    fn record(&self, run: &RunRecord) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| PipelineError::persistence(&self.base_dir, e))?;

        let mut runs = self.load_runs()?;
        runs.retain(|r| r.run_id != run.run_id);
        runs.push(run.clone());

        let path = self.runs_file();
        let file = File::create(&path).map_err(|e| PipelineError::persistence(&path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &runs)
            .map_err(|e| PipelineError::persistence(&path, e))?;
        debug!(path = %path.display(), runs = runs.len(), "Run recorded");
        Ok(())
    }
}
