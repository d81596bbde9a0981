//! Loaded inference context

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ModelBundle;
use crate::artifact::ArtifactStore;
use crate::config::{MODEL_FILE_NAME, PREPROCESSOR_FILE_NAME, TARGET_COLUMN};
use crate::error::{PipelineError, Result};
use crate::imputation::Preprocessor;
use crate::training::TrainedModel;

/// Column appended to scored tables
pub const PREDICTED_COLUMN: &str = "Predicted";

/// Inference statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_requests: u64,
    pub total_predictions: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    predictions: AtomicU64,
    errors: AtomicU64,
    latency_us: AtomicU64,
}

/// Preprocessor and model loaded together, cheap to clone and share
/// between request handlers.
#[derive(Debug, Clone)]
pub struct InferenceContext {
    bundle: Arc<ModelBundle>,
    counters: Arc<Counters>,
}

impl InferenceContext {
    pub fn new(bundle: ModelBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Load `preprocessor.bin` and `model.bin` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        check_model_dir(dir)?;
        let store = ArtifactStore::new();
        let preprocessor: Preprocessor = store.load_object(&dir.join(PREPROCESSOR_FILE_NAME))?;
        let model: TrainedModel = store.load_object(&dir.join(MODEL_FILE_NAME))?;
        let bundle = ModelBundle::new(preprocessor, model)?;
        info!(
            dir = %dir.display(),
            family = %bundle.family(),
            features = bundle.preprocessor().n_features(),
            "Inference context loaded"
        );
        Ok(Self::new(bundle))
    }

    /// Load a trainer-stage bundle file.
    pub fn from_bundle_file(path: &Path) -> Result<Self> {
        let bundle: ModelBundle = ArtifactStore::new().load_object(path)?;
        Ok(Self::new(bundle))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predict one label per row. Columns beyond the fitted features are
    /// ignored.
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let start = Instant::now();
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let result = self.bundle.predict(df);
        match &result {
            Ok(preds) => {
                self.counters
                    .predictions
                    .fetch_add(preds.len() as u64, Ordering::Relaxed);
                self.counters
                    .latency_us
                    .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
                debug!(rows = preds.len(), "Batch scored");
            }
            Err(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    /// Score a table: the target column is dropped if present and a
    /// `Predicted` column is appended.
    pub fn score_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut scored = if df.column(TARGET_COLUMN).is_ok() {
            df.drop(TARGET_COLUMN)?
        } else {
            df.clone()
        };
        let preds = self.predict(&scored)?;
        scored.with_column(Column::new(PREDICTED_COLUMN.into(), preds.to_vec()))?;
        Ok(scored)
    }

    /// Score a CSV file and write the result to `output`.
    pub fn predict_csv(&self, input: &Path, output: &Path) -> Result<DataFrame> {
        let store = ArtifactStore::new();
        let df = store.load_table(input)?;
        let mut scored = self.score_frame(&df)?;
        store.save_table(&mut scored, output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            rows = scored.height(),
            "Predictions written"
        );
        Ok(scored)
    }

    pub fn stats(&self) -> InferenceStats {
        let requests = self.counters.requests.load(Ordering::Relaxed);
        let errors = self.counters.errors.load(Ordering::Relaxed);
        let ok = requests.saturating_sub(errors);
        let latency_us = self.counters.latency_us.load(Ordering::Relaxed);
        InferenceStats {
            total_requests: requests,
            total_predictions: self.counters.predictions.load(Ordering::Relaxed),
            error_count: errors,
            avg_latency_ms: if ok > 0 {
                latency_us as f64 / ok as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

impl From<ModelBundle> for InferenceContext {
    fn from(bundle: ModelBundle) -> Self {
        Self::new(bundle)
    }
}

/// Both halves of a model directory must be present.
pub(crate) fn check_model_dir(dir: &Path) -> Result<()> {
    for name in [PREPROCESSOR_FILE_NAME, MODEL_FILE_NAME] {
        let path = dir.join(name);
        if !path.exists() {
            return Err(PipelineError::persistence(path, "model directory is incomplete"));
        }
    }
    Ok(())
}
