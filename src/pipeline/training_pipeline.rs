//! End-to-end training run
//!
//! Stages run strictly in order. Each stage's artifact is verified before
//! the next one starts, and any error moves the pipeline to
//! [`PipelineState::Failed`] and comes back wrapped with the stage name.
//! Files written by earlier stages are left on disk.

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, warn};

use super::artifacts::{
    IngestionArtifact, TrainerArtifact, TransformationArtifact, ValidationArtifact,
};
use super::ingestion::{DataIngestion, DataSource};
use super::trainer::ModelTrainer;
use super::transformation::DataTransformation;
use super::validation::DataValidation;
use crate::artifact::ArtifactStore;
use crate::config::{TrainingPipelineConfig, MODEL_FILE_NAME, PREPROCESSOR_FILE_NAME};
use crate::error::{PipelineError, Result};
use crate::inference::ModelBundle;
use crate::tracking::{LocalTracker, MetricsSink, RunRecord};
use crate::training::SearchResult;

pub const STAGE_INGESTION: &str = "data_ingestion";
pub const STAGE_VALIDATION: &str = "data_validation";
pub const STAGE_TRANSFORMATION: &str = "data_transformation";
pub const STAGE_TRAINER: &str = "model_trainer";
pub const STAGE_EXPORT: &str = "final_model_export";

/// Where a run currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Ingested,
    Validated,
    Transformed,
    Trained,
    Done,
    Failed { stage: String },
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Init => write!(f, "init"),
            PipelineState::Ingested => write!(f, "ingested"),
            PipelineState::Validated => write!(f, "validated"),
            PipelineState::Transformed => write!(f, "transformed"),
            PipelineState::Trained => write!(f, "trained"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed { stage } => write!(f, "failed in {}", stage),
        }
    }
}

/// Artifacts of a completed run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub ingestion: IngestionArtifact,
    pub validation: ValidationArtifact,
    pub transformation: TransformationArtifact,
    pub trainer: TrainerArtifact,
    pub final_model_dir: PathBuf,
}

/// Runs ingestion, validation, transformation, training and export.
pub struct TrainingPipeline {
    config: TrainingPipelineConfig,
    store: ArtifactStore,
    sink: Option<Box<dyn MetricsSink>>,
    state: PipelineState,
}

impl TrainingPipeline {
    /// A local tracker is attached when the settings name a tracking dir.
    pub fn new(config: TrainingPipelineConfig) -> Self {
        let store = ArtifactStore::new().with_mode(config.settings.write_mode);
        let sink = config
            .settings
            .tracking_dir
            .clone()
            .map(|dir| Box::new(LocalTracker::new(dir)) as Box<dyn MetricsSink>);
        Self {
            config,
            store,
            sink,
            state: PipelineState::Init,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &TrainingPipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn run(&mut self, source: &dyn DataSource) -> Result<PipelineRun> {
        if self.state != PipelineState::Init {
            return Err(PipelineError::Config(format!(
                "pipeline already ran (state: {})",
                self.state
            )));
        }
        info!(run_dir = %self.config.run_dir.display(), "Training pipeline started");

        let ingestion = self.stage(STAGE_INGESTION, PipelineState::Ingested, |p| {
            let config = p.config.ingestion();
            let artifact = DataIngestion::new(&config, &p.store).initiate(source)?;
            artifact.verify()?;
            Ok(artifact)
        })?;

        let validation = self.stage(STAGE_VALIDATION, PipelineState::Validated, |p| {
            let config = p.config.validation();
            let artifact = DataValidation::new(&config, &p.store).initiate(&ingestion)?;
            artifact.verify()?;
            Ok(artifact)
        })?;

        let transformation = self.stage(STAGE_TRANSFORMATION, PipelineState::Transformed, |p| {
            let config = p.config.transformation();
            let artifact = DataTransformation::new(&config, &p.store).initiate(&validation)?;
            artifact.verify()?;
            Ok(artifact)
        })?;

        let trainer = self.stage(STAGE_TRAINER, PipelineState::Trained, |p| {
            let config = p.config.trainer();
            let artifact = ModelTrainer::new(&config, &p.store).initiate(&transformation)?;
            artifact.verify()?;
            Ok(artifact)
        })?;

        let final_model_dir =
            self.stage(STAGE_EXPORT, PipelineState::Done, |p| p.export(&trainer))?;

        let run = PipelineRun {
            run_id: self.config.timestamp.clone(),
            run_dir: self.config.run_dir.clone(),
            ingestion,
            validation,
            transformation,
            trainer,
            final_model_dir,
        };
        self.track(&run);

        info!(
            family = %run.trainer.best_family,
            test_f1 = run.trainer.test_metric_artifact.f1_score,
            drift_detected = run.validation.drift_detected,
            "Training pipeline completed"
        );
        Ok(run)
    }

    fn stage<T>(
        &mut self,
        name: &str,
        next: PipelineState,
        body: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        info!(stage = name, "Stage started");
        match body(self) {
            Ok(value) => {
                self.state = next;
                Ok(value)
            }
            Err(e) => {
                error!(stage = name, error = %e, "Stage failed");
                self.state = PipelineState::Failed {
                    stage: name.to_string(),
                };
                Err(PipelineError::in_stage(name, e))
            }
        }
    }

    /// Split the trainer's bundle into `preprocessor.bin` and `model.bin`
    /// under the final model directory.
    fn export(&self, trainer: &TrainerArtifact) -> Result<PathBuf> {
        let bundle: ModelBundle = self.store.load_object(&trainer.model_path)?;
        let (preprocessor, model) = bundle.into_parts();

        let dir = self.config.final_model_dir().to_path_buf();
        self.store
            .save_object(&preprocessor, &dir.join(PREPROCESSOR_FILE_NAME))?;
        self.store.save_object(&model, &dir.join(MODEL_FILE_NAME))?;
        info!(dir = %dir.display(), "Final model exported");
        Ok(dir)
    }

    fn track(&self, run: &PipelineRun) {
        let Some(sink) = &self.sink else {
            return;
        };
        let search = match self
            .store
            .load_report::<SearchResult>(&run.trainer.search_report_path)
        {
            Ok(search) => search,
            Err(e) => {
                warn!(error = %e, "Search report unreadable, tracking without it");
                SearchResult::new()
            }
        };
        let record = RunRecord {
            run_id: run.run_id.clone(),
            best_family: run.trainer.best_family,
            train_metrics: run.trainer.train_metric_artifact,
            test_metrics: run.trainer.test_metric_artifact,
            model_path: run.trainer.model_path.display().to_string(),
            drift_detected: run.validation.drift_detected,
            search,
        };
        if let Err(e) = sink.record(&record) {
            warn!(error = %e, "Failed to record run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineSettings;
    use crate::pipeline::FrameSource;
    use crate::training::{ModelCandidate, ModelFamily, ParamGrid};
    use polars::prelude::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const SCHEMA: &str = "columns:\n  - a: int64\n  - b: int64\n  - Result: int64\nnumerical_columns:\n  - a\n  - b\n  - Result\n";

    fn settings(dir: &Path) -> PipelineSettings {
        std::fs::write(dir.join("schema.yaml"), SCHEMA).unwrap();
        PipelineSettings::new()
            .with_schema_path(dir.join("schema.yaml"))
            .with_artifact_root(dir.join("artifacts"))
            .with_final_model_dir(dir.join("final_model"))
            .with_catalog(vec![ModelCandidate::new(
                ModelFamily::DecisionTree,
                ParamGrid::new(),
            )])
    }

    fn raw_frame(n: i64) -> DataFrame {
        df! {
            "a" => (0..n).collect::<Vec<_>>(),
            "b" => (0..n).map(|i| i % 3).collect::<Vec<_>>(),
            "Result" => (0..n).map(|i| if i < n / 2 { -1 } else { 1 }).collect::<Vec<_>>(),
        }
        .unwrap()
    }

    #[derive(Default)]
    struct RecordingSink(Arc<Mutex<Vec<RunRecord>>>);

    impl MetricsSink for RecordingSink {
        fn record(&self, run: &RunRecord) -> Result<()> {
            self.0.lock().unwrap().push(run.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl MetricsSink for FailingSink {
        fn record(&self, _run: &RunRecord) -> Result<()> {
            Err(PipelineError::Config("tracking backend down".to_string()))
        }
    }

    #[test]
    fn test_full_run_reaches_done() {
        let dir = tempdir().unwrap();
        let records = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = TrainingPipeline::new(TrainingPipelineConfig::now(settings(dir.path())))
            .with_sink(Box::new(RecordingSink(records.clone())));

        let run = pipeline.run(&FrameSource::raw(raw_frame(40))).unwrap();
        assert_eq!(pipeline.state(), &PipelineState::Done);
        assert!(run.final_model_dir.join(MODEL_FILE_NAME).exists());
        assert!(run.final_model_dir.join(PREPROCESSOR_FILE_NAME).exists());

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].best_family, ModelFamily::DecisionTree);
        assert_eq!(records[0].search.len(), 1);
    }

    #[test]
    fn test_failure_wraps_stage_and_sets_state() {
        let dir = tempdir().unwrap();
        let mut pipeline = TrainingPipeline::new(TrainingPipelineConfig::now(settings(dir.path())));

        let bad = raw_frame(40).drop("b").unwrap();
        let err = pipeline.run(&FrameSource::raw(bad)).unwrap_err();
        assert_eq!(err.stage(), Some(STAGE_VALIDATION));
        assert!(matches!(err.root_cause(), PipelineError::Structural(_)));
        assert_eq!(
            pipeline.state(),
            &PipelineState::Failed {
                stage: STAGE_VALIDATION.to_string()
            }
        );
        // ingestion output stays on disk
        assert!(pipeline.config().ingestion().train_path.exists());
        assert!(pipeline.run(&FrameSource::raw(raw_frame(40))).is_err());
    }

    #[test]
    fn test_sink_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let mut pipeline = TrainingPipeline::new(TrainingPipelineConfig::now(settings(dir.path())))
            .with_sink(Box::new(FailingSink));
        assert!(pipeline.run(&FrameSource::raw(raw_frame(40))).is_ok());
    }
}
