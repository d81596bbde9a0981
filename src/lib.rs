//! phishguard - phishing website classifier
//!
//! A batch training pipeline that turns labelled website features into a
//! persisted preprocessor and model, plus an inference context that loads
//! the pair back for scoring.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`pipeline`] - Ingestion, validation, transformation, training and export
//! - [`config`] - Settings and per-run directory layout
//! - [`artifact`] - Typed persistence of tables, matrices, objects and reports
//!
//! ## Data
//! - [`schema`] - Schema declaration and structural checks
//! - [`drift`] - Two-sample Kolmogorov-Smirnov drift detection
//! - [`imputation`] - KNN imputation and the fitted preprocessor
//!
//! ## Models
//! - [`training`] - Classifier families, grids, cross-validation and search
//! - [`metrics`] - F1, precision, recall and accuracy
//! - [`inference`] - Loaded preprocessor and model for scoring
//! - [`tracking`] - Run records and the local tracker
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline
pub mod artifact;
pub mod config;
pub mod pipeline;

// Data
pub mod drift;
pub mod imputation;
pub mod schema;

// Models
pub mod inference;
pub mod metrics;
pub mod tracking;
pub mod training;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Configuration
    pub use crate::config::{PipelineSettings, TrainingPipelineConfig};

    // Persistence
    pub use crate::artifact::{ArtifactStore, WriteMode};

    // Pipeline
    pub use crate::pipeline::{
        CsvSource, DataSource, FrameSource, PipelineRun, PipelineState, TrainingPipeline,
    };

    // Data checks
    pub use crate::drift::{DatasetDriftDetector, DriftReport, KsMethod};
    pub use crate::schema::{Schema, SchemaValidator};

    // Preprocessing
    pub use crate::imputation::{KnnImputer, Preprocessor, Transform};

    // Training
    pub use crate::training::{
        default_catalog, Estimator, ModelCandidate, ModelFamily, ModelSearchEngine, ParamGrid,
        TrainedModel,
    };

    // Metrics
    pub use crate::metrics::{score, ClassificationMetrics};

    // Inference
    pub use crate::inference::{InferenceContext, ModelBundle};

    // Experiment tracking
    pub use crate::tracking::{LocalTracker, MetricsSink, RunRecord};
}
