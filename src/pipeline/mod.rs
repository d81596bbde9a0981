//! Training pipeline stages and orchestration
//!
//! ```text
//! DataSource -> ingestion -> validation -> transformation -> trainer -> final_model/
//! ```

pub mod artifacts;
pub mod ingestion;
pub mod trainer;
pub mod training_pipeline;
pub mod transformation;
pub mod validation;

pub use artifacts::{IngestionArtifact, TrainerArtifact, TransformationArtifact, ValidationArtifact};
pub use ingestion::{train_test_split, CsvSource, DataIngestion, DataSource, FrameSource, SourceData};
pub use trainer::ModelTrainer;
pub use training_pipeline::{PipelineRun, PipelineState, TrainingPipeline};
pub use transformation::{attach_target, encode_target, split_target, DataTransformation};
pub use validation::{check_splits, DataValidation};
