//! Error types for the phishing detection pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline.
///
/// The first five variants are the run-level failure kinds. The remaining
/// ones are raised by the building blocks and usually surface wrapped in
/// [`PipelineError::Stage`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Drift computation error: {0}")]
    DriftComputation(String),

    #[error("Transform fit error: {0}")]
    TransformFit(String),

    #[error("Search error in family '{family}': {reason}")]
    Search { family: String, reason: String },

    #[error("Persistence error at {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wraps an error with the identity of the stage it escaped from.
    pub fn in_stage(stage: impl Into<String>, source: PipelineError) -> Self {
        PipelineError::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Builds a persistence error for `path`.
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Innermost error, skipping stage wrappers.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Outermost stage name, if the error has been wrapped.
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Data("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_stage_wrapping_keeps_root_cause() {
        let inner = PipelineError::Structural("30 columns, expected 31".to_string());
        let err = PipelineError::in_stage("data_validation", inner);

        assert_eq!(err.stage(), Some("data_validation"));
        assert!(matches!(err.root_cause(), PipelineError::Structural(_)));
        assert!(err.to_string().contains("data_validation"));
    }

    #[test]
    fn test_persistence_error_names_path() {
        let err = PipelineError::persistence("/tmp/x/model.bin", "permission denied");
        assert!(err.to_string().contains("/tmp/x/model.bin"));
    }
}
