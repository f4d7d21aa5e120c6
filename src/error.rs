//! Error types for metamodel

use thiserror::Error;

/// Result type alias for metamodel operations
pub type Result<T> = std::result::Result<T, MetaModelError>;

/// Main error type
#[derive(Error, Debug)]
pub enum MetaModelError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Evaluation error in trial {trial} ({estimator}): {source}")]
    EvaluationError {
        trial: usize,
        estimator: String,
        #[source]
        source: Box<MetaModelError>,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MetaModelError {
    /// Shorthand for an `InvalidParameter` error
    pub fn invalid_param(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        MetaModelError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from evaluating a sampled configuration
    pub fn is_evaluation(&self) -> bool {
        matches!(self, MetaModelError::EvaluationError { .. })
    }
}

impl From<polars::error::PolarsError> for MetaModelError {
    fn from(err: polars::error::PolarsError) -> Self {
        MetaModelError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for MetaModelError {
    fn from(err: serde_json::Error) -> Self {
        MetaModelError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MetaModelError {
    fn from(err: ndarray::ShapeError) -> Self {
        MetaModelError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
