//! Error types for the NetGuard trainer

use thiserror::Error;

/// Result type alias for trainer operations
pub type Result<T> = std::result::Result<T, NetguardError>;

/// Main error type for the NetGuard trainer
#[derive(Error, Debug)]
pub enum NetguardError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Tracking error: {0}")]
    TrackingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for NetguardError {
    fn from(err: polars::error::PolarsError) -> Self {
        NetguardError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for NetguardError {
    fn from(err: serde_json::Error) -> Self {
        NetguardError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for NetguardError {
    fn from(err: ndarray::ShapeError) -> Self {
        NetguardError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
