//! Trainer configuration and pipeline artifact records
//!
//! The trainer sits between the data-transformation stage and the
//! evaluation stage of the pipeline. Its inputs and outputs are described
//! by artifact records exchanged between stages.

use crate::metrics::ClassificationMetrics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Well-known relative path where the bare winning model is published for
/// external consumers, in addition to the configured bundle path.
pub const FINAL_MODEL_FILE: &str = "final_model/model.json";

/// Configuration for the model-training stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrainerConfig {
    /// Where the trained model/preprocessor bundle is persisted
    pub trained_model_file_path: PathBuf,
    /// Minimum acceptable test F1; falling below only produces a warning
    pub expected_score: f64,
}

impl Default for ModelTrainerConfig {
    fn default() -> Self {
        Self {
            trained_model_file_path: PathBuf::from("artifacts/model_trainer/model.json"),
            expected_score: 0.6,
        }
    }
}

/// Output record of the upstream data-transformation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    /// Transformed training array (CSV, last column is the label)
    pub transformed_train_file_path: PathBuf,
    /// Transformed test array (CSV, last column is the label)
    pub transformed_test_file_path: PathBuf,
    /// Fitted preprocessing transform (JSON)
    pub transformed_object_file_path: PathBuf,
}

/// Output record of the model-training stage, consumed by evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub train_metric: ClassificationMetrics,
    pub test_metric: ClassificationMetrics,
}
