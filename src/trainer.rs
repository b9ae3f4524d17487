//! Trainer orchestrator
//!
//! Drives the end-to-end training stage: load transformed arrays, search
//! the candidate catalog, select the winner, report metrics to the
//! tracker, bundle the winner with the fitted preprocessor and persist the
//! artifacts.

use crate::bundle::NetworkModel;
use crate::config::{
    DataTransformationArtifact, ModelTrainerArtifact, ModelTrainerConfig, FINAL_MODEL_FILE,
};
use crate::data::load_transformed_array;
use crate::error::{NetguardError, Result};
use crate::metrics::ClassificationMetrics;
use crate::preprocessing::KnnImputer;
use crate::search::{builtin_catalog, evaluate_catalog, format_params, CandidateOutcome};
use crate::tracking::ExperimentTracker;
use crate::utils::{load_object, save_object};
use ndarray::{Array1, Array2};
use std::path::Path;
use tracing::{info, warn};

/// The model-training stage of the pipeline
pub struct ModelTrainer {
    config: ModelTrainerConfig,
    artifact: DataTransformationArtifact,
    tracker: ExperimentTracker,
}

impl ModelTrainer {
    /// The tracker is constructed by the caller; its lifecycle is not owned
    /// here.
    pub fn new(
        config: ModelTrainerConfig,
        artifact: DataTransformationArtifact,
        tracker: ExperimentTracker,
    ) -> Self {
        Self {
            config,
            artifact,
            tracker,
        }
    }

    /// Run the whole training stage. Any failure other than tracking
    /// aborts the stage; nothing is retried.
    pub fn initiate(&self) -> Result<ModelTrainerArtifact> {
        info!(
            train = %self.artifact.transformed_train_file_path.display(),
            test = %self.artifact.transformed_test_file_path.display(),
            "starting model training stage"
        );

        let (x_train, y_train) =
            load_transformed_array(&self.artifact.transformed_train_file_path)?;
        let (x_test, y_test) = load_transformed_array(&self.artifact.transformed_test_file_path)?;

        self.train_model(&x_train, &y_train, &x_test, &y_test)
    }

    fn train_model(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<ModelTrainerArtifact> {
        let catalog = builtin_catalog();
        let outcome = evaluate_catalog(x_train, y_train, x_test, y_test, &catalog)?;

        for (name, score) in outcome.score_report() {
            info!(candidate = %name, score, "score report entry");
        }

        let best = outcome.into_best().ok_or_else(|| {
            NetguardError::SearchError("no candidate produced a score".to_string())
        })?;
        info!(
            best = %best.name,
            score = best.score,
            params = %format_params(&best.params),
            "selected best model"
        );

        // The winner is reused as fitted by the search; no refit here
        let y_train_pred = best.model.predict(x_train)?;
        let train_metric = ClassificationMetrics::score(y_train, &y_train_pred)?;
        self.track("train-metrics", &best, &train_metric);

        let y_test_pred = best.model.predict(x_test)?;
        let test_metric = ClassificationMetrics::score(y_test, &y_test_pred)?;
        self.track("test-metrics", &best, &test_metric);

        if test_metric.f1_score < self.config.expected_score {
            warn!(
                f1_score = test_metric.f1_score,
                expected = self.config.expected_score,
                "best model scored below the expected threshold"
            );
        }

        let preprocessor: KnnImputer =
            load_object(&self.artifact.transformed_object_file_path)?;

        let bundle = NetworkModel::new(preprocessor, best.model.clone());
        bundle.save(&self.config.trained_model_file_path)?;
        save_object(Path::new(FINAL_MODEL_FILE), &best.model)?;

        let trainer_artifact = ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metric,
            test_metric,
        };
        info!(artifact = ?trainer_artifact, "model trainer artifact");
        Ok(trainer_artifact)
    }

    /// Report one split's metrics to the tracker. Tracking failures are
    /// logged and skipped; they never abort training.
    fn track(
        &self,
        run_name: &str,
        best: &CandidateOutcome,
        metrics: &ClassificationMetrics,
    ) {
        if let Err(e) = self
            .tracker
            .track_model_run(run_name, &best.model, metrics, &best.params)
        {
            warn!(run = run_name, error = %e, "tracking failed, continuing");
        }
    }
}
