//! Experiment tracker
//!
//! Records training runs (metrics, chosen hyperparameters, model
//! artifacts) into a local storage backend. The tracker is constructed by
//! the caller and injected into the trainer; nothing connects at load time.

use super::storage::{LocalStorage, StorageBackend};
use crate::error::{NetguardError, Result};
use crate::metrics::ClassificationMetrics;
use crate::models::Classifier;
use crate::search::ParamSet;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Configuration for experiment tracking
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Directory experiments and run artifacts are stored under
    pub output_dir: PathBuf,
    /// Experiment name
    pub experiment_name: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./experiments"),
            experiment_name: "netguard-training".to_string(),
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A run within an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub params: HashMap<String, String>,
    pub metrics: HashMap<String, f64>,
    pub artifacts: Vec<String>,
    pub status: RunStatus,
}

impl Run {
    fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_id: format!("run-{}", Uuid::new_v4()),
            run_name: run_name.into(),
            start_time: Utc::now(),
            end_time: None,
            params: HashMap::new(),
            metrics: HashMap::new(),
            artifacts: Vec::new(),
            status: RunStatus::Running,
        }
    }
}

/// An experiment containing multiple runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub runs: Vec<Run>,
}

impl Experiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            experiment_id: format!("exp-{}", Uuid::new_v4()),
            name: name.into(),
            created_at: Utc::now(),
            runs: Vec::new(),
        }
    }

    /// Best run by a metric (higher wins when `maximize`)
    pub fn best_run(&self, metric_name: &str, maximize: bool) -> Option<&Run> {
        self.runs
            .iter()
            .filter(|r| r.metrics.contains_key(metric_name))
            .max_by(|a, b| {
                let val_a = a.metrics.get(metric_name).unwrap_or(&0.0);
                let val_b = b.metrics.get(metric_name).unwrap_or(&0.0);
                if maximize {
                    val_a.partial_cmp(val_b).unwrap_or(std::cmp::Ordering::Equal)
                } else {
                    val_b.partial_cmp(val_a).unwrap_or(std::cmp::Ordering::Equal)
                }
            })
    }
}

/// Experiment tracker with a pluggable storage backend
pub struct ExperimentTracker {
    storage: Box<dyn StorageBackend + Send + Sync>,
    experiment: RwLock<Experiment>,
    current_run: RwLock<Option<Run>>,
}

impl ExperimentTracker {
    pub fn new(config: ExperimentConfig) -> Self {
        let storage = Box::new(LocalStorage::new(config.output_dir.clone()));
        let experiment = Experiment::new(&config.experiment_name);

        Self {
            storage,
            experiment: RwLock::new(experiment),
            current_run: RwLock::new(None),
        }
    }

    /// Create with default configuration under `output_dir`
    pub fn with_dir(output_dir: impl Into<PathBuf>) -> Self {
        let config = ExperimentConfig {
            output_dir: output_dir.into(),
            ..Default::default()
        };
        Self::new(config)
    }

    /// Start a new run, replacing any run left open
    pub fn start_run(&self, run_name: impl Into<String>) -> String {
        let run = Run::new(run_name);
        let run_id = run.run_id.clone();
        *self.current_run.write() = Some(run);
        run_id
    }

    /// Log a parameter on the current run
    pub fn log_param(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(ref mut run) = *self.current_run.write() {
            run.params.insert(key.into(), value.into());
        }
    }

    /// Log a scalar metric on the current run
    pub fn log_metric(&self, name: impl Into<String>, value: f64) {
        if let Some(ref mut run) = *self.current_run.write() {
            run.metrics.insert(name.into(), value);
        }
    }

    /// Write an artifact file into the current run's directory
    pub fn log_artifact(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        let run_id = self
            .current_run
            .read()
            .as_ref()
            .map(|r| r.run_id.clone())
            .ok_or_else(|| {
                NetguardError::TrackingError("no run is currently open".to_string())
            })?;

        let path = self.storage.write_artifact(&run_id, file_name, contents)?;
        if let Some(ref mut run) = *self.current_run.write() {
            run.artifacts.push(path.display().to_string());
        }
        Ok(path)
    }

    /// Close the current run with the given status and persist the
    /// experiment. A no-op when no run is open.
    pub fn end_run(&self, status: RunStatus) -> Result<()> {
        let completed = {
            let mut guard = self.current_run.write();
            if let Some(ref mut run) = *guard {
                run.end_time = Some(Utc::now());
                run.status = status;
            }
            guard.take()
        };

        let Some(run) = completed else {
            return Ok(());
        };

        let snapshot = {
            let mut experiment = self.experiment.write();
            experiment.runs.push(run);
            experiment.clone()
        };

        self.persist(&snapshot)
    }

    fn persist(&self, experiment: &Experiment) -> Result<()> {
        let mut experiments = self.storage.load_experiments().unwrap_or_default();
        match experiments
            .iter_mut()
            .find(|e| e.experiment_id == experiment.experiment_id)
        {
            Some(existing) => *existing = experiment.clone(),
            None => experiments.push(experiment.clone()),
        }
        self.storage.save_experiments(&experiments)
    }

    /// Snapshot of the tracker's experiment
    pub fn experiment(&self) -> Experiment {
        self.experiment.read().clone()
    }

    /// Track one evaluated model: opens a run, logs the three
    /// classification metrics, the chosen hyperparameters and the
    /// serialized model, and closes the run on every exit path.
    pub fn track_model_run(
        &self,
        run_name: &str,
        model: &Classifier,
        metrics: &ClassificationMetrics,
        params: &ParamSet,
    ) -> Result<()> {
        self.start_run(run_name);

        let outcome = self.log_model_payload(model, metrics, params);
        let status = if outcome.is_ok() {
            RunStatus::Finished
        } else {
            RunStatus::Failed
        };
        let closed = self.end_run(status);

        outcome.and(closed)
    }

    fn log_model_payload(
        &self,
        model: &Classifier,
        metrics: &ClassificationMetrics,
        params: &ParamSet,
    ) -> Result<()> {
        self.log_metric("f1_score", metrics.f1_score);
        self.log_metric("precision", metrics.precision_score);
        self.log_metric("recall_score", metrics.recall_score);

        self.log_param("model_family", model.family_name());
        for (name, value) in params {
            self.log_param(name.clone(), value.to_string());
        }

        let serialized = serde_json::to_string_pretty(model)?;
        self.log_artifact("model.json", &serialized)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecisionTree;
    use ndarray::array;

    fn tracker_in(dir: &tempfile::TempDir) -> ExperimentTracker {
        ExperimentTracker::with_dir(dir.path())
    }

    #[test]
    fn test_run_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);

        let run_id = tracker.start_run("run-1");
        assert!(!run_id.is_empty());

        tracker.log_param("learning_rate", "0.1");
        tracker.log_metric("f1_score", 0.95);
        tracker.end_run(RunStatus::Finished).unwrap();

        let exp = tracker.experiment();
        assert_eq!(exp.runs.len(), 1);
        assert_eq!(exp.runs[0].status, RunStatus::Finished);
        assert_eq!(exp.runs[0].metrics.get("f1_score"), Some(&0.95));
        assert!(exp.runs[0].end_time.is_some());
    }

    #[test]
    fn test_end_run_persists_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);

        tracker.start_run("run-1");
        tracker.end_run(RunStatus::Finished).unwrap();

        assert!(dir.path().join("experiments.json").exists());
    }

    #[test]
    fn test_artifact_without_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        assert!(matches!(
            tracker.log_artifact("model.json", "{}"),
            Err(NetguardError::TrackingError(_))
        ));
    }

    #[test]
    fn test_track_model_run_logs_metrics_and_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);

        let x = array![[0.0], [0.1], [0.9], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut model = Classifier::DecisionTree(DecisionTree::new_classifier());
        model.fit(&x, &y).unwrap();

        let metrics = ClassificationMetrics {
            f1_score: 1.0,
            precision_score: 1.0,
            recall_score: 1.0,
        };
        tracker
            .track_model_run("train-metrics", &model, &metrics, &Vec::new())
            .unwrap();

        let exp = tracker.experiment();
        assert_eq!(exp.runs.len(), 1);
        let run = &exp.runs[0];
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.metrics.len(), 3);
        assert_eq!(run.artifacts.len(), 1);
        assert!(std::path::Path::new(&run.artifacts[0]).exists());
    }

    #[test]
    fn test_best_run() {
        let mut exp = Experiment::new("test");

        let mut run1 = Run::new("run1");
        run1.metrics.insert("f1_score".to_string(), 0.8);
        let mut run2 = Run::new("run2");
        run2.metrics.insert("f1_score".to_string(), 0.95);
        let mut run3 = Run::new("run3");
        run3.metrics.insert("f1_score".to_string(), 0.85);

        exp.runs = vec![run1, run2, run3];

        let best = exp.best_run("f1_score", true).unwrap();
        assert_eq!(best.metrics.get("f1_score"), Some(&0.95));
    }
}
