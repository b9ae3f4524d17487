//! Experiment tracking

pub mod storage;
pub mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{Experiment, ExperimentConfig, ExperimentTracker, Run, RunStatus};
