//! Storage backend for experiment tracking

use super::tracker::Experiment;
use crate::error::Result;
use crate::utils::save_object;
use std::fs;
use std::path::PathBuf;

/// Storage backend trait
pub trait StorageBackend {
    /// Persist the full experiment list
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()>;

    /// Load all previously persisted experiments
    fn load_experiments(&self) -> Result<Vec<Experiment>>;

    /// Write a run artifact and return its path
    fn write_artifact(&self, run_id: &str, file_name: &str, contents: &str) -> Result<PathBuf>;

    /// Check whether the backend is usable
    fn is_available(&self) -> bool;
}

/// Local file-system storage backend
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(run_id)
    }
}

impl StorageBackend for LocalStorage {
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()> {
        save_object(&self.experiments_file(), &experiments)
    }

    fn load_experiments(&self) -> Result<Vec<Experiment>> {
        let path = self.experiments_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        crate::utils::load_object(&path)
    }

    fn write_artifact(&self, run_id: &str, file_name: &str, contents: &str) -> Result<PathBuf> {
        let dir = self.run_dir(run_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    fn is_available(&self) -> bool {
        fs::create_dir_all(&self.base_dir).is_ok()
    }
}
