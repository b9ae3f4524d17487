//! Artifact persistence helpers
//!
//! All pipeline artifacts are JSON. Writes go through a temp-file-and-rename
//! so a crash mid-write never leaves a half-written artifact; concurrent
//! writers are last-writer-wins.

use crate::error::{NetguardError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serialize an object to JSON at `path`, creating parent directories.
pub fn save_object<T: Serialize>(path: &Path, obj: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(obj)?;

    let tmp_path = match path.file_name() {
        Some(name) => {
            let mut tmp_name = name.to_os_string();
            tmp_name.push(".tmp");
            path.with_file_name(tmp_name)
        }
        None => {
            return Err(NetguardError::ValidationError(format!(
                "not a file path: {}",
                path.display()
            )))
        }
    };

    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load a JSON-serialized object from `path`.
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .map_err(|e| NetguardError::DataError(format!("{}: {}", path.display(), e)))?;
    let obj = serde_json::from_str(&json).map_err(|e| {
        NetguardError::SerializationError(format!("{}: {}", path.display(), e))
    })?;
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        name: String,
        value: f64,
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("blob.json");

        let blob = Blob {
            name: "x".to_string(),
            value: 4.5,
        };
        save_object(&path, &blob).unwrap();

        let restored: Blob = load_object(&path).unwrap();
        assert_eq!(restored, blob);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.json");
        save_object(&path, &Blob { name: "x".to_string(), value: 1.0 }).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("blob.json")]);
    }

    #[test]
    fn test_load_missing_file_is_data_error() {
        let err = load_object::<Blob>(Path::new("/nonexistent/blob.json")).unwrap_err();
        assert!(matches!(err, NetguardError::DataError(_)));
    }
}
