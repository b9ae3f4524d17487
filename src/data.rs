//! Loading of transformed feature/label arrays
//!
//! The data-transformation stage emits its train and test arrays as CSV
//! files with a header row; every column is numeric and the last column is
//! the label.

use crate::error::{NetguardError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Load a transformed array file and split it into features and labels.
pub fn load_transformed_array(path: &Path) -> Result<(Array2<f64>, Array1<f64>)> {
    let df = read_csv(path)?;
    split_features_labels(&df, path)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| NetguardError::DataError(format!("{}: {}", path.display(), e)))?;

    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file);

    reader
        .finish()
        .map_err(|e| NetguardError::DataError(format!("{}: {}", path.display(), e)))
}

fn split_features_labels(df: &DataFrame, path: &Path) -> Result<(Array2<f64>, Array1<f64>)> {
    let col_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    if col_names.len() < 2 {
        return Err(NetguardError::DataError(format!(
            "{}: need at least one feature column and a label column, got {} columns",
            path.display(),
            col_names.len()
        )));
    }
    if df.height() == 0 {
        return Err(NetguardError::DataError(format!(
            "{}: array is empty",
            path.display()
        )));
    }

    let (feature_names, label_name) = col_names.split_at(col_names.len() - 1);

    // Collect each column as a contiguous f64 Vec, then build the row-major
    // feature matrix via from_shape_fn over the column slices.
    let col_data: Vec<Vec<f64>> = feature_names
        .iter()
        .map(|name| column_to_f64(df, name))
        .collect::<Result<Vec<_>>>()?;

    let n_rows = df.height();
    let n_cols = feature_names.len();
    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    let x = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]);

    let y = Array1::from_vec(column_to_f64(df, &label_name[0])?);

    Ok((x, y))
}

fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|e| NetguardError::DataError(e.to_string()))?;
    let as_f64 = column
        .cast(&DataType::Float64)
        .map_err(|e| NetguardError::DataError(e.to_string()))?;
    Ok(as_f64
        .f64()
        .map_err(|e| NetguardError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_splits_last_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(
            &dir,
            "train.csv",
            "f0,f1,label\n1.0,2.0,0\n3.0,4.0,1\n5.0,6.0,1\n",
        );

        let (x, y) = load_transformed_array(&path).unwrap();
        assert_eq!(x.nrows(), 3);
        assert_eq!(x.ncols(), 2);
        assert_eq!(y.len(), 3);
        assert_eq!(x[[1, 0]], 3.0);
        assert_eq!(y[2], 1.0);
    }

    #[test]
    fn test_missing_file_is_data_error() {
        let err = load_transformed_array(Path::new("/nonexistent/train.csv")).unwrap_err();
        assert!(matches!(err, NetguardError::DataError(_)));
        assert!(err.to_string().contains("train.csv"));
    }

    #[test]
    fn test_single_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "bad.csv", "label\n0\n1\n");
        assert!(load_transformed_array(&path).is_err());
    }

    #[test]
    fn test_empty_array_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "empty.csv", "f0,label\n");
        assert!(load_transformed_array(&path).is_err());
    }
}
