//! Model/preprocessor bundle used at inference time

use crate::error::Result;
use crate::models::Classifier;
use crate::preprocessing::KnnImputer;
use crate::utils::{load_object, save_object};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fitted preprocessing transform paired with a fitted model.
///
/// The preprocessor's output columns must line up with the features the
/// model was trained on; the pipeline guarantees this by fitting both on
/// the same transformed arrays, and it is not re-checked here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    pub preprocessor: KnnImputer,
    pub model: Classifier,
}

impl NetworkModel {
    pub fn new(preprocessor: KnnImputer, model: Classifier) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    /// Apply the preprocessing transform, then the model.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let transformed = self.preprocessor.transform(x)?;
        self.model.predict(&transformed)
    }

    /// Persist the bundle as JSON (atomic write).
    pub fn save(&self, path: &Path) -> Result<()> {
        save_object(path, self)
    }

    /// Load a previously persisted bundle.
    pub fn load(path: &Path) -> Result<Self> {
        load_object(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecisionTree;
    use ndarray::array;

    fn fitted_bundle() -> NetworkModel {
        let x = array![[0.0, 1.0], [0.1, 0.9], [0.9, 0.1], [1.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut imputer = KnnImputer::new(2);
        imputer.fit(&x).unwrap();

        let mut model = Classifier::DecisionTree(DecisionTree::new_classifier());
        model.fit(&x, &y).unwrap();

        NetworkModel::new(imputer, model)
    }

    #[test]
    fn test_predict_applies_imputation() {
        let bundle = fitted_bundle();

        // A NaN cell must be imputed before the model sees it
        let holey = array![[f64::NAN, 0.9], [1.0, f64::NAN]];
        let preds = bundle.predict(&holey).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds.iter().all(|p| !p.is_nan()));
    }

    #[test]
    fn test_save_load_round_trip_predicts_identically() {
        let bundle = fitted_bundle();
        let sample = array![[0.05, 0.95], [0.95, 0.05]];
        let before = bundle.predict(&sample).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        bundle.save(&path).unwrap();

        let restored = NetworkModel::load(&path).unwrap();
        let after = restored.predict(&sample).unwrap();

        assert_eq!(before, after);
    }
}
