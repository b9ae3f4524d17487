//! Classifier implementations
//!
//! Each candidate family in the catalog has a native implementation here.
//! The [`Classifier`] enum is the common currency of the search engine, the
//! bundle and the persisted artifacts: one tagged variant per family,
//! dispatching fit and predict.

pub mod adaboost;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear;
pub mod random_forest;

pub use adaboost::AdaBoostClassifier;
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures, Splitter, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig, Loss};
pub use linear::{LogisticRegression, Penalty};
pub use random_forest::RandomForest;

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A classifier of any supported family, fitted or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingClassifier),
    LogisticRegression(LogisticRegression),
    AdaBoost(AdaBoostClassifier),
}

impl Classifier {
    /// Fit the underlying model to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Classifier::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            Classifier::GradientBoosting(m) => m.fit(x, y),
            Classifier::LogisticRegression(m) => m.fit(x, y).map(|_| ()),
            Classifier::AdaBoost(m) => m.fit(x, y).map(|_| ()),
        }
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.predict(x),
            Classifier::DecisionTree(m) => m.predict(x),
            Classifier::GradientBoosting(m) => m.predict(x),
            Classifier::LogisticRegression(m) => m.predict(x),
            Classifier::AdaBoost(m) => m.predict(x),
        }
    }

    /// Family name for logs and tracking
    pub fn family_name(&self) -> &'static str {
        match self {
            Classifier::RandomForest(_) => "RandomForest",
            Classifier::DecisionTree(_) => "DecisionTree",
            Classifier::GradientBoosting(_) => "GradientBoosting",
            Classifier::LogisticRegression(_) => "LogisticRegression",
            Classifier::AdaBoost(_) => "AdaBoost",
        }
    }
}
