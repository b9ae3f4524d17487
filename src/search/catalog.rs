//! Candidate catalog
//!
//! A candidate pairs a model family with an optional hyperparameter grid.
//! The built-in catalog enumerates the five families the trainer searches
//! over, in a fixed insertion order that doubles as the tie-break order for
//! best-model selection.

use super::grid::{ParamGrid, ParamSet, ParamValue};
use crate::error::{NetguardError, Result};
use crate::models::{
    AdaBoostClassifier, Classifier, Criterion, DecisionTree, GradientBoostingClassifier,
    GradientBoostingConfig, LogisticRegression, Loss, MaxFeatures, Penalty, RandomForest, Splitter,
};
use serde::{Deserialize, Serialize};

/// Supported model families
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelFamily {
    RandomForest,
    DecisionTree,
    GradientBoosting,
    LogisticRegression,
    AdaBoost,
}

/// One searchable candidate
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub family: ModelFamily,
    pub grid: Option<ParamGrid>,
}

impl Candidate {
    pub fn new(name: &str, family: ModelFamily, grid: Option<ParamGrid>) -> Self {
        Self {
            name: name.to_string(),
            family,
            grid,
        }
    }
}

/// The fixed catalog the trainer searches. Insertion order is the
/// documented tie-break order: on equal scores the earlier entry wins.
pub fn builtin_catalog() -> Vec<Candidate> {
    vec![
        Candidate::new(
            "Random Forest",
            ModelFamily::RandomForest,
            Some(
                ParamGrid::new()
                    .param(
                        "criterion",
                        vec![ParamValue::str("gini"), ParamValue::str("entropy")],
                    )
                    .param(
                        "max_features",
                        vec![ParamValue::str("sqrt"), ParamValue::str("log2")],
                    )
                    .param(
                        "n_estimators",
                        vec![ParamValue::Int(16), ParamValue::Int(64), ParamValue::Int(128)],
                    ),
            ),
        ),
        Candidate::new(
            "Decision Tree",
            ModelFamily::DecisionTree,
            Some(
                ParamGrid::new()
                    .param(
                        "criterion",
                        vec![ParamValue::str("gini"), ParamValue::str("entropy")],
                    )
                    .param(
                        "splitter",
                        vec![ParamValue::str("best"), ParamValue::str("random")],
                    )
                    .param("max_features", vec![ParamValue::str("sqrt")]),
            ),
        ),
        Candidate::new(
            "Gradient Boosting",
            ModelFamily::GradientBoosting,
            Some(
                ParamGrid::new()
                    .param(
                        "loss",
                        vec![ParamValue::str("log_loss"), ParamValue::str("exponential")],
                    )
                    .param(
                        "learning_rate",
                        vec![ParamValue::Float(0.05), ParamValue::Float(0.1)],
                    )
                    .param(
                        "subsample",
                        vec![
                            ParamValue::Float(0.7),
                            ParamValue::Float(0.8),
                            ParamValue::Float(0.9),
                        ],
                    )
                    .param(
                        "criterion",
                        vec![
                            ParamValue::str("squared_error"),
                            ParamValue::str("friedman_mse"),
                        ],
                    )
                    .param(
                        "max_features",
                        vec![ParamValue::str("sqrt"), ParamValue::str("log2")],
                    )
                    .param(
                        "n_estimators",
                        vec![ParamValue::Int(16), ParamValue::Int(64), ParamValue::Int(128)],
                    ),
            ),
        ),
        Candidate::new(
            "Logistic Regression",
            ModelFamily::LogisticRegression,
            Some(
                ParamGrid::new()
                    .param(
                        "penalty",
                        vec![ParamValue::str("l1"), ParamValue::str("l2")],
                    )
                    .param(
                        "c",
                        vec![
                            ParamValue::Float(0.1),
                            ParamValue::Float(1.0),
                            ParamValue::Float(10.0),
                        ],
                    )
                    .param(
                        "max_iter",
                        vec![
                            ParamValue::Int(1000),
                            ParamValue::Int(2000),
                            ParamValue::Int(5000),
                        ],
                    ),
            ),
        ),
        Candidate::new(
            "AdaBoost",
            ModelFamily::AdaBoost,
            Some(
                ParamGrid::new()
                    .param(
                        "learning_rate",
                        vec![ParamValue::Float(0.01), ParamValue::Float(0.1)],
                    )
                    .param(
                        "n_estimators",
                        vec![ParamValue::Int(16), ParamValue::Int(64), ParamValue::Int(128)],
                    ),
            ),
        ),
    ]
}

impl ModelFamily {
    /// Build an unfitted classifier of this family with the given
    /// parameters applied over the family defaults. Unknown names and
    /// ill-typed values are invalid-parameter errors.
    pub fn instantiate(&self, params: &ParamSet) -> Result<Classifier> {
        match self {
            ModelFamily::RandomForest => {
                let mut model = RandomForest::new(100);
                for (name, value) in params {
                    match name.as_str() {
                        "criterion" => {
                            model = model.with_criterion(classification_criterion(name, value)?)
                        }
                        "max_features" => {
                            model = model.with_max_features(max_features(name, value)?)
                        }
                        "n_estimators" => model = model.with_n_estimators(usize_param(name, value)?),
                        _ => return Err(unknown_param(name, value)),
                    }
                }
                Ok(Classifier::RandomForest(model))
            }
            ModelFamily::DecisionTree => {
                let mut model = DecisionTree::new_classifier();
                for (name, value) in params {
                    match name.as_str() {
                        "criterion" => {
                            model = model.with_criterion(classification_criterion(name, value)?)
                        }
                        "splitter" => model = model.with_splitter(splitter(name, value)?),
                        "max_features" => {
                            model = model.with_max_features(max_features(name, value)?)
                        }
                        _ => return Err(unknown_param(name, value)),
                    }
                }
                Ok(Classifier::DecisionTree(model))
            }
            ModelFamily::GradientBoosting => {
                let mut config = GradientBoostingConfig::default();
                for (name, value) in params {
                    match name.as_str() {
                        "loss" => config.loss = loss(name, value)?,
                        "learning_rate" => config.learning_rate = f64_param(name, value)?,
                        "subsample" => config.subsample = f64_param(name, value)?,
                        "criterion" => config.criterion = regression_criterion(name, value)?,
                        "max_features" => config.max_features = max_features(name, value)?,
                        "n_estimators" => config.n_estimators = usize_param(name, value)?,
                        _ => return Err(unknown_param(name, value)),
                    }
                }
                Ok(Classifier::GradientBoosting(GradientBoostingClassifier::new(config)))
            }
            ModelFamily::LogisticRegression => {
                let mut model = LogisticRegression::new();
                for (name, value) in params {
                    match name.as_str() {
                        "penalty" => model = model.with_penalty(penalty(name, value)?),
                        "c" => model = model.with_c(f64_param(name, value)?),
                        "max_iter" => model = model.with_max_iter(usize_param(name, value)?),
                        _ => return Err(unknown_param(name, value)),
                    }
                }
                Ok(Classifier::LogisticRegression(model))
            }
            ModelFamily::AdaBoost => {
                let mut model = AdaBoostClassifier::default();
                for (name, value) in params {
                    match name.as_str() {
                        "learning_rate" => {
                            model = model.with_learning_rate(f64_param(name, value)?)
                        }
                        "n_estimators" => model = model.with_n_estimators(usize_param(name, value)?),
                        _ => return Err(unknown_param(name, value)),
                    }
                }
                Ok(Classifier::AdaBoost(model))
            }
        }
    }
}

fn unknown_param(name: &str, value: &ParamValue) -> NetguardError {
    NetguardError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: "unknown parameter for this model family".to_string(),
    }
}

fn bad_value(name: &str, value: &ParamValue, expected: &str) -> NetguardError {
    NetguardError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("expected {}", expected),
    }
}

fn usize_param(name: &str, value: &ParamValue) -> Result<usize> {
    value
        .as_usize()
        .ok_or_else(|| bad_value(name, value, "an integer"))
}

fn f64_param(name: &str, value: &ParamValue) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| bad_value(name, value, "a number"))
}

fn classification_criterion(name: &str, value: &ParamValue) -> Result<Criterion> {
    match value.as_str() {
        Some("gini") => Ok(Criterion::Gini),
        Some("entropy") => Ok(Criterion::Entropy),
        _ => Err(bad_value(name, value, "one of gini, entropy")),
    }
}

fn regression_criterion(name: &str, value: &ParamValue) -> Result<Criterion> {
    match value.as_str() {
        Some("squared_error") => Ok(Criterion::SquaredError),
        Some("friedman_mse") => Ok(Criterion::FriedmanMse),
        _ => Err(bad_value(name, value, "one of squared_error, friedman_mse")),
    }
}

fn max_features(name: &str, value: &ParamValue) -> Result<MaxFeatures> {
    match value.as_str() {
        Some("sqrt") => Ok(MaxFeatures::Sqrt),
        Some("log2") => Ok(MaxFeatures::Log2),
        Some("all") => Ok(MaxFeatures::All),
        _ => Err(bad_value(name, value, "one of sqrt, log2, all")),
    }
}

fn splitter(name: &str, value: &ParamValue) -> Result<Splitter> {
    match value.as_str() {
        Some("best") => Ok(Splitter::Best),
        Some("random") => Ok(Splitter::Random),
        _ => Err(bad_value(name, value, "one of best, random")),
    }
}

fn loss(name: &str, value: &ParamValue) -> Result<Loss> {
    match value.as_str() {
        Some("log_loss") => Ok(Loss::LogLoss),
        Some("exponential") => Ok(Loss::Exponential),
        _ => Err(bad_value(name, value, "one of log_loss, exponential")),
    }
}

fn penalty(name: &str, value: &ParamValue) -> Result<Penalty> {
    match value.as_str() {
        Some("l1") => Ok(Penalty::L1),
        Some("l2") => Ok(Penalty::L2),
        _ => Err(bad_value(name, value, "one of l1, l2")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog[0].name, "Random Forest");
        assert_eq!(catalog[4].name, "AdaBoost");
        assert!(catalog.iter().all(|c| c.grid.is_some()));
    }

    #[test]
    fn test_grid_sizes() {
        let catalog = builtin_catalog();
        let sizes: Vec<usize> = catalog
            .iter()
            .map(|c| c.grid.as_ref().unwrap().n_combinations())
            .collect();
        assert_eq!(sizes, vec![12, 4, 144, 18, 6]);
    }

    #[test]
    fn test_instantiate_with_params() {
        let params: ParamSet = vec![
            ("criterion".to_string(), ParamValue::str("entropy")),
            ("n_estimators".to_string(), ParamValue::Int(16)),
        ];
        let model = ModelFamily::RandomForest.instantiate(&params).unwrap();
        match model {
            Classifier::RandomForest(rf) => {
                assert_eq!(rf.criterion, Criterion::Entropy);
                assert_eq!(rf.n_estimators, 16);
            }
            _ => panic!("wrong family"),
        }
    }

    #[test]
    fn test_instantiate_defaults() {
        let model = ModelFamily::LogisticRegression.instantiate(&Vec::new()).unwrap();
        assert!(matches!(model, Classifier::LogisticRegression(_)));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let params: ParamSet = vec![("bogus".to_string(), ParamValue::Int(1))];
        assert!(matches!(
            ModelFamily::AdaBoost.instantiate(&params),
            Err(NetguardError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_ill_typed_parameter_rejected() {
        let params: ParamSet = vec![("criterion".to_string(), ParamValue::Int(3))];
        assert!(matches!(
            ModelFamily::DecisionTree.instantiate(&params),
            Err(NetguardError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_every_builtin_combination_instantiates() {
        for candidate in builtin_catalog() {
            let grid = candidate.grid.as_ref().unwrap();
            for combo in grid.combinations() {
                candidate
                    .family
                    .instantiate(&combo)
                    .unwrap_or_else(|e| panic!("{}: {}", candidate.name, e));
            }
        }
    }
}
