//! Gradient boosting implementation
//!
//! Binary gradient-boosted decision trees over the shared regression tree,
//! with selectable loss (binomial deviance or exponential).

use super::decision_tree::{Criterion, DecisionTree, MaxFeatures};
use crate::error::{NetguardError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Boosting loss function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Loss {
    /// Binomial deviance (logistic)
    LogLoss,
    /// Exponential loss (AdaBoost-style margins)
    Exponential,
}

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub loss: Loss,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row subsample ratio per boosting round
    pub subsample: f64,
    /// Tree split criterion (regression criteria only)
    pub criterion: Criterion,
    /// Features considered per tree split
    pub max_features: MaxFeatures,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            loss: Loss::LogLoss,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            criterion: Criterion::FriedmanMse,
            max_features: MaxFeatures::All,
            random_state: Some(42),
        }
    }
}

/// Gradient Boosting Classifier (binary)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_margin: f64,
    is_fitted: bool,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_margin: 0.0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit binary classification; labels must be 0/1.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(NetguardError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.config.criterion.is_classification() {
            return Err(NetguardError::TrainingError(format!(
                "boosting trees require a regression criterion, got {:?}",
                self.config.criterion
            )));
        }
        if !(0.0..=1.0).contains(&self.config.subsample) || self.config.subsample == 0.0 {
            return Err(NetguardError::TrainingError(format!(
                "subsample must be in (0, 1], got {}",
                self.config.subsample
            )));
        }

        // Prior log-odds; exponential margins work on half scale
        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_margin = match self.config.loss {
            Loss::LogLoss => (p / (1.0 - p)).ln(),
            Loss::Exponential => 0.5 * (p / (1.0 - p)).ln(),
        };

        let mut margin = Array1::from_elem(n_samples, self.initial_margin);
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for round in 0..self.config.n_estimators {
            let residuals = self.negative_gradient(y, &margin);

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let r_sub: Array1<f64> =
                Array1::from_vec(sample_indices.iter().map(|&i| residuals[i]).collect());

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_criterion(self.config.criterion)
                .with_max_features(self.config.max_features)
                .with_random_state(
                    self.config.random_state.unwrap_or(42).wrapping_add(round as u64),
                );
            tree.fit(&x_sub, &r_sub)?;

            let tree_pred = tree.predict(&x_sub)?;
            for (i, &idx) in sample_indices.iter().enumerate() {
                margin[idx] += self.config.learning_rate * tree_pred[i];
            }

            self.trees.push(tree);
        }

        self.is_fitted = true;
        Ok(())
    }

    fn negative_gradient(&self, y: &Array1<f64>, margin: &Array1<f64>) -> Array1<f64> {
        match self.config.loss {
            Loss::LogLoss => y
                .iter()
                .zip(margin.iter())
                .map(|(yi, m)| yi - 1.0 / (1.0 + (-m).exp()))
                .collect(),
            Loss::Exponential => y
                .iter()
                .zip(margin.iter())
                .map(|(yi, m)| {
                    let y_pm = 2.0 * yi - 1.0;
                    y_pm * (-y_pm * m).exp()
                })
                .collect(),
        }
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil() as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size.max(1));
        indices.sort_unstable();
        indices
    }

    /// Predict class labels (0/1)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Predict positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(NetguardError::ModelNotFitted);
        }

        let n = x.nrows();
        let mut margin = Array1::from_elem(n, self.initial_margin);

        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            for i in 0..n {
                margin[i] += self.config.learning_rate * tree_pred[i];
            }
        }

        let proba = match self.config.loss {
            Loss::LogLoss => margin.mapv(|m| 1.0 / (1.0 + (-m).exp())),
            Loss::Exponential => margin.mapv(|m| 1.0 / (1.0 + (-2.0 * m).exp())),
        };
        Ok(proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((40, 2), (0..80).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 4.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_log_loss_classifier() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let accuracy = y
            .iter()
            .zip(predictions.iter())
            .filter(|(yi, pi)| (**yi - **pi).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.85, "accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_exponential_loss_classifier() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            loss: Loss::Exponential,
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let accuracy = y
            .iter()
            .zip(predictions.iter())
            .filter(|(yi, pi)| (**yi - **pi).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.8, "accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_subsample_and_sqrt_features() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            subsample: 0.7,
            max_features: MaxFeatures::Sqrt,
            criterion: Criterion::SquaredError,
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap().len(), 40);
    }

    #[test]
    fn test_probabilities_bounded() {
        let (x, y) = classification_data();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 5,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_classification_criterion_rejected() {
        let (x, y) = classification_data();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            criterion: Criterion::Gini,
            ..Default::default()
        });
        assert!(model.fit(&x, &y).is_err());
    }
}
