//! AdaBoost (Adaptive Boosting) implementation
//!
//! Builds an ensemble of decision stumps, reweighting misclassified samples
//! each round (SAMME variant, supports multi-class labels).

use crate::error::{NetguardError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Prediction when feature <= threshold
    left_label: f64,
    /// Prediction when feature > threshold
    right_label: f64,
}

impl Stump {
    fn predict_sample(&self, sample: &[f64]) -> f64 {
        if sample[self.feature_index] <= self.threshold {
            self.left_label
        } else {
            self.right_label
        }
    }
}

/// AdaBoost classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
    pub is_fitted: bool,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Find the best decision stump given sample weights. Features are
    /// scanned in parallel; each feature reports its best stump and the
    /// lowest-index feature wins ties.
    fn fit_stump(
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &Array1<f64>,
        classes: &[f64],
    ) -> Stump {
        let n_features = x.ncols();
        let n_samples = x.nrows();

        let per_feature: Vec<(f64, Stump)> = (0..n_features)
            .into_par_iter()
            .map(|f| {
                let col = x.column(f);
                let mut vals: Vec<f64> = col.to_vec();
                vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                vals.dedup();

                let mut best_error = f64::MAX;
                let mut best = Stump {
                    feature_index: f,
                    threshold: 0.0,
                    left_label: classes[0],
                    right_label: classes.get(1).copied().unwrap_or(classes[0]),
                };

                for w in vals.windows(2) {
                    let threshold = (w[0] + w[1]) / 2.0;

                    for &left_label in classes {
                        for &right_label in classes {
                            if left_label == right_label && classes.len() > 1 {
                                continue;
                            }
                            let mut error = 0.0;
                            for i in 0..n_samples {
                                let pred = if col[i] <= threshold {
                                    left_label
                                } else {
                                    right_label
                                };
                                if (pred - y[i]).abs() > 1e-10 {
                                    error += weights[i];
                                }
                            }
                            if error < best_error {
                                best_error = error;
                                best = Stump {
                                    feature_index: f,
                                    threshold,
                                    left_label,
                                    right_label,
                                };
                            }
                        }
                    }
                }

                (best_error, best)
            })
            .collect();

        per_feature
            .into_iter()
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, stump)| stump)
            .unwrap_or(Stump {
                feature_index: 0,
                threshold: 0.0,
                left_label: classes[0],
                right_label: classes.get(1).copied().unwrap_or(classes[0]),
            })
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(NetguardError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.learning_rate <= 0.0 {
            return Err(NetguardError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        self.classes = classes;

        let n_classes = self.classes.len();
        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        self.stumps.clear();
        self.alphas.clear();

        for _round in 0..self.n_estimators {
            let stump = Self::fit_stump(x, y, &weights, &self.classes);

            let predictions: Vec<f64> = (0..n_samples)
                .map(|i| {
                    let row = x.row(i);
                    stump.predict_sample(&row.to_vec())
                })
                .collect();

            let mut error = 0.0;
            for i in 0..n_samples {
                if (predictions[i] - y[i]).abs() > 1e-10 {
                    error += weights[i];
                }
            }
            error = error.clamp(1e-15, 1.0 - 1e-15);

            // SAMME alpha for multi-class
            let alpha = self.learning_rate * ((1.0 - error) / error).ln()
                + (n_classes as f64 - 1.0).max(1.0).ln();

            for i in 0..n_samples {
                if (predictions[i] - y[i]).abs() > 1e-10 {
                    weights[i] *= alpha.exp();
                }
            }
            let w_sum = weights.sum();
            if w_sum > 0.0 {
                weights /= w_sum;
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(NetguardError::ModelNotFitted);
        }

        let n_samples = x.nrows();
        let mut predictions = Array1::zeros(n_samples);

        for i in 0..n_samples {
            let row = x.row(i);
            let sample = row.to_vec();

            // Weighted vote across all stumps; f64 bit patterns key the
            // vote map so exact label values survive
            let mut class_scores: BTreeMap<u64, f64> = BTreeMap::new();
            for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
                let pred = stump.predict_sample(&sample);
                *class_scores.entry(pred.to_bits()).or_insert(0.0) += alpha;
            }

            let mut best = (0u64, f64::NEG_INFINITY);
            for (&key, &score) in &class_scores {
                if score > best.1 {
                    best = (key, score);
                }
            }
            predictions[i] = f64::from_bits(best.0);
        }

        Ok(predictions)
    }
}
