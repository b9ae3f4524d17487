//! Classification metric computation

use crate::error::{NetguardError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metric record for one (model, split) evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
}

impl ClassificationMetrics {
    /// Compute F1, precision and recall from true and predicted labels.
    ///
    /// With exactly two distinct true labels the larger one is treated as the
    /// positive class; with more, per-class one-vs-rest scores are
    /// macro-averaged. Inputs must be non-empty and of equal length.
    pub fn score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.is_empty() {
            return Err(NetguardError::ValidationError(
                "cannot score an empty label sequence".to_string(),
            ));
        }
        if y_true.len() != y_pred.len() {
            return Err(NetguardError::ShapeError {
                expected: format!("y_pred length = {}", y_true.len()),
                actual: format!("y_pred length = {}", y_pred.len()),
            });
        }

        let classes: BTreeSet<i64> = y_true.iter().map(|&v| v.round() as i64).collect();

        if classes.len() <= 2 {
            let positive = classes.iter().next_back().copied().unwrap_or(1);
            let (precision, recall, f1) = Self::one_vs_rest(y_true, y_pred, positive);
            Ok(Self {
                f1_score: f1,
                precision_score: precision,
                recall_score: recall,
            })
        } else {
            // Macro average across classes present in the truth
            let mut p_sum = 0.0;
            let mut r_sum = 0.0;
            let mut f_sum = 0.0;
            for &class in &classes {
                let (p, r, f) = Self::one_vs_rest(y_true, y_pred, class);
                p_sum += p;
                r_sum += r;
                f_sum += f;
            }
            let n = classes.len() as f64;
            Ok(Self {
                f1_score: f_sum / n,
                precision_score: p_sum / n,
                recall_score: r_sum / n,
            })
        }
    }

    fn one_vs_rest(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: i64) -> (f64, f64, f64) {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t_pos = t.round() as i64 == positive;
            let p_pos = p.round() as i64 == positive;
            match (t_pos, p_pos) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        (precision, recall, f1)
    }
}

/// Coefficient of determination used to rank candidates on the held-out
/// split. Can be negative for predictors worse than the label mean.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }

    let y_mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Fraction of exactly matching labels; the cross-validation selection score.
pub fn accuracy_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (**t - **p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}
