//! Preprocessing transform applied ahead of the model at inference time
//!
//! The data-transformation stage fits a [`KnnImputer`] on the training
//! features and persists it; the trainer reloads it and bundles it with the
//! winning model so inference sees the same imputation.

use crate::error::{NetguardError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub(crate) fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Distance metric for neighbor lookup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    Euclidean,
    Manhattan,
}

/// Neighbor weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Weighting {
    Uniform,
    Distance,
}

/// Ordered (distance, index) pair for the neighbor heap
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max heap by distance: the farthest neighbor is popped first
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// K-nearest-neighbor imputer for NaN cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
    metric: Metric,
    weighting: Weighting,
    /// Complete training rows kept for neighbor lookup
    complete_data: Option<Array2<f64>>,
    /// Per-feature means, the fallback when no neighbor is usable
    feature_means: Option<Array1<f64>>,
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            metric: Metric::Euclidean,
            weighting: Weighting::Uniform,
            complete_data: None,
            feature_means: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Average coordinate distance over the positions both rows have
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let mut count = 0usize;
        let mut accum = 0.0f64;

        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            count += 1;
            match self.metric {
                Metric::Manhattan => accum += (ai - bi).abs(),
                Metric::Euclidean => {
                    let d = ai - bi;
                    accum += d * d;
                }
            }
        }

        if count == 0 {
            return f64::INFINITY;
        }

        match self.metric {
            Metric::Manhattan => accum / count as f64,
            Metric::Euclidean => (accum / count as f64).sqrt(),
        }
    }

    fn find_neighbors(&self, data: &Array2<f64>, sample: &[f64], k: usize) -> Vec<(usize, f64)> {
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, row) in data.rows().into_iter().enumerate() {
            let row_vec: Vec<f64> = row.iter().copied().collect();
            let dist = self.distance(sample, &row_vec);

            if dist.is_finite() {
                if heap.len() < k {
                    heap.push(DistanceIdx(dist, i));
                } else if let Some(&DistanceIdx(max_dist, _)) = heap.peek() {
                    if dist < max_dist {
                        heap.pop();
                        heap.push(DistanceIdx(dist, i));
                    }
                }
            }
        }

        heap.into_iter().map(|DistanceIdx(d, i)| (i, d)).collect()
    }

    fn impute_value(
        &self,
        data: &Array2<f64>,
        neighbors: &[(usize, f64)],
        feature_idx: usize,
    ) -> f64 {
        if neighbors.is_empty() {
            return self
                .feature_means
                .as_ref()
                .map(|m| m[feature_idx])
                .unwrap_or(0.0);
        }

        match self.weighting {
            Weighting::Distance => {
                let mut weighted_sum = 0.0;
                let mut weight_sum = 0.0;
                for &(idx, dist) in neighbors {
                    let weight = if dist < 1e-10 { 1e10 } else { 1.0 / dist };
                    weighted_sum += data[[idx, feature_idx]] * weight;
                    weight_sum += weight;
                }
                if weight_sum > 0.0 {
                    weighted_sum / weight_sum
                } else {
                    self.feature_means
                        .as_ref()
                        .map(|m| m[feature_idx])
                        .unwrap_or(0.0)
                }
            }
            Weighting::Uniform => {
                let sum: f64 = neighbors
                    .iter()
                    .map(|&(idx, _)| data[[idx, feature_idx]])
                    .sum();
                sum / neighbors.len() as f64
            }
        }
    }

    /// Fit on training features: keep complete rows and feature means
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let complete_rows: Vec<usize> = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().any(|&v| is_missing(v)))
            .map(|(i, _)| i)
            .collect();

        if complete_rows.is_empty() {
            return Err(NetguardError::ValidationError(
                "no complete rows available to fit the imputer".to_string(),
            ));
        }

        let complete_data = x.select(Axis(0), &complete_rows);
        let feature_means = complete_data.mean_axis(Axis(0)).ok_or_else(|| {
            NetguardError::ValidationError("failed to compute feature means".to_string())
        })?;

        self.complete_data = Some(complete_data);
        self.feature_means = Some(feature_means);

        Ok(self)
    }

    /// Replace every NaN cell with a neighbor-averaged value
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let data = self
            .complete_data
            .as_ref()
            .ok_or(NetguardError::ModelNotFitted)?;

        let mut result = x.clone();
        let n_features = x.ncols();

        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }

            let row_vec: Vec<f64> = row.iter().copied().collect();
            let neighbors = self.find_neighbors(data, &row_vec, self.n_neighbors);

            for j in 0..n_features {
                if is_missing(row_vec[j]) {
                    result[[row_idx, j]] = self.impute_value(data, &neighbors, j);
                }
            }
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imputer_fills_all_nans() {
        let data = Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0,
                10.0,
                2.0,
                20.0,
                3.0,
                30.0,
                4.0,
                40.0,
                f64::NAN,
                25.0,
                2.5,
                f64::NAN,
            ],
        )
        .unwrap();

        let mut imputer = KnnImputer::new(3);
        let result = imputer.fit_transform(&data).unwrap();

        assert!(!result.iter().any(|&v| v.is_nan()));
        assert!(result[[4, 0]] >= 1.0 && result[[4, 0]] <= 4.0);
        assert!(result[[5, 1]] >= 10.0 && result[[5, 1]] <= 40.0);
    }

    #[test]
    fn test_distance_weighting_prefers_nearest() {
        let data = Array2::from_shape_vec(
            (5, 2),
            vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 0.1, f64::NAN],
        )
        .unwrap();

        let mut imputer = KnnImputer::new(3).with_weighting(Weighting::Distance);
        let result = imputer.fit_transform(&data).unwrap();

        assert!(result[[4, 1]].abs() < 1.0);
    }

    #[test]
    fn test_complete_data_passes_through() {
        let data =
            Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut imputer = KnnImputer::new(2).with_metric(Metric::Manhattan);
        let result = imputer.fit_transform(&data).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let imputer = KnnImputer::new(3);
        let data = Array2::zeros((2, 2));
        assert!(matches!(
            imputer.transform(&data),
            Err(NetguardError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_all_incomplete_rows_rejected() {
        let data = Array2::from_elem((3, 2), f64::NAN);
        let mut imputer = KnnImputer::new(2);
        assert!(imputer.fit(&data).is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let data =
            Array2::from_shape_vec((4, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let mut imputer = KnnImputer::new(2);
        imputer.fit(&data).unwrap();

        let json = serde_json::to_string(&imputer).unwrap();
        let restored: KnnImputer = serde_json::from_str(&json).unwrap();

        let holey =
            Array2::from_shape_vec((1, 2), vec![f64::NAN, 5.0]).unwrap();
        assert_eq!(
            imputer.transform(&holey).unwrap(),
            restored.transform(&holey).unwrap()
        );
    }
}
