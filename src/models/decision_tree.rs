//! Decision tree implementation
//!
//! Serves both as the "Decision Tree" candidate (classification mode) and
//! as the base learner for the forest and boosting ensembles (regression
//! mode).

use crate::error::{NetguardError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Variance reduction (regression)
    SquaredError,
    /// Friedman's mean-separation improvement (regression)
    FriedmanMse,
}

impl Criterion {
    pub(crate) fn is_classification(&self) -> bool {
        matches!(self, Criterion::Gini | Criterion::Entropy)
    }
}

/// Split selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Splitter {
    /// Exhaustive search over candidate thresholds
    Best,
    /// One uniformly drawn threshold per considered feature
    Random,
}

/// How many features to consider at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// All features
    All,
}

impl MaxFeatures {
    pub(crate) fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features)
    }
}

/// Per-split statistics for one side of a candidate threshold. Class
/// counts are only maintained for classification criteria; regression
/// impurities need just the running sums.
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Option<BTreeMap<i64, usize>>,
}

impl SideStats {
    fn new(track_classes: bool) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: track_classes.then(BTreeMap::new),
        }
    }

    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        if let Some(counts) = &mut self.class_counts {
            *counts.entry(y.round() as i64).or_insert(0) += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    pub splitter: Splitter,
    pub random_state: Option<u64>,
    n_features: usize,
    is_classification: bool,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            criterion: Criterion::Gini,
            splitter: Splitter::Best,
            random_state: None,
            n_features: 0,
            is_classification: true,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            criterion: Criterion::SquaredError,
            splitter: Splitter::Best,
            random_state: None,
            n_features: 0,
            is_classification: false,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(NetguardError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples < self.min_samples_split {
            return Err(NetguardError::TrainingError(format!(
                "need at least {} samples, got {}",
                self.min_samples_split, n_samples
            )));
        }
        if self.criterion.is_classification() != self.is_classification {
            return Err(NetguardError::TrainingError(format!(
                "criterion {:?} does not match tree task",
                self.criterion
            )));
        }

        self.n_features = n_features;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let should_stop = n_samples < self.min_samples_split
            || n_samples <= self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || Self::is_pure(&y_subset);

        if should_stop {
            return TreeNode::Leaf {
                value: self.compute_leaf_value(&y_subset),
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold)) = self.find_best_split(x, y, indices, rng) {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    value: self.compute_leaf_value(&y_subset),
                    n_samples,
                };
            }

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                value: self.compute_leaf_value(&y_subset),
                n_samples,
            }
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let n_consider = self.max_features.resolve(n_features);

        // Draw the feature subset before the parallel scan; sorted so the
        // parallel reduction order is stable.
        let mut feature_pool: Vec<usize> = (0..n_features).collect();
        if n_consider < n_features {
            feature_pool.shuffle(rng);
            feature_pool.truncate(n_consider);
            feature_pool.sort_unstable();
        }

        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&y_subset);
        let split_seed = rng.next_u64();

        // Each feature independently finds its best threshold
        let feature_results: Vec<Option<(usize, f64, f64)>> = feature_pool
            .par_iter()
            .map(|&feature_idx| {
                let thresholds =
                    self.candidate_thresholds(x, indices, feature_idx, split_seed)?;

                let track_classes = self.criterion.is_classification();
                let mut best: Option<(f64, f64)> = None;
                for threshold in thresholds {
                    let mut left = SideStats::new(track_classes);
                    let mut right = SideStats::new(track_classes);
                    for &idx in indices {
                        if x[[idx, feature_idx]] <= threshold {
                            left.push(y[idx]);
                        } else {
                            right.push(y[idx]);
                        }
                    }

                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let gain = self.split_gain(parent_impurity, &left, &right);
                    if gain > best.map_or(0.0, |(g, _)| g) {
                        best = Some((gain, threshold));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    /// Candidate thresholds for one feature. Best splitting proposes the
    /// midpoints between consecutive distinct values; random splitting draws
    /// a single uniform threshold between the feature's min and max.
    fn candidate_thresholds(
        &self,
        x: &Array2<f64>,
        indices: &[usize],
        feature_idx: usize,
        split_seed: u64,
    ) -> Option<Vec<f64>> {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        if values.len() < 2 {
            return None;
        }

        match self.splitter {
            Splitter::Best => Some(
                values
                    .windows(2)
                    .map(|w| (w[0] + w[1]) / 2.0)
                    .collect(),
            ),
            Splitter::Random => {
                let mut feat_rng =
                    ChaCha8Rng::seed_from_u64(split_seed.wrapping_add(feature_idx as u64));
                let lo = values[0];
                let hi = values[values.len() - 1];
                Some(vec![feat_rng.gen_range(lo..hi)])
            }
        }
    }

    fn split_gain(&self, parent_impurity: f64, left: &SideStats, right: &SideStats) -> f64 {
        match self.criterion {
            Criterion::FriedmanMse => {
                let n_l = left.count as f64;
                let n_r = right.count as f64;
                let diff = left.mean() - right.mean();
                n_l * n_r / (n_l + n_r) * diff * diff
            }
            _ => {
                let n = (left.count + right.count) as f64;
                let weighted = (left.count as f64 * self.side_impurity(left)
                    + right.count as f64 * self.side_impurity(right))
                    / n;
                parent_impurity - weighted
            }
        }
    }

    fn side_impurity(&self, side: &SideStats) -> f64 {
        if side.count == 0 {
            return 0.0;
        }
        let n = side.count as f64;
        let class_counts = side.class_counts.as_ref();
        match self.criterion {
            Criterion::Gini => {
                let mut gini = 1.0;
                for &c in class_counts.into_iter().flat_map(|m| m.values()) {
                    let p = c as f64 / n;
                    gini -= p * p;
                }
                gini
            }
            Criterion::Entropy => {
                let mut entropy = 0.0;
                for &c in class_counts.into_iter().flat_map(|m| m.values()) {
                    if c > 0 {
                        let p = c as f64 / n;
                        entropy -= p * p.ln();
                    }
                }
                entropy
            }
            Criterion::SquaredError | Criterion::FriedmanMse => {
                // Var = E[X^2] - E[X]^2
                side.sq_sum / n - (side.sum / n).powi(2)
            }
        }
    }

    fn impurity(&self, y: &[f64]) -> f64 {
        let mut stats = SideStats::new(self.criterion.is_classification());
        for &v in y {
            stats.push(v);
        }
        self.side_impurity(&stats)
    }

    fn is_pure(y: &[f64]) -> bool {
        match y.first() {
            None => true,
            Some(&first) => y.iter().all(|&v| (v - first).abs() < 1e-10),
        }
    }

    fn compute_leaf_value(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }

        if self.is_classification {
            // Mode; BTreeMap iteration plus strict comparison makes the
            // smallest class win ties deterministically
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for &val in y {
                *counts.entry(val.round() as i64).or_insert(0) += 1;
            }
            let mut best = (0i64, 0usize);
            for (&class, &count) in &counts {
                if count > best.1 {
                    best = (class, count);
                }
            }
            best.0 as f64
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(NetguardError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| Self::predict_sample(root, &x.row(i).to_vec()))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn predict_sample(node: &TreeNode, sample: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Tree depth (longest root-to-leaf path)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}
