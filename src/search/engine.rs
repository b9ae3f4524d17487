//! Search-and-select engine
//!
//! Fits every catalog candidate on the training data (grid-searching its
//! hyperparameters with cross-validation when a grid is present) and scores
//! each fitted candidate on the held-out test split.

use super::catalog::Candidate;
use super::grid::{format_params, ParamSet};
use crate::cross_validation::{CrossValidator, CvSplit, CvStrategy};
use crate::error::{NetguardError, Result};
use crate::metrics::{accuracy_score, r2_score};
use indexmap::IndexMap;
use ndarray::{Array1, Array2, Axis};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

const CV_FOLDS: usize = 3;
const CV_SEED: u64 = 42;

/// Result for one evaluated candidate
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    pub name: String,
    /// Held-out test score of the best-tuned variant
    pub score: f64,
    /// Winning hyperparameters (empty when the family defaults were used)
    pub params: ParamSet,
    /// The candidate fitted on the full training data
    pub model: crate::models::Classifier,
}

/// Outcome of evaluating a whole catalog, in catalog order
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    results: Vec<CandidateOutcome>,
}

impl SearchOutcome {
    pub fn results(&self) -> &[CandidateOutcome] {
        &self.results
    }

    /// Candidate name -> held-out score, in catalog insertion order
    pub fn score_report(&self) -> IndexMap<String, f64> {
        self.results
            .iter()
            .map(|r| (r.name.clone(), r.score))
            .collect()
    }

    /// Best-scoring candidate. Strict comparison over catalog order means
    /// the first-inserted candidate wins ties.
    pub fn best(&self) -> Option<&CandidateOutcome> {
        let mut best: Option<&CandidateOutcome> = None;
        for outcome in &self.results {
            if best.map_or(true, |b| outcome.score > b.score) {
                best = Some(outcome);
            }
        }
        best
    }

    /// Consume the outcome and return the owned best candidate
    pub fn into_best(mut self) -> Option<CandidateOutcome> {
        let mut best_idx: Option<usize> = None;
        let mut best_score = f64::NEG_INFINITY;
        for (i, outcome) in self.results.iter().enumerate() {
            if best_idx.is_none() || outcome.score > best_score {
                best_idx = Some(i);
                best_score = outcome.score;
            }
        }
        best_idx.map(|i| self.results.swap_remove(i))
    }
}

/// Evaluate every candidate in the catalog.
///
/// Each candidate with a grid is tuned by exhaustive search, scoring every
/// combination by mean accuracy over a 3-fold stratified cross-validation
/// of the training data; ties between combinations go to the earlier one in
/// grid expansion order. The winning combination (or the family defaults)
/// is refit on the full training data and scored on the held-out test
/// split. Any candidate that fails to fit aborts the whole evaluation.
pub fn evaluate_catalog(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    catalog: &[Candidate],
) -> Result<SearchOutcome> {
    if catalog.is_empty() {
        return Err(NetguardError::SearchError(
            "candidate catalog is empty".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for candidate in catalog {
        if !seen.insert(candidate.name.as_str()) {
            return Err(NetguardError::SearchError(format!(
                "duplicate candidate name: {}",
                candidate.name
            )));
        }
    }
    if x_train.nrows() != y_train.len() || x_test.nrows() != y_test.len() {
        return Err(NetguardError::ShapeError {
            expected: "matching feature and label row counts".to_string(),
            actual: format!(
                "train {}x{}, test {}x{}",
                x_train.nrows(),
                y_train.len(),
                x_test.nrows(),
                y_test.len()
            ),
        });
    }

    let splits = CrossValidator::new(CvStrategy::StratifiedKFold {
        n_splits: CV_FOLDS,
        shuffle: true,
    })
    .with_random_state(CV_SEED)
    .split(x_train.nrows(), Some(y_train))?;

    let start = Instant::now();
    let mut results = Vec::with_capacity(catalog.len());

    for candidate in catalog {
        let candidate_start = Instant::now();

        let best_params = match &candidate.grid {
            Some(grid) if !grid.is_empty() => {
                tune_candidate(candidate, grid.combinations(), x_train, y_train, &splits)?
            }
            _ => Vec::new(),
        };

        let mut model = candidate.family.instantiate(&best_params)?;
        model.fit(x_train, y_train)?;

        let y_pred = model.predict(x_test)?;
        let score = r2_score(y_test, &y_pred);

        info!(
            candidate = %candidate.name,
            score,
            params = %format_params(&best_params),
            elapsed_secs = candidate_start.elapsed().as_secs_f64(),
            "candidate evaluated"
        );

        results.push(CandidateOutcome {
            name: candidate.name.clone(),
            score,
            params: best_params,
            model,
        });
    }

    info!(
        n_candidates = results.len(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "catalog evaluation finished"
    );

    Ok(SearchOutcome { results })
}

/// Grid-search one candidate, returning the winning parameter set
fn tune_candidate(
    candidate: &Candidate,
    combos: Vec<ParamSet>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    splits: &[CvSplit],
) -> Result<ParamSet> {
    let mut best: Option<(f64, ParamSet)> = None;

    for combo in combos {
        let cv_score = cross_val_accuracy(candidate, &combo, x_train, y_train, splits)?;
        debug!(
            candidate = %candidate.name,
            cv_score,
            params = %format_params(&combo),
            "grid combination scored"
        );

        if best.as_ref().map_or(true, |(s, _)| cv_score > *s) {
            best = Some((cv_score, combo));
        }
    }

    best.map(|(_, params)| params).ok_or_else(|| {
        NetguardError::SearchError(format!("{}: empty hyperparameter grid", candidate.name))
    })
}

/// Mean accuracy of one parameter combination over the CV splits
fn cross_val_accuracy(
    candidate: &Candidate,
    params: &ParamSet,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CvSplit],
) -> Result<f64> {
    let mut total = 0.0;
    for split in splits {
        let x_fold = x.select(Axis(0), &split.train_indices);
        let y_fold: Array1<f64> =
            Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
        let x_val = x.select(Axis(0), &split.test_indices);
        let y_val: Array1<f64> =
            Array1::from_vec(split.test_indices.iter().map(|&i| y[i]).collect());

        let mut model = candidate.family.instantiate(params)?;
        model.fit(&x_fold, &y_fold)?;
        let y_pred = model.predict(&x_val)?;
        total += accuracy_score(&y_val, &y_pred);
    }
    Ok(total / splits.len() as f64)
}
